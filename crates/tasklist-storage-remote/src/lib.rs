//! PostgREST-backed task table (Supabase-style `/rest/v1/{table}`).

mod rows;
mod store;

pub use rows::TaskRow;
pub use store::*;
