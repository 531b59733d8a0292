pub mod error;
pub mod events;
pub mod filter;
pub mod ids;
pub mod model;
pub mod time;
pub mod types;

pub use error::*;
pub use events::*;
pub use filter::*;
pub use ids::*;
pub use model::*;
pub use time::*;
pub use types::*;
