pub mod config;
pub mod doctor;
pub mod locks;
pub mod store;
pub mod workspace;

pub use config::*;
pub use doctor::*;
pub use locks::*;
pub use store::*;
pub use workspace::*;
