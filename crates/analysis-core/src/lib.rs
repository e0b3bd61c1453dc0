pub mod calendar;
pub mod config;
pub mod error;
pub mod stats;
pub mod traits;
pub mod types;

pub use calendar::*;
pub use config::*;
pub use error::*;
pub use traits::*;
pub use types::*;
