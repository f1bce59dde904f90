pub mod error;
pub mod summary;
pub mod types;

pub use error::*;
pub use types::*;
