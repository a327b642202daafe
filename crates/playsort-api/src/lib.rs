pub mod error;
pub mod traits;
pub mod youtube;

pub use error::{ApiError, ErrorKind};
