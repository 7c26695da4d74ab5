pub mod config;
pub mod error;
pub mod globals;

pub mod handlers;

pub use error::{ApiError, Result};
pub use handlers::*;
