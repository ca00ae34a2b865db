pub mod capture;
pub mod compare;
pub mod condition;
pub mod config;
pub mod error;
pub mod invocation;
pub mod logger;
pub mod snapshot;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use error::{CurlcheckError, Result};
