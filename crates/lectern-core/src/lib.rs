pub mod config;
pub mod course;
pub mod error;

// Re-export common error type
pub use error::{LecternError, Result};
