//! # Grader Shared
//!
//! Configuration, scenario file formats and error types used across
//! the grader crates.

pub mod config;
pub mod error;
pub mod scenario;

// Re-exports
pub use config::*;
pub use error::*;
pub use scenario::*;
