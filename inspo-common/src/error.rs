//! Common error types for inspo

use thiserror::Error;

/// Common result type for inspo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across inspo services
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
