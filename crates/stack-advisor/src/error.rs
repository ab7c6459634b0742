//! Error types for Stack Advisor
//!
//! Component failures stay with their components (`StoreError`,
//! `GenerationError`, `CaptureError`, `SessionError`) and are recovered
//! inside the session. Only loading the configuration can fail outright.

use thiserror::Error;

/// Main error type for Stack Advisor operations
#[derive(Error, Debug)]
pub enum AdvisorError {
    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for Stack Advisor operations
pub type Result<T> = std::result::Result<T, AdvisorError>;
