//! Unified error types for Skiff

use thiserror::Error;

/// Unified error type for all Skiff operations
#[derive(Error, Debug)]
pub enum SkiffError {
    // Model endpoint errors
    #[error("Model endpoint error: {0}")]
    Model(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    // Browser errors
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Screenshot capture failed: {0}")]
    Capture(String),

    #[error("Browser error: {0}")]
    Browser(String),

    // Channel errors
    #[error("Malformed inbound payload: {0}")]
    Protocol(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using SkiffError
pub type Result<T> = std::result::Result<T, SkiffError>;
