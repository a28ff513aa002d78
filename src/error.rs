//! Error types for scionet

use thiserror::Error;

/// Main error type for scionet
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid address: {0}")]
    Parse(String),

    #[error("Resolve failed: {0}")]
    Resolve(String),

    #[error("Dial failed: {0}")]
    Dial(String),

    #[error("Bind failed: {0}")]
    Bind(String),

    #[error("Stream setup failed: {0}")]
    Stream(String),

    #[error("Accept failed: {0}")]
    Accept(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Timeout")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type alias for scionet
pub type Result<T> = std::result::Result<T, Error>;
