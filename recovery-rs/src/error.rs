//! Error types for recovery-rs

use thiserror::Error;

use crate::transport::Traversal;

/// Result type alias for recovery operations
pub type Result<T> = std::result::Result<T, RecoveryError>;

/// Recovery error types
#[derive(Error, Debug)]
pub enum RecoveryError {
    /// Entry identifier blob could not be decoded into a short folder id
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Backend response was missing or duplicating an expected element
    #[error("Parse error: {0}")]
    Parse(String),

    /// A discovery page reported non-success
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// A copy batch reported non-success
    #[error("Copy error: {0}")]
    Copy(String),

    /// The transport cannot perform the requested traversal
    #[error("Unsupported traversal: {0}")]
    UnsupportedTraversal(Traversal),

    /// Non-success response class on a folder operation
    #[error("{operation} failed: {code}")]
    Service { operation: String, code: String },

    /// Host channel or token acquisition failed
    #[error("Host error: {0}")]
    Host(String),

    /// Caller passed an argument the transport cannot use
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Access token could not be decoded
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

impl RecoveryError {
    pub(crate) fn service(operation: &str, code: impl Into<String>) -> Self {
        RecoveryError::Service {
            operation: operation.to_string(),
            code: code.into(),
        }
    }
}
