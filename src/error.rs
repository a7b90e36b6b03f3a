//! Error types for sharedvars
//!
//! Provides a unified error type for all operations. Every variant maps to
//! exactly one wire status code, see [`VarError::status`].

use thiserror::Error;

use crate::protocol::Status;

/// Result type alias using VarError
pub type Result<T> = std::result::Result<T, VarError>;

/// Unified error type for sharedvars operations
#[derive(Debug, Error)]
pub enum VarError {
    // -------------------------------------------------------------------------
    // Request Errors
    // -------------------------------------------------------------------------
    #[error("Malformed request: {0}")]
    Malformed(String),

    #[error("Variable or group not found")]
    NotFound,

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Type mismatch")]
    TypeMismatch,

    // -------------------------------------------------------------------------
    // Access Errors
    // -------------------------------------------------------------------------
    #[error("Read access denied")]
    ReadDenied,

    #[error("Write access denied")]
    WriteDenied,

    #[error("Operation failed: {0}")]
    Failed(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl VarError {
    /// Wire status reported to the client for this error
    pub fn status(&self) -> Status {
        match self {
            VarError::Malformed(_) | VarError::Protocol(_) | VarError::Config(_) => {
                Status::Malformed
            }
            VarError::NotFound | VarError::QuotaExceeded(_) => Status::NotFound,
            VarError::TypeMismatch => Status::TypeMismatch,
            VarError::ReadDenied | VarError::WriteDenied => Status::AccessDenied,
            VarError::Failed(_) | VarError::Io(_) => Status::Failed,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        VarError::Malformed(reason.into())
    }
}
