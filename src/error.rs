//! Error types for wallet status reconciliation
//!
//! Arithmetic failures and unavailable collaborators are hard errors for the
//! affected computation only. Malformed order or channel records are not
//! errors at all: they are reported as [`crate::channels::IntegrityIssue`]s
//! and reconciliation continues without them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("Arithmetic overflow: {context}")]
    ArithmeticOverflow { context: String },

    #[error("Negative amount: {context} ({minuend} - {subtrahend})")]
    NegativeAmount {
        context: String,
        minuend: u64,
        subtrahend: u64,
    },

    #[error("Collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl StatusError {
    pub fn overflow(context: impl Into<String>) -> Self {
        Self::ArithmeticOverflow {
            context: context.into(),
        }
    }

    pub fn unavailable(what: impl Into<String>) -> Self {
        Self::CollaboratorUnavailable(what.into())
    }

    /// True for errors that mean "input missing" rather than "input wrong"
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::CollaboratorUnavailable(_) | Self::Storage(StorageError::FileNotFound(_))
        )
    }
}

/// Checked monetary addition
pub(crate) fn add_sats(a: u64, b: u64, context: &str) -> Result<u64, StatusError> {
    a.checked_add(b).ok_or_else(|| StatusError::overflow(context))
}

/// Checked monetary subtraction; never clamps to zero
pub(crate) fn sub_sats(a: u64, b: u64, context: &str) -> Result<u64, StatusError> {
    a.checked_sub(b).ok_or_else(|| StatusError::NegativeAmount {
        context: context.to_string(),
        minuend: a,
        subtrahend: b,
    })
}
