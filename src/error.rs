use std::path::PathBuf;

/// Failure classes surfaced by tile, composite and feature operations.
#[derive(Debug, thiserror::Error)]
pub enum CdbError {
    /// The resolved tile (or its primary layer) is not on disk.
    #[error("tile not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A backend failed on a file that does exist.
    #[error("driver failure on {}: {message}", path.display())]
    Driver { path: PathBuf, message: String },

    /// None of the candidate tiles for a composite exist.
    #[error("no contributing tiles for composite {name}")]
    CompositeInsufficientData { name: String },

    /// The class layer is absent or lacks a required attribute.
    #[error("class map unavailable for {}: {reason}", path.display())]
    ClassMapMissing { path: PathBuf, reason: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CdbError {
    pub(crate) fn driver(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        CdbError::Driver { path: path.into(), message: message.to_string() }
    }

    pub(crate) fn class_map(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        CdbError::ClassMapMissing { path: path.into(), reason: reason.into() }
    }

    /// Errors that callers record in the session blacklist.
    pub fn is_blacklistable(&self) -> bool {
        matches!(self, CdbError::NotFound(_) | CdbError::Driver { .. })
    }

    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool { matches!(self, CdbError::Io(_)) }
}

pub type Result<T> = std::result::Result<T, CdbError>;
