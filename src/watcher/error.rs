//! Error types for watch sessions and the dispatcher.

use std::path::PathBuf;
use thiserror::Error;

use crate::operation::OperationError;

/// Errors from a single watch session.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Cannot watch {}: {source}", .path.display())]
    Registration {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("Cannot read watch directory {}: {source}", .path.display())]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Operation failed in {}: {source}", .path.display())]
    Operation {
        path: PathBuf,
        #[source]
        source: OperationError,
    },

    #[error("File system event error: {details}")]
    Notification { details: String },

    #[error("Session for {} ended abnormally: {details}", .path.display())]
    SessionFailed { path: PathBuf, details: String },
}

impl WatchError {
    /// Directory the error belongs to, when known.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            WatchError::Registration { path, .. }
            | WatchError::DirectoryRead { path, .. }
            | WatchError::Operation { path, .. }
            | WatchError::SessionFailed { path, .. } => Some(path),
            WatchError::Notification { .. } => None,
        }
    }
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::Notification {
            details: e.to_string(),
        }
    }
}

/// Errors that end a dispatcher run.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No watch session could start ({failed} failed)")]
    NoActiveSessions { failed: usize },
}
