//! Errors surfaced by the engine and the event store.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::validator::Rejection;

#[derive(Debug, Error)]
pub enum HearthError {
    /// The event violated an admission rule; nothing was appended.
    #[error("event rejected: {0}")]
    EventRejected(#[from] Rejection),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl HearthError {
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            HearthError::EventRejected(rejection) => Some(rejection),
            HearthError::Store(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("event log I/O failed at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not lock event log {path}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("event log {path} is corrupt")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
