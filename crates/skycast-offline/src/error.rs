use std::path::PathBuf;

use thiserror::Error;

use crate::lifecycle::LifecycleState;

#[derive(Debug, Error)]
pub enum OfflineError {
    #[error("Network request for {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("Precache of {url} failed with HTTP {status}")]
    Precache { url: String, status: u16 },

    #[error("No network and nothing cached for {url}")]
    NoResponse { url: String },

    #[error("Invalid URL '{input}': {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Cache storage I/O failed at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache index is corrupted: {0}")]
    Corrupted(#[from] serde_json::Error),

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },
}

impl OfflineError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Whether the failure came from the network rather than local storage
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Precache { .. } | Self::NoResponse { .. }
        )
    }
}

pub type OfflineResult<T> = Result<T, OfflineError>;
