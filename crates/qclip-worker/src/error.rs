//! Worker error types.

use std::path::PathBuf;
use thiserror::Error;

use qclip_media::MediaError;
use qclip_models::{ManifestError, RequestError};

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("{0}")]
    InvalidRequest(#[from] RequestError),

    #[error("{what} not found: {path}")]
    NotFound { what: &'static str, path: PathBuf },

    #[error("Download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Invalid clip manifest: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Extraction failed for clip '{clip}': {source}")]
    Extraction {
        clip: String,
        #[source]
        source: MediaError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn not_found(what: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            what,
            path: path.into(),
        }
    }

    pub fn download(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Download {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn extraction(clip: impl Into<String>, source: MediaError) -> Self {
        Self::Extraction {
            clip: clip.into(),
            source,
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
