//! Error taxonomy for recipe configuration, compilation and result merging.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid sky / simulation kind combination or invalid recipe inputs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Bad weather file, unreadable points file or geometry reference.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Empty or malformed input handed to a stage command builder.
    #[error("invalid stage input: {0}")]
    BuilderInput(String),

    #[error("malformed result file name: {}", .0.display())]
    MalformedResultFile(PathBuf),

    #[error("result shape mismatch in {}: {message}", .path.display())]
    ResultShapeMismatch { path: PathBuf, message: String },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
