use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading and aligning a recording session
#[derive(Debug, Error)]
pub enum AlignError {
    #[error("required file not found: {0}")]
    MissingFile(PathBuf),

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("unusable data: {0}")]
    Data(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AlignError {
    pub fn parse(path: &Path, message: impl Into<String>) -> Self {
        AlignError::Parse {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn data(message: impl Into<String>) -> Self {
        AlignError::Data(message.into())
    }
}

pub type Result<T> = std::result::Result<T, AlignError>;
