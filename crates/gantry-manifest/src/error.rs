//! Error types for manifest synthesis

use std::path::PathBuf;

/// Synthesis Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Synthesis errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("declared path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("invalid line {line} in {path}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Error::NotFound { path: path.into() }
    }

    pub fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}
