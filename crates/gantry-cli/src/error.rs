//! Error types for the CLI

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Manifest(#[from] gantry_manifest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("project config error: {message}")]
    ProjectConfig { message: String },
}

impl Error {
    pub fn project_config(message: impl Into<String>) -> Self {
        Error::ProjectConfig {
            message: message.into(),
        }
    }
}
