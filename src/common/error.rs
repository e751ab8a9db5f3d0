use std::path::PathBuf;
use thiserror::Error;

use crate::infrastructure::git::error::{CloneError, CommitError, PushError, RepositoryInitError};
use crate::infrastructure::ssh::error::{KeyLoadError, SessionFactoryError};

#[derive(Error, Debug)]
pub enum SshGitError {
    #[error(transparent)]
    RepositoryInit(#[from] RepositoryInitError),

    #[error(transparent)]
    Clone(#[from] CloneError),

    #[error(transparent)]
    Commit(#[from] CommitError),

    #[error(transparent)]
    Push(#[from] PushError),

    #[error(transparent)]
    KeyLoad(#[from] KeyLoadError),

    #[error(transparent)]
    SessionFactory(#[from] SessionFactoryError),

    #[error("Transient file could not be deleted, key material may remain on disk: {}", path.display())]
    TransientFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Repository manager is closed: {}", path.display())]
    Closed { path: PathBuf },

    #[error("Working copy could not be restored after a failed clone: {}: {reason}", path.display())]
    Unrecoverable { path: PathBuf, reason: String },

    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        file_path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SshGitError {
    pub fn transient_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::TransientFile {
            path: path.into(),
            source,
        }
    }

    pub fn closed(path: impl Into<PathBuf>) -> Self {
        Self::Closed { path: path.into() }
    }

    pub fn unrecoverable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Unrecoverable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config_error(message: impl Into<String>, file_path: Option<PathBuf>) -> Self {
        Self::ConfigError {
            message: message.into(),
            file_path,
            source: None,
        }
    }

    pub fn config_error_with_source(
        message: impl Into<String>,
        file_path: Option<PathBuf>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ConfigError {
            message: message.into(),
            file_path,
            source: Some(Box::new(source)),
        }
    }

    /// Authentication failures from either remote operation.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Self::Clone(CloneError::Authentication { .. })
                | Self::Push(PushError::Authentication { .. })
                | Self::Clone(CloneError::KeyLoad(_))
                | Self::Push(PushError::KeyLoad(_))
                | Self::KeyLoad(_)
        )
    }

    /// Errors after which transient key material may still be on disk.
    pub fn leaves_key_material(&self) -> bool {
        matches!(self, Self::TransientFile { .. })
    }
}

impl From<serde_yaml::Error> for SshGitError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::config_error_with_source("YAML serialization failed", None, error)
    }
}
