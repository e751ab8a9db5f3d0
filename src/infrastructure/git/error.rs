use std::path::PathBuf;
use thiserror::Error;

use crate::domain::value_objects::{RemoteUrlError, WorkingCopyPathError};
use crate::infrastructure::ssh::error::{KeyLoadError, SessionFactoryError};

/// 作業コピーを開く／初期化する際のエラー
#[derive(Debug, Error)]
pub enum RepositoryInitError {
    #[error("Invalid remote URL: {0}")]
    InvalidRemote(#[from] RemoteUrlError),

    #[error("Invalid local path: {0}")]
    InvalidPath(#[from] WorkingCopyPathError),

    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Local path is not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("Directory is not writable {}: {source}", path.display())]
    NotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open repository at {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to initialize repository at {}: {source}", path.display())]
    Init {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },
}

/// クローンのエラー
#[derive(Debug, Error)]
pub enum CloneError {
    #[error("Authentication failed for {url}: {message}")]
    Authentication { url: String, message: String },

    #[error("Remote is unreachable {url}: {message}")]
    Unreachable { url: String, message: String },

    #[error("Failed to clear directory {}: {source}", path.display())]
    ClearDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SSH transport error: {0}")]
    Transport(#[from] SessionFactoryError),

    #[error("Failed to load SSH key: {0}")]
    KeyLoad(#[from] KeyLoadError),

    #[error("Clone of {url} failed: {source}")]
    Failed {
        url: String,
        #[source]
        source: git2::Error,
    },
}

impl CloneError {
    pub(crate) fn from_git(url: &str, error: git2::Error) -> Self {
        match classify(&error) {
            RemoteFailure::Authentication => Self::Authentication {
                url: url.to_string(),
                message: error.message().to_string(),
            },
            RemoteFailure::Network => Self::Unreachable {
                url: url.to_string(),
                message: error.message().to_string(),
            },
            RemoteFailure::Rejected | RemoteFailure::Other => Self::Failed {
                url: url.to_string(),
                source: error,
            },
        }
    }
}

/// ステージ・コミットのエラー
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("Nothing to commit, working tree clean")]
    NothingToCommit,

    #[error("Failed to stage {pathspec}: {source}")]
    Stage {
        pathspec: String,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to determine commit signature: {0}")]
    Signature(#[source] git2::Error),

    #[error("Failed to write commit: {0}")]
    Write(#[source] git2::Error),
}

/// プッシュのエラー
#[derive(Debug, Error)]
pub enum PushError {
    #[error("Authentication failed for {url}: {message}")]
    Authentication { url: String, message: String },

    #[error("Network error while pushing to {url}: {message}")]
    Network { url: String, message: String },

    #[error("Remote rejected {reference}: {message}")]
    Rejected { reference: String, message: String },

    #[error("HEAD is detached, no branch to push")]
    DetachedHead,

    #[error("SSH transport error: {0}")]
    Transport(#[from] SessionFactoryError),

    #[error("Failed to load SSH key: {0}")]
    KeyLoad(#[from] KeyLoadError),

    #[error("Push to {url} failed: {source}")]
    Failed {
        url: String,
        #[source]
        source: git2::Error,
    },
}

impl PushError {
    pub(crate) fn from_git(url: &str, reference: &str, error: git2::Error) -> Self {
        match classify(&error) {
            RemoteFailure::Authentication => Self::Authentication {
                url: url.to_string(),
                message: error.message().to_string(),
            },
            RemoteFailure::Network => Self::Network {
                url: url.to_string(),
                message: error.message().to_string(),
            },
            RemoteFailure::Rejected => Self::Rejected {
                reference: reference.to_string(),
                message: error.message().to_string(),
            },
            RemoteFailure::Other => Self::Failed {
                url: url.to_string(),
                source: error,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RemoteFailure {
    Authentication,
    Network,
    Rejected,
    Other,
}

/// libgit2のエラーコード／クラスからリモート操作の失敗種別を判定
pub(crate) fn classify(error: &git2::Error) -> RemoteFailure {
    use git2::{ErrorClass, ErrorCode};

    match error.code() {
        ErrorCode::Auth | ErrorCode::Certificate => RemoteFailure::Authentication,
        ErrorCode::NotFastForward => RemoteFailure::Rejected,
        _ => match error.class() {
            ErrorClass::Net | ErrorClass::Ssh | ErrorClass::Http | ErrorClass::Ssl => {
                RemoteFailure::Network
            }
            _ => RemoteFailure::Other,
        },
    }
}
