use std::path::PathBuf;
use thiserror::Error;

/// PEM鍵の読み込みエラー
#[derive(Debug, Error)]
pub enum KeyLoadError {
    #[error("Failed to read key file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing -----BEGIN/END----- armor in {what}")]
    MissingArmor { what: &'static str },

    #[error("Invalid base64 in {what}: {source}")]
    Base64 {
        what: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Malformed DER in {what}: {message}")]
    MalformedDer { what: &'static str, message: String },

    #[error("Unsupported key algorithm in {what}: {oid} (only RSA is supported)")]
    UnsupportedAlgorithm { what: &'static str, oid: String },

    #[error("Invalid RSA private key: {0}")]
    InvalidKey(String),

    #[error("Public key does not match private key")]
    Mismatch,
}

impl KeyLoadError {
    pub fn malformed(what: &'static str, error: impl std::fmt::Display) -> Self {
        Self::MalformedDer {
            what,
            message: error.to_string(),
        }
    }
}

/// Session Factory の構築エラー
#[derive(Debug, Error)]
pub enum SessionFactoryError {
    #[error("Home directory is unavailable (HOME / USERPROFILE not set)")]
    HomeDirectoryUnavailable,

    #[error("SSH directory does not exist: {}", path.display())]
    SshDirectoryMissing { path: PathBuf },

    #[error("Unsupported SSH authentication method: {method}")]
    UnsupportedAuthentication { method: String },

    #[error("Refusing to overwrite existing file: {}", path.display())]
    WouldOverwrite { path: PathBuf },

    #[error("Failed to write transient file {}: {source}", path.display())]
    WriteTransientFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read SSH configuration {}: {source}", path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SSH transport has been stopped")]
    Stopped,
}
