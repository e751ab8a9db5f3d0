use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// WorkingCopyPath関連のエラー
#[derive(Debug, Error)]
pub enum WorkingCopyPathError {
    #[error("Path cannot be empty")]
    Empty,

    #[error("Path contains null bytes")]
    ContainsNullBytes,

    #[error("Current directory is unavailable: {0}")]
    CurrentDirUnavailable(#[source] std::io::Error),
}

/// ローカル作業コピーの絶対パス（値オブジェクト）
///
/// 作成時に絶対パスへ解決し、`.` と `..` を字句的に取り除く。
/// シンボリックリンクは解決しない（ディレクトリがまだ存在しない場合があるため）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkingCopyPath {
    path: PathBuf,
}

impl WorkingCopyPath {
    /// 現在のディレクトリを基準にパスを解決
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self, WorkingCopyPathError> {
        let path = path.as_ref();
        Self::validate(path)?;

        if path.is_absolute() {
            return Ok(Self {
                path: normalize_lexically(path),
            });
        }

        let cwd = std::env::current_dir().map_err(WorkingCopyPathError::CurrentDirUnavailable)?;
        Ok(Self::resolve_against(&cwd, path))
    }

    /// 指定したベースディレクトリを基準にパスを解決
    pub fn resolve_against(base: &Path, path: &Path) -> Self {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        };
        Self {
            path: normalize_lexically(&joined),
        }
    }

    fn validate(path: &Path) -> Result<(), WorkingCopyPathError> {
        let as_str = path.to_string_lossy();
        if as_str.trim().is_empty() {
            return Err(WorkingCopyPathError::Empty);
        }
        if as_str.contains('\0') {
            return Err(WorkingCopyPathError::ContainsNullBytes);
        }
        Ok(())
    }

    pub fn as_path(&self) -> &Path {
        &self.path
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.path
    }
}

impl AsRef<Path> for WorkingCopyPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for WorkingCopyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// `.` と `..` を取り除く（ルートより上には遡らない）
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}
