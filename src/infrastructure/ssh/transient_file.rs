use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::error::SessionFactoryError;
use crate::common::error::SshGitError;
use crate::common::result::SshGitResult;

/// 一時的に書き出したファイル。ドロップ時に削除される。
#[derive(Debug)]
pub struct TransientFile {
    path: PathBuf,
    deleted: bool,
}

impl TransientFile {
    /// 新しいファイルを作成して内容を書き込む（既存ファイルは上書きしない）
    pub fn create(path: impl Into<PathBuf>, contents: &[u8]) -> Result<Self, SessionFactoryError> {
        let path = path.into();

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::AlreadyExists {
                SessionFactoryError::WouldOverwrite { path: path.clone() }
            } else {
                SessionFactoryError::WriteTransientFile {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        // the guard exists before the write so a partial file is still removed
        let guard = Self {
            path,
            deleted: false,
        };
        file.write_all(contents)
            .and_then(|_| file.sync_all())
            .map_err(|source| SessionFactoryError::WriteTransientFile {
                path: guard.path.clone(),
                source,
            })?;

        debug!(path = %guard.path.display(), "Wrote transient file");
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// ファイルを削除する。すでに存在しない場合は成功扱い。
    pub fn delete(&mut self) -> SshGitResult<()> {
        if self.deleted {
            return Ok(());
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Deleted transient file");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(SshGitError::transient_file(&self.path, e)),
        }
        self.deleted = true;
        Ok(())
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if let Err(e) = self.delete() {
            warn!(error = %e, "Transient file left on disk");
        }
    }
}
