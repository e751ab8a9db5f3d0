use crate::common::error::SshGitError;

/// sshgit全体で使用するResult型のエイリアス
///
/// # Examples
///
/// ```
/// use sshgit::common::result::SshGitResult;
/// use sshgit::common::error::SshGitError;
///
/// fn example_function() -> SshGitResult<String> {
///     Ok("success".to_string())
/// }
///
/// fn example_with_error() -> SshGitResult<()> {
///     Err(SshGitError::config_error("remote is required", None))
/// }
/// ```
pub type SshGitResult<T> = Result<T, SshGitError>;

/// 標準のResult型をSshGitResultに変換するためのヘルパー
pub trait ResultExt<T, E> {
    /// エラー変換関数を使ってSshGitResultに変換する
    fn map_sshgit_err<F>(self, f: F) -> SshGitResult<T>
    where
        F: FnOnce(E) -> SshGitError;

    /// 設定エラーとしてSshGitResultに変換する
    ///
    /// ```
    /// use sshgit::common::result::{ResultExt, SshGitResult};
    ///
    /// let result: Result<u16, std::num::ParseIntError> = "not-a-port".parse();
    /// let converted: SshGitResult<u16> = result.with_config_context("invalid port");
    /// assert!(converted.is_err());
    /// ```
    fn with_config_context(self, message: impl Into<String>) -> SshGitResult<T>
    where
        E: std::error::Error + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn map_sshgit_err<F>(self, f: F) -> SshGitResult<T>
    where
        F: FnOnce(E) -> SshGitError,
    {
        self.map_err(f)
    }

    fn with_config_context(self, message: impl Into<String>) -> SshGitResult<T>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.map_err(|e| SshGitError::config_error_with_source(message, None, e))
    }
}
