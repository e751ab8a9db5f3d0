use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

/// URLにユーザー名がない場合に使うユーザー名
pub const DEFAULT_SSH_USER: &str = "git";

/// 一時設定ファイルに書き出すHost
pub const DEFAULT_CONFIG_HOST: &str = "github.com";

/// 公開鍵認証のみ
pub const DEFAULT_PREFERRED_AUTHENTICATIONS: &str = "publickey";

/// SSHトランスポートのオプション
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SshOptions {
    /// URLにユーザー名がない場合のユーザー名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255))]
    pub user: Option<String>,

    /// 一時設定ファイルの `Host` 行
    #[serde(default = "default_config_host")]
    #[validate(length(min = 1, max = 255))]
    pub config_host: String,

    /// ホームディレクトリ（省略時は `HOME` / `USERPROFILE`）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_dir: Option<PathBuf>,

    /// 認証方式の優先順位（カンマ区切り）
    #[serde(default = "default_preferred_authentications")]
    #[validate(length(min = 1))]
    pub preferred_authentications: String,
}

fn default_config_host() -> String {
    DEFAULT_CONFIG_HOST.to_string()
}

fn default_preferred_authentications() -> String {
    DEFAULT_PREFERRED_AUTHENTICATIONS.to_string()
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            user: None,
            config_host: default_config_host(),
            home_dir: None,
            preferred_authentications: default_preferred_authentications(),
        }
    }
}

impl SshOptions {
    /// ユーザー名を設定
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// ホームディレクトリを設定
    pub fn with_home_dir(mut self, home_dir: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(home_dir.into());
        self
    }

    /// 一時設定ファイルのHostを設定
    pub fn with_config_host(mut self, host: impl Into<String>) -> Self {
        self.config_host = host.into();
        self
    }
}
