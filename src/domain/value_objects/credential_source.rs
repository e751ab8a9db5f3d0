use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// SSH認証情報の取得元
///
/// YAMLでは `kind` タグで種類を指定する:
///
/// ```yaml
/// kind: key_file_pair
/// public_key: /etc/deploy/id_rsa.pub.pem
/// private_key: /etc/deploy/id_rsa.pem
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialSource {
    /// ユーザーのホームディレクトリの `.ssh`
    DefaultDirectory,

    /// 任意のSSHディレクトリ（慣例的な名前の鍵ファイルを含む）
    ExplicitDirectory { ssh_dir: PathBuf },

    /// メモリ上の秘密鍵テキスト。`ssh_dir` に一時ファイルとして書き出される
    /// （省略時はデフォルトの `.ssh`）
    InlineKeyText {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ssh_dir: Option<PathBuf>,
        key_text: String,
    },

    /// PEM形式の公開鍵・秘密鍵ファイルの組
    KeyFilePair {
        public_key: PathBuf,
        private_key: PathBuf,
    },
}

impl CredentialSource {
    pub fn explicit_directory(ssh_dir: impl Into<PathBuf>) -> Self {
        Self::ExplicitDirectory {
            ssh_dir: ssh_dir.into(),
        }
    }

    pub fn inline_key_text(ssh_dir: Option<PathBuf>, key_text: impl Into<String>) -> Self {
        Self::InlineKeyText {
            ssh_dir,
            key_text: key_text.into(),
        }
    }

    pub fn key_file_pair(public_key: impl Into<PathBuf>, private_key: impl Into<PathBuf>) -> Self {
        Self::KeyFilePair {
            public_key: public_key.into(),
            private_key: private_key.into(),
        }
    }

    /// ログ出力用の種類名
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::DefaultDirectory => "default_directory",
            Self::ExplicitDirectory { .. } => "explicit_directory",
            Self::InlineKeyText { .. } => "inline_key_text",
            Self::KeyFilePair { .. } => "key_file_pair",
        }
    }

    /// 呼び出し側が指定したSSHディレクトリ（あれば）
    pub fn ssh_dir(&self) -> Option<&Path> {
        match self {
            Self::ExplicitDirectory { ssh_dir } => Some(ssh_dir),
            Self::InlineKeyText { ssh_dir, .. } => ssh_dir.as_deref(),
            Self::DefaultDirectory | Self::KeyFilePair { .. } => None,
        }
    }

    /// 一時ファイルを書き出す種類かどうか
    pub fn writes_transient_files(&self) -> bool {
        matches!(self, Self::InlineKeyText { .. })
    }
}

// 秘密鍵テキストをログに出さない
impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DefaultDirectory => f.write_str("DefaultDirectory"),
            Self::ExplicitDirectory { ssh_dir } => f
                .debug_struct("ExplicitDirectory")
                .field("ssh_dir", ssh_dir)
                .finish(),
            Self::InlineKeyText { ssh_dir, key_text } => f
                .debug_struct("InlineKeyText")
                .field("ssh_dir", ssh_dir)
                .field("key_text", &format_args!("<{} bytes redacted>", key_text.len()))
                .finish(),
            Self::KeyFilePair {
                public_key,
                private_key,
            } => f
                .debug_struct("KeyFilePair")
                .field("public_key", public_key)
                .field("private_key", private_key)
                .finish(),
        }
    }
}
