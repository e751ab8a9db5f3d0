use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

/// scp形式 (`user@host:path`) のURLパターン
const SCP_LIKE_PATTERN: &str = r"^(?:(?P<user>[^@/:\s]+)@)?(?P<host>[A-Za-z0-9._\-]+|\[[^\]\s]+\]):(?P<path>\S.*)$";

/// リモートURL関連のエラー
#[derive(Debug, Error, PartialEq)]
pub enum RemoteUrlError {
    #[error("Remote URL cannot be empty")]
    Empty,

    #[error("Invalid remote URL format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported remote URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Missing host in remote URL: {0}")]
    MissingHost(String),

    #[error("Missing repository path in remote URL: {0}")]
    MissingPath(String),
}

/// リモートURLの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteKind {
    /// `git@github.com:owner/repo.git`
    ScpLike,
    /// `ssh://git@github.com/owner/repo.git`
    Ssh,
    /// `https://github.com/owner/repo.git`
    Https,
    /// `http://...`
    Http,
    /// `git://...`
    Git,
    /// `file:///srv/git/repo.git`
    File,
    /// `/srv/git/repo.git`
    LocalPath,
}

impl RemoteKind {
    /// SSHトランスポートを使用するかどうか
    pub fn uses_ssh(&self) -> bool {
        matches!(self, RemoteKind::ScpLike | RemoteKind::Ssh)
    }

    /// ネットワークを経由しないかどうか
    pub fn is_local(&self) -> bool {
        matches!(self, RemoteKind::File | RemoteKind::LocalPath)
    }
}

impl fmt::Display for RemoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteKind::ScpLike => "scp-like",
            RemoteKind::Ssh => "ssh",
            RemoteKind::Https => "https",
            RemoteKind::Http => "http",
            RemoteKind::Git => "git",
            RemoteKind::File => "file",
            RemoteKind::LocalPath => "local",
        };
        write!(f, "{}", name)
    }
}

/// リモートリポジトリの参照（値オブジェクト）
///
/// 元のURL文字列はそのままgit2に渡し、解析結果は認証情報の選択
/// (ユーザー名、ホストごとのSSH設定) にのみ使用する。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteUrl {
    /// 入力されたURL文字列（前後の空白のみ除去）
    raw: String,

    /// URLの種類
    kind: RemoteKind,

    /// ユーザー名（`git@...` の `git`）
    user: Option<String>,

    /// ホスト名
    host: Option<String>,

    /// ポート番号
    port: Option<u16>,

    /// リポジトリパス
    path: String,
}

impl RemoteUrl {
    /// 新しいRemoteUrlを作成
    pub fn parse(input: &str) -> Result<Self, RemoteUrlError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(RemoteUrlError::Empty);
        }

        if raw.contains("://") {
            Self::parse_scheme_url(raw)
        } else if Self::looks_scp_like(raw) {
            Self::parse_scp_like(raw)
        } else {
            Ok(Self {
                raw: raw.to_string(),
                kind: RemoteKind::LocalPath,
                user: None,
                host: None,
                port: None,
                path: raw.to_string(),
            })
        }
    }

    /// `://` を含むURLを解析
    fn parse_scheme_url(raw: &str) -> Result<Self, RemoteUrlError> {
        let url = Url::parse(raw).map_err(|e| RemoteUrlError::InvalidFormat(e.to_string()))?;

        let kind = match url.scheme() {
            "ssh" | "git+ssh" | "ssh+git" => RemoteKind::Ssh,
            "https" => RemoteKind::Https,
            "http" => RemoteKind::Http,
            "git" => RemoteKind::Git,
            "file" => RemoteKind::File,
            other => return Err(RemoteUrlError::UnsupportedScheme(other.to_string())),
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .map(|h| h.to_string());
        if host.is_none() && kind != RemoteKind::File {
            return Err(RemoteUrlError::MissingHost(raw.to_string()));
        }

        let path = url.path().to_string();
        if path.trim_matches('/').is_empty() {
            return Err(RemoteUrlError::MissingPath(raw.to_string()));
        }

        let user = Some(url.username())
            .filter(|u| !u.is_empty())
            .map(|u| u.to_string());

        Ok(Self {
            raw: raw.to_string(),
            kind,
            user,
            host,
            port: url.port(),
            path,
        })
    }

    /// gitと同じ規則: 最初の `/` より前に `:` があればscp形式
    fn looks_scp_like(raw: &str) -> bool {
        let Some(colon) = raw.find(':') else {
            return false;
        };
        if raw[..colon].contains('/') {
            return false;
        }
        // Windowsのドライブレター (`C:\repo`, `C:/repo`)
        let drive_letter = colon == 1
            && raw.as_bytes()[0].is_ascii_alphabetic()
            && matches!(raw.as_bytes().get(2), Some(b'\\') | Some(b'/'));
        !drive_letter
    }

    /// scp形式のURLを解析
    fn parse_scp_like(raw: &str) -> Result<Self, RemoteUrlError> {
        let pattern =
            Regex::new(SCP_LIKE_PATTERN).map_err(|e| RemoteUrlError::InvalidFormat(e.to_string()))?;
        let captures = pattern
            .captures(raw)
            .ok_or_else(|| RemoteUrlError::InvalidFormat(raw.to_string()))?;

        let host = captures
            .name("host")
            .map(|m| m.as_str().trim_start_matches('[').trim_end_matches(']'))
            .filter(|h| !h.is_empty())
            .ok_or_else(|| RemoteUrlError::MissingHost(raw.to_string()))?;

        let path = captures
            .name("path")
            .map(|m| m.as_str())
            .filter(|p| !p.trim_matches('/').is_empty())
            .ok_or_else(|| RemoteUrlError::MissingPath(raw.to_string()))?;

        Ok(Self {
            raw: raw.to_string(),
            kind: RemoteKind::ScpLike,
            user: captures.name("user").map(|m| m.as_str().to_string()),
            host: Some(host.to_string()),
            port: None,
            path: path.to_string(),
        })
    }

    /// git2に渡すURL文字列
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// URLの種類
    pub fn kind(&self) -> RemoteKind {
        self.kind
    }

    /// ユーザー名
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// ホスト名
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// ポート番号
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// リポジトリパス
    pub fn path(&self) -> &str {
        &self.path
    }

    /// リポジトリ名（`.git` を除く）
    pub fn repo_name(&self) -> Option<&str> {
        self.path
            .trim_end_matches('/')
            .rsplit(['/', '\\'])
            .next()
            .map(|name| name.strip_suffix(".git").unwrap_or(name))
            .filter(|name| !name.is_empty())
    }
}

impl fmt::Display for RemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl TryFrom<&str> for RemoteUrl {
    type Error = RemoteUrlError;

    fn try_from(url: &str) -> Result<Self, Self::Error> {
        RemoteUrl::parse(url)
    }
}

impl TryFrom<String> for RemoteUrl {
    type Error = RemoteUrlError;

    fn try_from(url: String) -> Result<Self, Self::Error> {
        RemoteUrl::parse(&url)
    }
}

impl From<RemoteUrl> for String {
    fn from(url: RemoteUrl) -> Self {
        url.raw
    }
}
