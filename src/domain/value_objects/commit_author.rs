use serde::{Deserialize, Serialize};
use validator::Validate;

/// リポジトリ設定に署名がない場合のコミット作成者
pub const FALLBACK_AUTHOR_NAME: &str = "sshgit";
pub const FALLBACK_AUTHOR_EMAIL: &str = "sshgit@localhost";

/// 自動コミットの作成者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CommitAuthor {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[validate(email)]
    pub email: String,
}

impl CommitAuthor {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// 設定がない場合の作成者
    pub fn fallback() -> Self {
        Self::new(FALLBACK_AUTHOR_NAME, FALLBACK_AUTHOR_EMAIL)
    }
}
