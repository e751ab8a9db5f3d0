use crate::domain::value_objects::{
    commit_author::CommitAuthor, credential_source::CredentialSource, remote_url::RemoteUrl,
    ssh_options::SshOptions,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use validator::{Validate, ValidationError};

/// ジョブで実行する操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishAction {
    /// リモートからクローンする（ローカルの内容は削除される）
    Clone,
    /// 変更をステージ・コミットしてプッシュする
    #[default]
    CommitPush,
    /// クローンした後にコミット・プッシュする
    CloneThenCommitPush,
}

impl PublishAction {
    pub fn clones(&self) -> bool {
        matches!(self, Self::Clone | Self::CloneThenCommitPush)
    }

    pub fn commits(&self) -> bool {
        matches!(self, Self::CommitPush | Self::CloneThenCommitPush)
    }
}

impl fmt::Display for PublishAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clone => write!(f, "clone"),
            Self::CommitPush => write!(f, "commit_push"),
            Self::CloneThenCommitPush => write!(f, "clone_then_commit_push"),
        }
    }
}

/// 1回分のクローン／コミット・プッシュ処理の定義
///
/// ```yaml
/// remote: git@github.com:acme/widgets.git
/// local_path: /tmp/widgets
/// action: commit_push
/// pathspec: notes.txt
/// credential:
///   kind: explicit_directory
///   ssh_dir: /home/ci/.ssh
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PublishJob {
    /// リモートリポジトリ
    pub remote: RemoteUrl,

    /// ローカル作業コピーのパス
    #[validate(custom(function = "validate_local_path"))]
    pub local_path: PathBuf,

    /// 実行する操作
    #[serde(default)]
    pub action: PublishAction,

    /// ステージ対象（省略時はすべての変更）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub pathspec: Option<String>,

    /// SSH認証情報の取得元
    pub credential: CredentialSource,

    /// 自動コミットの作成者
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub author: Option<CommitAuthor>,

    /// SSHトランスポートのオプション
    #[serde(default)]
    #[validate(nested)]
    pub ssh: SshOptions,
}

fn validate_local_path(path: &PathBuf) -> Result<(), ValidationError> {
    if path.as_os_str().is_empty() {
        return Err(ValidationError::new("empty_local_path"));
    }
    Ok(())
}

impl PublishJob {
    /// 新しいジョブを作成
    pub fn new(
        remote: RemoteUrl,
        local_path: impl Into<PathBuf>,
        credential: CredentialSource,
    ) -> Self {
        Self {
            remote,
            local_path: local_path.into(),
            action: PublishAction::default(),
            pathspec: None,
            credential,
            author: None,
            ssh: SshOptions::default(),
        }
    }

    /// 操作を設定
    pub fn with_action(mut self, action: PublishAction) -> Self {
        self.action = action;
        self
    }

    /// ステージ対象を設定
    pub fn with_pathspec(mut self, pathspec: impl Into<String>) -> Self {
        self.pathspec = Some(pathspec.into());
        self
    }

    /// 作成者を設定
    pub fn with_author(mut self, author: CommitAuthor) -> Self {
        self.author = Some(author);
        self
    }

    /// SSHオプションを設定
    pub fn with_ssh_options(mut self, ssh: SshOptions) -> Self {
        self.ssh = ssh;
        self
    }
}
