use chrono::Utc;
use git2::{
    build::RepoBuilder, Commit, ErrorCode, FetchOptions, IndexAddOption, Oid, PushOptions,
    Repository, RepositoryOpenFlags, Signature,
};
use std::cell::RefCell;
use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::error::{CloneError, CommitError, PushError, RepositoryInitError};
use crate::common::error::SshGitError;
use crate::common::result::SshGitResult;
use crate::domain::value_objects::{CommitAuthor, RemoteUrl, WorkingCopyPath};
use crate::infrastructure::ssh::TransportConfig;

const WRITE_CHECK_FILE: &str = ".sshgit-write-check";

/// 作業コピーをどのように用意したか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryOrigin {
    /// 既存のリポジトリを開いた
    Opened,
    /// 新しく初期化した
    Initialized,
    /// リモートからクローンした
    Cloned,
}

/// コミット時のオプション
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOptions {
    /// 作成者（省略時はリポジトリ設定、それもなければ既定の作成者）
    pub author: Option<CommitAuthor>,
}

impl CommitOptions {
    pub fn with_author(mut self, author: CommitAuthor) -> Self {
        self.author = Some(author);
        self
    }
}

/// プッシュを行わなかった理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoTransport,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoTransport => write!(f, "push skipped, no transport configured"),
        }
    }
}

/// add-commit-pushの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed { commit: Oid, branch: String },
    Skipped { commit: Oid, reason: SkipReason },
}

impl PushOutcome {
    pub fn commit(&self) -> Oid {
        match self {
            PushOutcome::Pushed { commit, .. } | PushOutcome::Skipped { commit, .. } => *commit,
        }
    }

    pub fn is_pushed(&self) -> bool {
        matches!(self, PushOutcome::Pushed { .. })
    }
}

/// ローカル作業コピーとリモートを結びつけるリポジトリ管理
pub struct RepositoryManager {
    remote: RemoteUrl,
    path: WorkingCopyPath,
    repo: Option<Repository>,
    origin: RepositoryOrigin,
    options: CommitOptions,
    /// クローン失敗後に作業コピーを戻せなかった理由
    unrecoverable: Option<String>,
}

impl fmt::Debug for RepositoryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryManager")
            .field("remote", &self.remote.as_str())
            .field("path", &self.path.as_path())
            .field("origin", &self.origin)
            .field("closed", &self.repo.is_none())
            .field("unrecoverable", &self.unrecoverable)
            .finish()
    }
}

impl RepositoryManager {
    /// リモートURLとローカルパスに結びついたマネージャを作成する
    ///
    /// パスにリポジトリがあれば開き、なければ初期化する。
    pub fn new(remote: &str, local_path: impl AsRef<Path>) -> Result<Self, RepositoryInitError> {
        Self::with_options(remote, local_path, CommitOptions::default())
    }

    pub fn with_options(
        remote: &str,
        local_path: impl AsRef<Path>,
        options: CommitOptions,
    ) -> Result<Self, RepositoryInitError> {
        let remote = RemoteUrl::parse(remote)?;
        let path = WorkingCopyPath::resolve(local_path)?;
        prepare_directory(path.as_path())?;

        let (repo, origin) = if Self::is_initialized(path.as_path()) {
            let repo = Repository::open(path.as_path()).map_err(|source| {
                RepositoryInitError::Open {
                    path: path.as_path().to_path_buf(),
                    source,
                }
            })?;
            (repo, RepositoryOrigin::Opened)
        } else {
            check_writable(path.as_path())?;
            let repo = Repository::init(path.as_path()).map_err(|source| {
                RepositoryInitError::Init {
                    path: path.as_path().to_path_buf(),
                    source,
                }
            })?;
            (repo, RepositoryOrigin::Initialized)
        };

        info!(
            remote = %remote,
            path = %path,
            origin = ?origin,
            "Prepared local working copy"
        );

        Ok(Self {
            remote,
            path,
            repo: Some(repo),
            origin,
            options,
            unrecoverable: None,
        })
    }

    /// `path` 自体が作業ツリーを持つリポジトリかどうか
    ///
    /// 親ディレクトリは探索しない。作業ツリーのパスは値で比較する。
    pub fn is_initialized(path: &Path) -> bool {
        let repo = match Repository::open_ext(
            path,
            RepositoryOpenFlags::NO_SEARCH,
            std::iter::empty::<&OsStr>(),
        ) {
            Ok(repo) => repo,
            Err(_) => return false,
        };

        match (
            repo.workdir().map(fs::canonicalize),
            fs::canonicalize(path),
        ) {
            (Some(Ok(workdir)), Ok(target)) => workdir == target,
            _ => false,
        }
    }

    pub fn remote(&self) -> &RemoteUrl {
        &self.remote
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    pub fn origin(&self) -> RepositoryOrigin {
        self.origin
    }

    pub fn is_closed(&self) -> bool {
        self.repo.is_none()
    }

    /// クローン失敗後に作業コピーを初期化し直せなかったか
    pub fn is_unrecoverable(&self) -> bool {
        self.unrecoverable.is_some()
    }

    /// HEADのコミット（未コミットのブランチなら `None`）
    pub fn head_commit(&self) -> SshGitResult<Option<Oid>> {
        let repo = self.repo()?;
        match repo.head() {
            Ok(head) => Ok(head.target()),
            Err(e) if is_unborn(&e) => Ok(None),
            Err(e) => Err(CommitError::Write(e).into()),
        }
    }

    /// 現在のブランチ名（HEADが切り離されていれば `None`）
    pub fn current_branch(&self) -> SshGitResult<Option<String>> {
        let repo = self.repo()?;
        current_branch(repo).map_err(|e| CommitError::Write(e).into())
    }

    /// 作業コピーの中身を削除してリモートをクローンする
    ///
    /// 失敗した場合は途中までのクローンを削除し、空のリポジトリを初期化し直す。
    pub fn clone_repository(&mut self, transport: &TransportConfig) -> SshGitResult<()> {
        self.repo()?;
        let url = self.remote.as_str().to_string();
        let path = self.path.as_path().to_path_buf();
        let session = transport.session(&self.remote).map_err(CloneError::Transport)?;

        info!(remote = %url, path = %path.display(), "Cloning repository");

        // release the handle before the directory is cleared
        self.repo = None;
        if let Err(source) = clear_directory(&path) {
            self.recover_after_failed_clone();
            return Err(CloneError::ClearDirectory { path, source }.into());
        }

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(session.remote_callbacks());
        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_options);

        match builder.clone(&url, &path) {
            Ok(repo) => {
                self.repo = Some(repo);
                self.origin = RepositoryOrigin::Cloned;
                info!(
                    remote = %url,
                    identities = ?session.offered_identities(),
                    "Cloned repository"
                );
                Ok(())
            }
            Err(e) => {
                let error = match session.take_key_error() {
                    Some(key_error) => CloneError::KeyLoad(key_error),
                    None => CloneError::from_git(&url, e),
                };
                warn!(remote = %url, error = %error, "Clone failed");
                self.recover_after_failed_clone();
                Err(error.into())
            }
        }
    }

    /// 変更をステージしてコミットし、トランスポートがあれば現在のブランチをプッシュする
    pub fn add_commit_push(
        &mut self,
        pathspec: Option<&str>,
        transport: Option<&TransportConfig>,
    ) -> SshGitResult<PushOutcome> {
        let repo = self.repo()?;
        let commit = self.commit_changes(repo, pathspec)?;

        let Some(transport) = transport else {
            info!(commit = %commit, "{}", SkipReason::NoTransport);
            return Ok(PushOutcome::Skipped {
                commit,
                reason: SkipReason::NoTransport,
            });
        };

        let branch = current_branch(repo)
            .map_err(|source| PushError::Failed {
                url: self.remote.as_str().to_string(),
                source,
            })?
            .ok_or(PushError::DetachedHead)?;
        self.push_branch(repo, &branch, transport)?;

        info!(commit = %commit, branch = %branch, remote = %self.remote, "Pushed");
        Ok(PushOutcome::Pushed { commit, branch })
    }

    /// リポジトリのハンドルを解放する。何度呼んでもよい。
    pub fn close(&mut self) {
        if self.repo.take().is_some() {
            debug!(path = %self.path, "Closed repository");
        }
    }

    fn repo(&self) -> SshGitResult<&Repository> {
        match (&self.repo, &self.unrecoverable) {
            (Some(repo), _) => Ok(repo),
            (None, Some(reason)) => Err(SshGitError::unrecoverable(self.path.as_path(), reason)),
            (None, None) => Err(SshGitError::closed(self.path.as_path())),
        }
    }

    fn commit_changes(&self, repo: &Repository, pathspec: Option<&str>) -> Result<Oid, CommitError> {
        let spec = pathspec.unwrap_or("*");
        let stage = |source: git2::Error| CommitError::Stage {
            pathspec: spec.to_string(),
            source,
        };

        let mut index = repo.index().map_err(stage)?;
        index
            .add_all([spec], IndexAddOption::DEFAULT, None)
            .map_err(stage)?;
        // picks up deletions of tracked files
        index.update_all([spec], None).map_err(stage)?;
        index.write().map_err(stage)?;
        let tree_id = index.write_tree().map_err(CommitError::Write)?;

        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit().map_err(CommitError::Write)?),
            Err(e) if is_unborn(&e) => None,
            Err(e) => return Err(CommitError::Write(e)),
        };

        let unchanged = match &parent {
            Some(parent) => parent.tree_id() == tree_id,
            None => index.is_empty(),
        };
        if unchanged {
            return Err(CommitError::NothingToCommit);
        }

        let tree = repo.find_tree(tree_id).map_err(CommitError::Write)?;
        let signature = self.signature(repo)?;
        let message = commit_message(pathspec);
        let parents: Vec<&Commit<'_>> = parent.iter().collect();

        let commit = repo
            .commit(Some("HEAD"), &signature, &signature, &message, &tree, &parents)
            .map_err(CommitError::Write)?;
        debug!(commit = %commit, message = %message, "Created commit");
        Ok(commit)
    }

    fn signature(&self, repo: &Repository) -> Result<Signature<'static>, CommitError> {
        if let Some(author) = &self.options.author {
            return Signature::now(&author.name, &author.email).map_err(CommitError::Signature);
        }

        match repo.signature() {
            Ok(signature) => Ok(signature),
            Err(e) => {
                debug!(error = %e, "No user.name/user.email configured, using fallback author");
                let fallback = CommitAuthor::fallback();
                Signature::now(&fallback.name, &fallback.email).map_err(CommitError::Signature)
            }
        }
    }

    fn push_branch(
        &self,
        repo: &Repository,
        branch: &str,
        transport: &TransportConfig,
    ) -> Result<(), PushError> {
        let url = self.remote.as_str();
        let reference = format!("refs/heads/{}", branch);
        let refspec = format!("{0}:{0}", reference);
        let session = transport.session(&self.remote)?;

        let rejection: RefCell<Option<String>> = RefCell::new(None);
        let mut callbacks = session.remote_callbacks();
        callbacks.push_update_reference(|refname, status| {
            if let Some(message) = status {
                *rejection.borrow_mut() = Some(format!("{}: {}", refname, message));
            }
            Ok(())
        });
        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);

        let mut remote = repo
            .remote_anonymous(url)
            .map_err(|source| PushError::Failed {
                url: url.to_string(),
                source,
            })?;
        debug!(remote = %url, refspec = %refspec, "Pushing");

        if let Err(e) = remote.push(&[refspec.as_str()], Some(&mut options)) {
            return Err(match session.take_key_error() {
                Some(key_error) => PushError::KeyLoad(key_error),
                None => PushError::from_git(url, &reference, e),
            });
        }

        if let Some(message) = rejection.take() {
            return Err(PushError::Rejected { reference, message });
        }
        Ok(())
    }

    /// 途中までのクローンを削除して空のリポジトリを初期化し直す
    ///
    /// どちらかに失敗すると以降の操作はその理由で失敗する。
    fn recover_after_failed_clone(&mut self) {
        let path = self.path.as_path();
        let recovered = clear_directory(path)
            .map_err(|e| format!("failed to remove partial clone: {}", e))
            .and_then(|()| {
                Repository::init(path)
                    .map_err(|e| format!("failed to re-initialize repository: {}", e))
            });

        match recovered {
            Ok(repo) => {
                self.repo = Some(repo);
                self.origin = RepositoryOrigin::Initialized;
                self.unrecoverable = None;
            }
            Err(reason) => {
                warn!(path = %path.display(), reason = %reason, "Working copy left unusable");
                self.unrecoverable = Some(reason);
            }
        }
    }
}

fn current_branch(repo: &Repository) -> Result<Option<String>, git2::Error> {
    match repo.head() {
        Ok(head) if head.is_branch() => Ok(head.shorthand().map(str::to_string)),
        Ok(_) => Ok(None),
        Err(e) if is_unborn(&e) => {
            // unborn HEAD still names a branch
            let head = repo.find_reference("HEAD")?;
            Ok(head
                .symbolic_target()
                .and_then(|target| target.strip_prefix("refs/heads/"))
                .map(str::to_string))
        }
        Err(e) => Err(e),
    }
}

fn is_unborn(error: &git2::Error) -> bool {
    matches!(error.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound)
}

fn commit_message(pathspec: Option<&str>) -> String {
    let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    match pathspec {
        Some(spec) => format!("Automated commit added {} to repository at {}", spec, timestamp),
        None => format!("Automated commit of pending changes at {}", timestamp),
    }
}

fn prepare_directory(path: &Path) -> Result<(), RepositoryInitError> {
    if path.exists() {
        if !path.is_dir() {
            return Err(RepositoryInitError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        return Ok(());
    }

    fs::create_dir_all(path).map_err(|source| RepositoryInitError::CreateDirectory {
        path: path.to_path_buf(),
        source,
    })
}

fn check_writable(path: &Path) -> Result<(), RepositoryInitError> {
    let marker = path.join(WRITE_CHECK_FILE);
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&marker)
        .and_then(|_| fs::remove_file(&marker))
        .map_err(|source| RepositoryInitError::NotWritable {
            path: path.to_path_buf(),
            source,
        })
}

/// ディレクトリ自体は残して中身をすべて削除する
fn clear_directory(path: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
