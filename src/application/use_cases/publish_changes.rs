use std::path::{Path, PathBuf};
use tracing::{info, warn};
use validator::Validate;

use crate::common::error::SshGitError;
use crate::common::result::{ResultExt, SshGitResult};
use crate::domain::entities::PublishJob;
use crate::infrastructure::filesystem::ConfigStore;
use crate::infrastructure::git::{CommitOptions, PushOutcome, RepositoryManager, RepositoryOrigin};
use crate::infrastructure::ssh::{SshTransport, StopOutcome};

/// ジョブ実行の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// 作業コピーの絶対パス
    pub local_path: PathBuf,

    /// 最終的な作業コピーの由来（クローンした場合は `Cloned`）
    pub origin: RepositoryOrigin,

    /// コミット・プッシュの結果（クローンのみの場合は `None`）
    pub outcome: Option<PushOutcome>,

    /// トランスポートの停止結果
    pub stop: StopOutcome,
}

struct RunSummary {
    local_path: PathBuf,
    origin: RepositoryOrigin,
    outcome: Option<PushOutcome>,
}

/// クローン／コミット・プッシュを一回実行するユースケース
///
/// 成功・失敗にかかわらず一時ファイルを削除し、トランスポートを停止する。
/// 操作のエラーは後始末のエラーより優先して返す。
pub struct PublishChangesUseCase {
    job: PublishJob,
}

impl PublishChangesUseCase {
    pub fn new(job: PublishJob) -> Self {
        Self { job }
    }

    /// YAMLのジョブファイルから作成
    pub fn from_job_file(path: impl AsRef<Path>) -> SshGitResult<Self> {
        let path = path.as_ref();
        let job = ConfigStore::new().read_job(path).map_sshgit_err(|e| {
            SshGitError::config_error_with_source(
                "Failed to load publish job",
                Some(path.to_path_buf()),
                e,
            )
        })?;
        Ok(Self::new(job))
    }

    pub fn job(&self) -> &PublishJob {
        &self.job
    }

    pub fn execute(&self) -> SshGitResult<PublishReport> {
        self.job.validate().with_config_context("Invalid publish job")?;

        info!(
            remote = %self.job.remote,
            path = %self.job.local_path.display(),
            action = %self.job.action,
            credential = self.job.credential.kind_name(),
            "Executing publish job"
        );

        let mut transport =
            SshTransport::with_options(self.job.credential.clone(), self.job.ssh.clone())?;

        let result = self.run(&transport);
        let cleanup = Self::cleanup(&mut transport);

        match (result, cleanup) {
            (Ok(summary), Ok(stop)) => Ok(PublishReport {
                local_path: summary.local_path,
                origin: summary.origin,
                outcome: summary.outcome,
                stop,
            }),
            (Err(error), Ok(_)) => Err(error),
            (Err(error), Err(cleanup_error)) => {
                warn!(
                    error = %cleanup_error,
                    key_material_left = cleanup_error.leaves_key_material(),
                    "Cleanup failed after publish error"
                );
                Err(error)
            }
            (Ok(_), Err(cleanup_error)) => Err(cleanup_error),
        }
    }

    fn run(&self, transport: &SshTransport) -> SshGitResult<RunSummary> {
        let config = transport.transport_config()?;
        let options = CommitOptions {
            author: self.job.author.clone(),
        };
        let mut manager =
            RepositoryManager::with_options(self.job.remote.as_str(), &self.job.local_path, options)?;

        if self.job.action.clones() {
            manager.clone_repository(&config)?;
        }

        let outcome = if self.job.action.commits() {
            Some(manager.add_commit_push(self.job.pathspec.as_deref(), Some(&config))?)
        } else {
            None
        };

        let summary = RunSummary {
            local_path: manager.path().to_path_buf(),
            origin: manager.origin(),
            outcome,
        };
        manager.close();
        Ok(summary)
    }

    /// 一時ファイルを両方とも削除してから停止する（最初のエラーを返す）
    fn cleanup(transport: &mut SshTransport) -> SshGitResult<StopOutcome> {
        let key = transport.delete_transient_key_file();
        let config = transport.delete_transient_config_file();
        let stop = transport.stop();
        key?;
        config?;
        Ok(stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::PublishAction;
    use crate::domain::value_objects::{CommitAuthor, CredentialSource, RemoteUrl, SshOptions};
    use crate::infrastructure::git::CommitError;
    use tempfile::TempDir;

    fn job(remote: &str, local: &Path, ssh_home: &Path) -> PublishJob {
        std::fs::create_dir_all(ssh_home.join(".ssh")).unwrap();
        PublishJob::new(
            RemoteUrl::parse(remote).unwrap(),
            local,
            CredentialSource::DefaultDirectory,
        )
        .with_author(CommitAuthor::new("Bot", "bot@example.com"))
        .with_ssh_options(SshOptions::default().with_home_dir(ssh_home))
    }

    #[test]
    fn test_commit_push_to_local_bare_remote() {
        let temp = TempDir::new().unwrap();
        let remote = temp.path().join("remote.git");
        git2::Repository::init_bare(&remote).unwrap();
        let local = temp.path().join("local");
        std::fs::create_dir(&local).unwrap();
        std::fs::write(local.join("notes.txt"), "hello").unwrap();

        let use_case = PublishChangesUseCase::new(
            job(remote.to_str().unwrap(), &local, temp.path()).with_pathspec("notes.txt"),
        );
        let report = use_case.execute().unwrap();

        assert_eq!(report.origin, RepositoryOrigin::Initialized);
        assert_eq!(report.stop, StopOutcome::Stopped);
        let outcome = report.outcome.unwrap();
        assert!(outcome.is_pushed());

        let bare = git2::Repository::open_bare(&remote).unwrap();
        let PushOutcome::Pushed { commit, branch } = outcome else {
            panic!("expected push");
        };
        let pushed = bare
            .find_reference(&format!("refs/heads/{}", branch))
            .unwrap()
            .target()
            .unwrap();
        assert_eq!(pushed, commit);
    }

    #[test]
    fn test_operation_error_wins_and_transient_files_removed() {
        let temp = TempDir::new().unwrap();
        let remote = temp.path().join("remote.git");
        git2::Repository::init_bare(&remote).unwrap();
        let local = temp.path().join("local");
        let ssh_dir = temp.path().join("ssh");

        let job = PublishJob::new(
            RemoteUrl::parse(remote.to_str().unwrap()).unwrap(),
            &local,
            CredentialSource::inline_key_text(Some(ssh_dir.clone()), "not a real key"),
        )
        .with_action(PublishAction::CommitPush)
        .with_ssh_options(SshOptions::default().with_home_dir(temp.path()));

        let result = PublishChangesUseCase::new(job).execute();
        assert!(matches!(
            result,
            Err(SshGitError::Commit(CommitError::NothingToCommit))
        ));
        assert!(!ssh_dir.join("id_rsa").exists());
        assert!(!ssh_dir.join("config").exists());
    }

    #[test]
    fn test_invalid_job_is_rejected_before_any_side_effect() {
        let temp = TempDir::new().unwrap();
        let local = temp.path().join("local");
        let job = job("git@example.com:acme/widgets.git", &local, temp.path()).with_pathspec("");

        let result = PublishChangesUseCase::new(job).execute();
        assert!(matches!(result, Err(SshGitError::ConfigError { .. })));
        assert!(!local.exists());
    }

    #[test]
    fn test_from_missing_job_file() {
        let temp = TempDir::new().unwrap();
        let result = PublishChangesUseCase::from_job_file(temp.path().join("missing.yml"));
        assert!(matches!(result, Err(SshGitError::ConfigError { .. })));
    }
}
