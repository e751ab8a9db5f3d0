use git2::{
    CertificateCheckStatus, Cred, CredentialType, Error as GitError, ErrorClass, ErrorCode,
    RemoteCallbacks,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::{Rc, Weak};
use tracing::{debug, info, warn};

use super::error::{KeyLoadError, SessionFactoryError};
use super::known_hosts::HostKeyStatus;
use super::session_factory::{
    home_directory, Identity, PemKeyFiles, SessionFactory, SessionFactoryBuilder,
};
use super::ssh_config::{SshConfig, StrictHostKeyChecking};
use super::transient_file::TransientFile;
use crate::common::result::SshGitResult;
use crate::domain::value_objects::{CredentialSource, RemoteUrl, SshOptions};

/// 一時鍵ファイルの名前
pub const TRANSIENT_KEY_FILE_NAME: &str = "id_rsa";

/// 停止結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// 稼働中だったものを停止した
    Stopped,
    /// 開始されていない（停止済み）
    NotStarted,
}

/// 認証情報の取得元からSSHトランスポートを構築・管理する
#[derive(Debug)]
pub struct SshTransport {
    source_kind: &'static str,
    factory: Option<Rc<SessionFactory>>,
    key_file: Option<TransientFile>,
    config_file: Option<TransientFile>,
}

impl SshTransport {
    pub fn new(source: CredentialSource) -> Result<Self, SessionFactoryError> {
        Self::with_options(source, SshOptions::default())
    }

    pub fn with_options(
        source: CredentialSource,
        options: SshOptions,
    ) -> Result<Self, SessionFactoryError> {
        let source_kind = source.kind_name();
        info!(source = source_kind, "Starting SSH transport");

        let home_dir = match &options.home_dir {
            Some(home_dir) => home_dir.clone(),
            None => home_directory().ok_or(SessionFactoryError::HomeDirectoryUnavailable)?,
        };

        let mut builder = SessionFactoryBuilder::new()
            .preferred_authentications(options.preferred_authentications.as_str())
            .home_directory(&home_dir);
        if let Some(user) = &options.user {
            builder = builder.user(user.as_str());
        }

        let mut key_file = None;
        let mut config_file = None;

        let builder = match source {
            CredentialSource::DefaultDirectory => builder,
            CredentialSource::ExplicitDirectory { ssh_dir } => builder.ssh_directory(ssh_dir),
            CredentialSource::InlineKeyText { ssh_dir, key_text } => {
                let ssh_dir = ssh_dir.unwrap_or_else(|| home_dir.join(".ssh"));
                let (key, config) =
                    write_transient_files(&ssh_dir, &options.config_host, &key_text)?;
                key_file = Some(key);
                config_file = Some(config);
                builder.ssh_directory(ssh_dir)
            }
            CredentialSource::KeyFilePair {
                public_key,
                private_key,
            } => builder.default_keys_provider(PemKeyFiles::new(public_key, private_key)),
        };

        // transient files are dropped (and removed) if the build fails
        let factory = builder.build()?;

        Ok(Self {
            source_kind,
            factory: Some(Rc::new(factory)),
            key_file,
            config_file,
        })
    }

    pub fn is_started(&self) -> bool {
        self.factory.is_some()
    }

    pub fn ssh_dir(&self) -> Option<&Path> {
        self.factory.as_deref().map(SessionFactory::ssh_dir)
    }

    /// リモート操作に渡す設定
    pub fn transport_config(&self) -> Result<TransportConfig, SessionFactoryError> {
        let factory = self.factory.as_ref().ok_or(SessionFactoryError::Stopped)?;
        Ok(TransportConfig {
            factory: Rc::downgrade(factory),
        })
    }

    /// 停止する。二回目以降は `NotStarted`。
    pub fn stop(&mut self) -> StopOutcome {
        match self.factory.take() {
            Some(_) => {
                info!(source = self.source_kind, "Stopped SSH transport");
                StopOutcome::Stopped
            }
            None => {
                debug!(source = self.source_kind, "SSH transport was not started");
                StopOutcome::NotStarted
            }
        }
    }

    pub fn transient_key_path(&self) -> Option<&Path> {
        self.key_file.as_ref().map(TransientFile::path)
    }

    pub fn transient_config_path(&self) -> Option<&Path> {
        self.config_file.as_ref().map(TransientFile::path)
    }

    pub fn delete_transient_key_file(&mut self) -> SshGitResult<()> {
        match self.key_file.as_mut() {
            Some(file) => file.delete(),
            None => Ok(()),
        }
    }

    pub fn delete_transient_config_file(&mut self) -> SshGitResult<()> {
        match self.config_file.as_mut() {
            Some(file) => file.delete(),
            None => Ok(()),
        }
    }
}

/// 一時鍵ファイルとホスト設定ファイルを書き出す
fn write_transient_files(
    ssh_dir: &Path,
    config_host: &str,
    key_text: &str,
) -> Result<(TransientFile, TransientFile), SessionFactoryError> {
    std::fs::create_dir_all(ssh_dir).map_err(|source| {
        SessionFactoryError::WriteTransientFile {
            path: ssh_dir.to_path_buf(),
            source,
        }
    })?;

    let key = TransientFile::create(ssh_dir.join(TRANSIENT_KEY_FILE_NAME), key_text.as_bytes())?;
    let config = TransientFile::create(
        ssh_dir.join(SshConfig::FILE_NAME),
        transient_config_contents(config_host).as_bytes(),
    )?;
    Ok((key, config))
}

/// ホスト鍵検証とエージェント登録を無効にするホスト設定
pub fn transient_config_contents(host: &str) -> String {
    format!(
        "Host {}\n  AddKeysToAgent no\n  StrictHostKeyChecking no",
        host
    )
}

/// クローン／プッシュに渡すトランスポート設定
///
/// プロバイダが停止すると無効になる。
#[derive(Debug, Clone)]
pub struct TransportConfig {
    factory: Weak<SessionFactory>,
}

impl TransportConfig {
    pub fn is_live(&self) -> bool {
        self.factory.strong_count() > 0
    }

    /// 一回のリモート操作用のセッションを開始する
    pub fn session(&self, remote: &RemoteUrl) -> Result<TransportSession, SessionFactoryError> {
        let factory = self.factory.upgrade().ok_or(SessionFactoryError::Stopped)?;
        Ok(TransportSession {
            state: Rc::new(SessionState {
                factory,
                host: remote.host().map(str::to_string),
                port: remote.port(),
                identities: RefCell::new(None),
                offered: RefCell::new(Vec::new()),
                key_error: RefCell::new(None),
            }),
        })
    }
}

struct SessionState {
    factory: Rc<SessionFactory>,
    host: Option<String>,
    port: Option<u16>,
    identities: RefCell<Option<VecDeque<Identity>>>,
    offered: RefCell<Vec<String>>,
    key_error: RefCell<Option<KeyLoadError>>,
}

/// 一回のリモート操作の認証状態
///
/// 各鍵は一度だけ提示され、尽きた時点で認証エラーになる。
pub struct TransportSession {
    state: Rc<SessionState>,
}

impl TransportSession {
    pub fn remote_callbacks<'cb>(&self) -> RemoteCallbacks<'cb> {
        let mut callbacks = RemoteCallbacks::new();

        let state = Rc::clone(&self.state);
        callbacks.credentials(move |url, username_from_url, allowed_types| {
            state.credentials(url, username_from_url, allowed_types)
        });

        let state = Rc::clone(&self.state);
        callbacks.certificate_check(move |cert, host| state.certificate_check(cert, host));

        callbacks
    }

    /// 鍵の読み込みに失敗していればそのエラー
    pub fn take_key_error(&self) -> Option<KeyLoadError> {
        self.state.key_error.borrow_mut().take()
    }

    /// 提示した鍵（提示順）
    pub fn offered_identities(&self) -> Vec<String> {
        self.state.offered.borrow().clone()
    }
}

impl SessionState {
    fn credentials(
        &self,
        url: &str,
        username_from_url: Option<&str>,
        allowed_types: CredentialType,
    ) -> Result<Cred, GitError> {
        let user = self
            .factory
            .user_for(self.host.as_deref(), username_from_url);

        if allowed_types.contains(CredentialType::USERNAME) {
            debug!(url, user = %user, "Supplying SSH username");
            return Cred::username(&user);
        }

        if !allowed_types.contains(CredentialType::SSH_KEY) {
            return Err(auth_error(&format!(
                "unsupported credential type requested for {}",
                url
            )));
        }

        let identity = self.next_identity()?;
        let description = identity.describe();
        debug!(url, user = %user, identity = %description, "Offering SSH identity");
        self.offered.borrow_mut().push(description);

        match identity {
            Identity::Memory(pair) => {
                Cred::ssh_key_from_memory(&user, None, pair.private_key_pem(), None)
            }
            Identity::File {
                private_key,
                public_key,
            } => Cred::ssh_key(&user, public_key.as_deref(), &private_key, None),
        }
    }

    fn next_identity(&self) -> Result<Identity, GitError> {
        let mut identities = self.identities.borrow_mut();
        if identities.is_none() {
            match self.factory.identities(self.host.as_deref()) {
                Ok(loaded) => *identities = Some(loaded.into()),
                Err(e) => {
                    let message = e.to_string();
                    *self.key_error.borrow_mut() = Some(e);
                    *identities = Some(VecDeque::new());
                    return Err(auth_error(&message));
                }
            }
        }

        identities
            .as_mut()
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| auth_error("no more SSH identities to offer"))
    }

    fn certificate_check(
        &self,
        cert: &git2::cert::Cert<'_>,
        host: &str,
    ) -> Result<CertificateCheckStatus, GitError> {
        match cert.as_hostkey() {
            Some(hostkey) => self.host_key_decision(host, hostkey.hostkey()),
            None => Ok(CertificateCheckStatus::CertificatePassthrough),
        }
    }

    /// SSH設定とknown_hostsからホスト鍵の扱いを決める
    ///
    /// `key` はSSHワイヤ形式のホスト鍵。libgit2が鍵を渡さない場合は `None`。
    fn host_key_decision(
        &self,
        host: &str,
        key: Option<&[u8]>,
    ) -> Result<CertificateCheckStatus, GitError> {
        let settings = self.factory.host_settings(host);
        if settings.strict_host_key_checking == Some(StrictHostKeyChecking::No) {
            debug!(host, "Host key checking disabled by SSH config");
            return Ok(CertificateCheckStatus::CertificateOk);
        }

        let Some(key) = key else {
            return Ok(CertificateCheckStatus::CertificatePassthrough);
        };

        match self.factory.known_hosts().check(host, self.port, key) {
            HostKeyStatus::Match => {
                debug!(host, "Host key found in known_hosts");
                Ok(CertificateCheckStatus::CertificateOk)
            }
            HostKeyStatus::Mismatch => {
                warn!(host, "Host key does not match known_hosts");
                Err(GitError::new(
                    ErrorCode::Certificate,
                    ErrorClass::Ssh,
                    format!("host key for {} does not match known_hosts", host),
                ))
            }
            HostKeyStatus::NotFound
                if settings.strict_host_key_checking == Some(StrictHostKeyChecking::AcceptNew) =>
            {
                debug!(host, "Accepting new host key");
                Ok(CertificateCheckStatus::CertificateOk)
            }
            HostKeyStatus::NotFound => Ok(CertificateCheckStatus::CertificatePassthrough),
        }
    }
}

fn auth_error(message: &str) -> GitError {
    GitError::new(ErrorCode::Auth, ErrorClass::Ssh, message)
}
