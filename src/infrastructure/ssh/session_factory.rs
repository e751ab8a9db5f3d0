use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::error::{KeyLoadError, SessionFactoryError};
use super::key_pair::{load_key_pair, KeyPair};
use super::known_hosts::KnownHosts;
use super::ssh_config::{HostSettings, SshConfig};
use crate::domain::value_objects::ssh_options::DEFAULT_SSH_USER;

/// 慣例的な秘密鍵ファイル名（提示順）
pub const CONVENTIONAL_IDENTITY_FILES: [&str; 4] = ["id_rsa", "id_ecdsa", "id_ed25519", "id_dsa"];

const PUBLICKEY: &str = "publickey";

/// SSH層が鍵を要求したときに呼ばれるデフォルト鍵の提供元
#[cfg_attr(test, mockall::automock)]
pub trait DefaultKeysProvider {
    fn load(&self, ssh_dir: &Path) -> Result<Vec<KeyPair>, KeyLoadError>;
}

/// PEMファイルの組から鍵を読み込む提供元
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemKeyFiles {
    pub public_key: PathBuf,
    pub private_key: PathBuf,
}

impl PemKeyFiles {
    pub fn new(public_key: impl Into<PathBuf>, private_key: impl Into<PathBuf>) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: private_key.into(),
        }
    }
}

impl DefaultKeysProvider for PemKeyFiles {
    fn load(&self, _ssh_dir: &Path) -> Result<Vec<KeyPair>, KeyLoadError> {
        let pair = load_key_pair(&self.public_key, &self.private_key)?;
        debug!(fingerprint = %pair.fingerprint(), "Loaded key pair from PEM files");
        Ok(vec![pair])
    }
}

/// 認証時に提示する鍵
#[derive(Debug, Clone)]
pub enum Identity {
    /// メモリ上の鍵
    Memory(KeyPair),
    /// 秘密鍵ファイル（同名の `.pub` があれば併用）
    File {
        private_key: PathBuf,
        public_key: Option<PathBuf>,
    },
}

impl Identity {
    fn from_file(private_key: PathBuf) -> Self {
        let mut public_name = private_key.clone().into_os_string();
        public_name.push(".pub");
        let public_key = PathBuf::from(public_name);
        Self::File {
            public_key: public_key.is_file().then_some(public_key),
            private_key,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Memory(pair) => pair.fingerprint(),
            Self::File { private_key, .. } => private_key.display().to_string(),
        }
    }
}

/// 認証済みSSHセッションに必要なものをまとめた再利用可能な設定
pub struct SessionFactory {
    home_dir: PathBuf,
    ssh_dir: PathBuf,
    user: Option<String>,
    config: SshConfig,
    known_hosts: KnownHosts,
    keys_provider: Option<Box<dyn DefaultKeysProvider>>,
}

impl fmt::Debug for SessionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionFactory")
            .field("home_dir", &self.home_dir)
            .field("ssh_dir", &self.ssh_dir)
            .field("user", &self.user)
            .field("known_hosts", &self.known_hosts.len())
            .field("keys_provider", &self.keys_provider.is_some())
            .finish()
    }
}

impl SessionFactory {
    pub fn builder() -> SessionFactoryBuilder {
        SessionFactoryBuilder::new()
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn ssh_dir(&self) -> &Path {
        &self.ssh_dir
    }

    pub fn known_hosts(&self) -> &KnownHosts {
        &self.known_hosts
    }

    pub fn host_settings(&self, host: &str) -> HostSettings {
        self.config.settings_for(host)
    }

    /// URL → オプション → ホスト設定 → `git` の順でユーザー名を決める
    pub fn user_for(&self, host: Option<&str>, username_from_url: Option<&str>) -> String {
        username_from_url
            .or(self.user.as_deref())
            .map(str::to_string)
            .or_else(|| host.and_then(|h| self.config.settings_for(h).user))
            .unwrap_or_else(|| DEFAULT_SSH_USER.to_string())
    }

    /// ホストに対して提示する鍵の一覧
    ///
    /// 鍵の提供元があればその鍵だけを、なければ `IdentityFile` と慣例的な鍵ファイルを返す。
    pub fn identities(&self, host: Option<&str>) -> Result<Vec<Identity>, KeyLoadError> {
        if let Some(provider) = &self.keys_provider {
            let pairs = provider.load(&self.ssh_dir)?;
            return Ok(pairs.into_iter().map(Identity::Memory).collect());
        }

        let mut files: Vec<PathBuf> = host
            .map(|h| self.config.settings_for(h).identity_files)
            .unwrap_or_default();
        for name in CONVENTIONAL_IDENTITY_FILES {
            let path = self.ssh_dir.join(name);
            if !files.contains(&path) {
                files.push(path);
            }
        }

        Ok(files
            .into_iter()
            .filter(|path| path.is_file())
            .map(Identity::from_file)
            .collect())
    }
}

/// [`SessionFactory`] のビルダー
#[derive(Default)]
pub struct SessionFactoryBuilder {
    preferred_authentications: Option<String>,
    home_dir: Option<PathBuf>,
    ssh_dir: Option<PathBuf>,
    user: Option<String>,
    keys_provider: Option<Box<dyn DefaultKeysProvider>>,
}

impl SessionFactoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// カンマ区切りの認証方式。`publickey` のみ対応。
    pub fn preferred_authentications(mut self, methods: impl Into<String>) -> Self {
        self.preferred_authentications = Some(methods.into());
        self
    }

    pub fn home_directory(mut self, home_dir: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(home_dir.into());
        self
    }

    pub fn ssh_directory(mut self, ssh_dir: impl Into<PathBuf>) -> Self {
        self.ssh_dir = Some(ssh_dir.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn default_keys_provider(mut self, provider: impl DefaultKeysProvider + 'static) -> Self {
        self.keys_provider = Some(Box::new(provider));
        self
    }

    pub fn build(self) -> Result<SessionFactory, SessionFactoryError> {
        if let Some(methods) = &self.preferred_authentications {
            for method in methods.split(',').map(str::trim).filter(|m| !m.is_empty()) {
                if method != PUBLICKEY {
                    return Err(SessionFactoryError::UnsupportedAuthentication {
                        method: method.to_string(),
                    });
                }
            }
        }

        let home_dir = match self.home_dir {
            Some(home_dir) => home_dir,
            None => home_directory().ok_or(SessionFactoryError::HomeDirectoryUnavailable)?,
        };
        let ssh_dir = self.ssh_dir.unwrap_or_else(|| home_dir.join(".ssh"));

        let (config, known_hosts) = if ssh_dir.is_dir() {
            (
                SshConfig::load(&ssh_dir, &home_dir)?,
                KnownHosts::load(&ssh_dir)?,
            )
        } else if self.keys_provider.is_some() {
            (SshConfig::default(), KnownHosts::default())
        } else {
            return Err(SessionFactoryError::SshDirectoryMissing { path: ssh_dir });
        };

        debug!(
            ssh_dir = %ssh_dir.display(),
            keys_provider = self.keys_provider.is_some(),
            known_hosts = known_hosts.len(),
            "Built SSH session factory"
        );

        Ok(SessionFactory {
            home_dir,
            ssh_dir,
            user: self.user,
            config,
            known_hosts,
            keys_provider: self.keys_provider,
        })
    }
}

/// `HOME`、なければ `USERPROFILE`
pub fn home_directory() -> Option<PathBuf> {
    ["HOME", "USERPROFILE"]
        .iter()
        .filter_map(|name| std::env::var_os(name))
        .find(|value| !value.is_empty())
        .map(PathBuf::from)
}
