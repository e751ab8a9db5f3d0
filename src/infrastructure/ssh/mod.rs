//! SSH transport for git2 remote operations.
//!
//! [`SshTransport`] turns a [`CredentialSource`](crate::domain::value_objects::CredentialSource)
//! into a [`SessionFactory`] and hands out [`TransportConfig`]s. Each clone or
//! push opens a [`TransportSession`] whose `RemoteCallbacks` answer libgit2's
//! credential and host-key requests.

pub mod error;
pub mod key_pair;
pub mod known_hosts;
pub mod session_factory;
pub mod ssh_config;
pub mod transient_file;
pub mod transport;

pub use error::{KeyLoadError, SessionFactoryError};
pub use key_pair::{load_key_pair, KeyPair};
pub use known_hosts::{HostKeyStatus, KnownHosts};
pub use session_factory::{
    DefaultKeysProvider, Identity, PemKeyFiles, SessionFactory, SessionFactoryBuilder,
};
pub use ssh_config::{HostSettings, SshConfig, StrictHostKeyChecking};
pub use transient_file::TransientFile;
pub use transport::{SshTransport, StopOutcome, TransportConfig, TransportSession};
