//! # sshgit - Git over SSH with pluggable credentials
//!
//! `sshgit` clones or opens a local working copy, stages and commits changes,
//! and pushes them to a remote over SSH. Git operations go through libgit2
//! (`git2`); the SSH handshake is performed by libgit2's libssh2 transport, to
//! which this crate supplies identities and a host-key policy.
//!
//! ## Credential sources
//!
//! - **Default directory**: `~/.ssh`, public-key authentication only
//! - **Explicit directory**: any directory holding conventionally named keys
//! - **Inline key text**: a private key written to a transient `id_rsa` plus a
//!   host config disabling host-key checking; both files are removed when the
//!   transport is dropped
//! - **Key file pair**: PEM-armored PKCS#8 private / X.509 public RSA keys,
//!   parsed when the SSH layer asks for identities
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sshgit::domain::value_objects::CredentialSource;
//! use sshgit::infrastructure::git::RepositoryManager;
//! use sshgit::infrastructure::ssh::SshTransport;
//!
//! # fn example() -> sshgit::Result<()> {
//! let mut transport = SshTransport::new(CredentialSource::DefaultDirectory)?;
//! let config = transport.transport_config()?;
//!
//! let mut manager = RepositoryManager::new("git@github.com:acme/widgets.git", "/tmp/widgets")?;
//! manager.clone_repository(&config)?;
//!
//! std::fs::write("/tmp/widgets/notes.txt", "hello")?;
//! let outcome = manager.add_commit_push(Some("notes.txt"), Some(&config))?;
//! println!("pushed {}", outcome.commit());
//!
//! manager.close();
//! transport.stop();
//! # Ok(())
//! # }
//! ```
//!
//! ## Job files
//!
//! [`application::use_cases::publish_changes::PublishChangesUseCase`] runs a
//! whole clone / commit / push sequence described by a YAML
//! [`domain::entities::PublishJob`] and always cleans up the transport:
//!
//! ```yaml
//! remote: git@github.com:acme/widgets.git
//! local_path: /tmp/widgets
//! action: clone_then_commit_push
//! pathspec: notes.txt
//! credential:
//!   kind: key_file_pair
//!   public_key: /etc/deploy/id_rsa.pub.pem
//!   private_key: /etc/deploy/id_rsa.pem
//! ```
//!
//! ## Architecture
//!
//! - [`domain`]: Value objects and entities
//! - [`application`]: Use cases
//! - [`infrastructure`]: libgit2, SSH and file system adapters
//! - [`common`]: Shared error handling
//!
//! ## Error Handling
//!
//! - [`common::error::SshGitError`]: Main error type wrapping the per-operation errors
//! - [`common::result::SshGitResult`]: Type alias for `Result<T, SshGitError>`
//!
//! The library emits `tracing` events and leaves subscriber setup to the caller.

// Documentation attributes
#![deny(rustdoc::broken_intra_doc_links)]

pub mod application;
pub mod common;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use crate::common::error::SshGitError;
pub use crate::common::result::SshGitResult as Result;
