/// Infrastructure layer modules
///
/// This layer provides concrete implementations for external system interactions:
/// - Git operations through libgit2 (open/init, clone, commit, push)
/// - SSH transport and credential handling for libgit2's libssh2 backend
/// - File system operations (job files)
pub mod filesystem;
pub mod git;
pub mod ssh;

// Re-export commonly used types
pub use filesystem::ConfigStore;
pub use git::{PushOutcome, RepositoryManager, RepositoryOrigin};
pub use ssh::{SshTransport, StopOutcome, TransportConfig};
