pub mod error;
pub mod repository_manager;

// Re-export main types for convenience
pub use error::{CloneError, CommitError, PushError, RepositoryInitError};
pub use repository_manager::{
    CommitOptions, PushOutcome, RepositoryManager, RepositoryOrigin, SkipReason,
};
