pub mod commit_author;
pub mod credential_source;
pub mod remote_url;
pub mod ssh_options;
pub mod working_copy_path;

pub use commit_author::CommitAuthor;
pub use credential_source::CredentialSource;
pub use remote_url::{RemoteKind, RemoteUrl, RemoteUrlError};
pub use ssh_options::SshOptions;
pub use working_copy_path::{WorkingCopyPath, WorkingCopyPathError};
