pub mod publish_changes;

pub use publish_changes::{PublishChangesUseCase, PublishReport};
