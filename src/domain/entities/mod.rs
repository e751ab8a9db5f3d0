pub mod publish_job;

pub use publish_job::{PublishAction, PublishJob};
