use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use validator::Validate;

use crate::domain::entities::PublishJob;

/// Configuration store related errors
#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("Configuration file not found at path: {0}")]
    ConfigFileNotFound(String),

    #[error("Configuration file read failed: {0}")]
    ReadFailed(String),

    #[error("Configuration file write failed: {0}")]
    WriteFailed(String),

    #[error("YAML parsing failed: {0}")]
    YamlParsingFailed(String),

    #[error("YAML serialization failed: {0}")]
    YamlSerializationFailed(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Configuration directory creation failed: {0}")]
    DirectoryCreationFailed(String),
}

/// Schema validation configuration
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Whether to validate the job on read
    pub validate_on_read: bool,

    /// Whether to validate the job before write
    pub validate_before_write: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            validate_on_read: true,
            validate_before_write: true,
        }
    }
}

/// Store for YAML job files
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    validation_config: ValidationConfig,
}

impl ConfigStore {
    /// Create a new configuration store with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new configuration store with custom validation settings
    pub fn with_validation(validation_config: ValidationConfig) -> Self {
        Self { validation_config }
    }

    /// Read a publish job from a YAML file
    pub fn read_job<P: AsRef<Path>>(&self, job_path: P) -> Result<PublishJob, ConfigStoreError> {
        let job_path = job_path.as_ref();

        if !job_path.exists() {
            return Err(ConfigStoreError::ConfigFileNotFound(
                job_path.display().to_string(),
            ));
        }

        let contents = fs::read_to_string(job_path)
            .map_err(|e| ConfigStoreError::ReadFailed(e.to_string()))?;

        let job: PublishJob = serde_yaml::from_str(&contents)
            .map_err(|e| ConfigStoreError::YamlParsingFailed(e.to_string()))?;

        if self.validation_config.validate_on_read {
            validate_job(&job)?;
        }

        debug!(
            path = %job_path.display(),
            remote = %job.remote,
            action = %job.action,
            credential = job.credential.kind_name(),
            "Read publish job"
        );
        Ok(job)
    }

    /// Write a publish job to a YAML file
    pub fn write_job<P: AsRef<Path>>(
        &self,
        job_path: P,
        job: &PublishJob,
    ) -> Result<(), ConfigStoreError> {
        let job_path = job_path.as_ref();

        if self.validation_config.validate_before_write {
            validate_job(job)?;
        }

        if let Some(parent) = job_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigStoreError::DirectoryCreationFailed(e.to_string()))?;
        }

        let yaml_content = serde_yaml::to_string(job)
            .map_err(|e| ConfigStoreError::YamlSerializationFailed(e.to_string()))?;

        fs::write(job_path, yaml_content)
            .map_err(|e| ConfigStoreError::WriteFailed(e.to_string()))?;

        Ok(())
    }
}

fn validate_job(job: &PublishJob) -> Result<(), ConfigStoreError> {
    job.validate()
        .map_err(|e| ConfigStoreError::ValidationFailed(e.to_string()))
}
