use std::path::PathBuf;
use thiserror::Error;

/// Where in the image lifecycle a failure surfaced. Build failures abort
/// before an image exists; runtime failures carry the container's exit
/// status instead of being retried here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePhase {
    Build,
    Runtime,
    Config,
}

#[derive(Error, Debug)]
pub enum GantryError {
    #[error("Dependency manifest not found: {path}")]
    ManifestMissing { path: PathBuf },

    #[error("Entrypoint not found: {path}")]
    EntrypointMissing { path: PathBuf },

    #[error("Source tree not found: {path}")]
    SourceTreeMissing { path: PathBuf },

    #[error("Build context too large: {size} bytes (max: {max_size})")]
    ContextTooLarge { size: u64, max_size: u64 },

    #[error("Image build failed: {stderr}")]
    BuildFailed { stderr: String },

    #[error("Invalid service name: {name}")]
    InvalidServiceName { name: String },

    #[error("Docker error: {message}")]
    DockerError { message: String },

    #[error("Container wait timed out after {timeout_ms}ms")]
    ContainerTimeout { timeout_ms: u64 },

    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },

    #[error("Internal error: {reason}")]
    InternalError { reason: String },
}

impl GantryError {
    pub fn phase(&self) -> FailurePhase {
        match self {
            GantryError::ManifestMissing { .. } => FailurePhase::Build,
            GantryError::EntrypointMissing { .. } => FailurePhase::Build,
            GantryError::SourceTreeMissing { .. } => FailurePhase::Build,
            GantryError::ContextTooLarge { .. } => FailurePhase::Build,
            GantryError::BuildFailed { .. } => FailurePhase::Build,
            GantryError::InvalidServiceName { .. } => FailurePhase::Config,
            GantryError::DockerError { .. } => FailurePhase::Runtime,
            GantryError::ContainerTimeout { .. } => FailurePhase::Runtime,
            GantryError::ConfigError { .. } => FailurePhase::Config,
            GantryError::InternalError { .. } => FailurePhase::Runtime,
        }
    }
}
