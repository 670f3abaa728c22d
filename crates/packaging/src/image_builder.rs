use crate::context::ContextStager;
use crate::dockerfile::render_dockerfile;
use chrono::{DateTime, Utc};
use gantry_models::{Config, GantryError, LayerPlan, ProcessSpec, ServiceSpec};
use sha2::{Digest, Sha256};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{error, info, instrument};

/// A successfully built service image and the start command baked into
/// it.
#[derive(Debug, Clone)]
pub struct BuiltImage {
    pub image_ref: String,
    pub digest: String,
    pub process: ProcessSpec,
    pub built_at: DateTime<Utc>,
}

pub struct ImageBuilder {
    config: Config,
}

impl ImageBuilder {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Content-addressed image reference: identical inputs rebuild to the
    /// same tag.
    pub fn image_ref(&self, spec: &ServiceSpec, digest: &str) -> String {
        let tag_len = self.config.image.tag_digest_chars.min(digest.len());
        format!(
            "{}/{}:{}",
            self.config.image.repository,
            spec.name,
            &digest[..tag_len]
        )
    }

    /// Tag digest covers the staged files and the rendered Dockerfile, so
    /// the same tree built under two variants gets two tags.
    pub fn image_digest(staged_digest: &str, dockerfile: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(staged_digest.as_bytes());
        hasher.update(dockerfile.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    #[instrument(skip(self, spec), fields(service = %spec.name))]
    pub async fn build(&self, spec: &ServiceSpec) -> Result<BuiltImage, GantryError> {
        // Temporary directory for the build context
        let temp_dir = tempfile::tempdir().map_err(|e| GantryError::InternalError {
            reason: e.to_string(),
        })?;
        let build_context = temp_dir.path();

        let stager = ContextStager::new(self.config.limits.max_context_bytes);
        let staged = stager.stage(spec, build_context)?;

        let process = spec.process_spec(&self.config.server);
        let plan = LayerPlan::for_service(spec, &process, &self.config.image);
        let dockerfile_content = render_dockerfile(&plan);
        let dockerfile_path = build_context.join("Dockerfile");
        std::fs::write(&dockerfile_path, &dockerfile_content).map_err(|e| {
            GantryError::InternalError {
                reason: e.to_string(),
            }
        })?;

        let digest = Self::image_digest(&staged.digest, &dockerfile_content);
        let image_ref = self.image_ref(spec, &digest);

        info!("Building image: {}", image_ref);
        info!("Build context: {:?}", build_context);

        let mut cmd = Command::new("docker");
        if !self.config.docker.host.is_empty() {
            cmd.env("DOCKER_HOST", &self.config.docker.host);
        }
        let build_result = cmd
            .arg("build")
            .arg("-t")
            .arg(&image_ref)
            .arg("-f")
            .arg(&dockerfile_path)
            .arg(build_context)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| GantryError::DockerError {
                message: e.to_string(),
            })?;

        if !build_result.status.success() {
            let stdout = String::from_utf8_lossy(&build_result.stdout);
            let stderr = String::from_utf8_lossy(&build_result.stderr);
            error!("Image build failed - stdout: {}", stdout);
            error!("Image build failed - stderr: {}", stderr);
            return Err(GantryError::BuildFailed {
                stderr: stderr.to_string(),
            });
        }

        info!(
            "Built image: {} ({} files, {} bytes staged)",
            image_ref, staged.file_count, staged.total_size
        );

        Ok(BuiltImage {
            image_ref,
            digest,
            process,
            built_at: Utc::now(),
        })
    }
}
