use gantry_models::{GantryError, ServiceSpec};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::{info, instrument};

/// Check that every build input the spec references exists on disk.
/// Runs before anything touches Docker, so a missing file fails the
/// build deterministically with the offending path.
pub fn validate_inputs(spec: &ServiceSpec) -> Result<(), GantryError> {
    let manifest = spec.manifest_path();
    if !manifest.is_file() {
        return Err(GantryError::ManifestMissing { path: manifest });
    }

    let entrypoint = spec.entrypoint_path();
    if !entrypoint.is_file() {
        return Err(GantryError::EntrypointMissing { path: entrypoint });
    }

    let source = spec.source_path();
    if !source.is_dir() {
        return Err(GantryError::SourceTreeMissing { path: source });
    }

    Ok(())
}

#[derive(Debug, Clone)]
pub struct StagedContext {
    pub digest: String,
    pub total_size: u64,
    pub file_count: usize,
}

/// Copies a service's build inputs into a build context directory and
/// digests them. Files are visited in a fixed order (manifest,
/// entrypoint, then the source tree sorted by name) so identical inputs
/// always produce the same digest, which becomes the image tag.
pub struct ContextStager {
    max_context_bytes: u64,
}

impl ContextStager {
    pub fn new(max_context_bytes: u64) -> Self {
        Self { max_context_bytes }
    }

    #[instrument(skip(self, spec, target), fields(service = %spec.name))]
    pub fn stage(&self, spec: &ServiceSpec, target: &Path) -> Result<StagedContext, GantryError> {
        validate_inputs(spec)?;

        let mut walk = ContextWalk {
            max_context_bytes: self.max_context_bytes,
            hasher: Sha256::new(),
            total_size: 0,
            file_count: 0,
        };

        walk.stage_file(&spec.manifest_path(), target, &spec.manifest)?;
        walk.stage_file(&spec.entrypoint_path(), target, &spec.entrypoint)?;
        walk.stage_tree(&spec.source_path(), target, &spec.source_dir)?;

        let digest = format!("{:x}", walk.hasher.finalize());

        info!(
            "Staged build context: {} files, {} bytes, digest {}",
            walk.file_count, walk.total_size, digest
        );

        Ok(StagedContext {
            digest,
            total_size: walk.total_size,
            file_count: walk.file_count,
        })
    }
}

struct ContextWalk {
    max_context_bytes: u64,
    hasher: Sha256,
    total_size: u64,
    file_count: usize,
}

impl ContextWalk {
    fn stage_file(&mut self, src: &Path, target: &Path, rel: &str) -> Result<(), GantryError> {
        let data = fs::read(src).map_err(|e| GantryError::InternalError {
            reason: format!("{}: {e}", src.display()),
        })?;

        self.total_size += data.len() as u64;
        if self.total_size > self.max_context_bytes {
            return Err(GantryError::ContextTooLarge {
                size: self.total_size,
                max_size: self.max_context_bytes,
            });
        }

        // Path and contents both feed the digest so renames change the tag.
        self.hasher.update(rel.as_bytes());
        self.hasher.update([0u8]);
        self.hasher.update(&data);
        self.file_count += 1;

        let dest = target.join(rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| GantryError::InternalError {
                reason: e.to_string(),
            })?;
        }
        fs::write(&dest, data).map_err(|e| GantryError::InternalError {
            reason: e.to_string(),
        })?;

        Ok(())
    }

    fn stage_tree(&mut self, src: &Path, target: &Path, rel: &str) -> Result<(), GantryError> {
        fs::create_dir_all(target.join(rel)).map_err(|e| GantryError::InternalError {
            reason: e.to_string(),
        })?;

        let mut entries: Vec<_> = fs::read_dir(src)
            .map_err(|e| GantryError::InternalError {
                reason: format!("{}: {e}", src.display()),
            })?
            .collect::<Result<_, _>>()
            .map_err(|e| GantryError::InternalError {
                reason: e.to_string(),
            })?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let child_rel = format!("{rel}/{name}");
            let path = entry.path();
            if path.is_dir() {
                self.stage_tree(&path, target, &child_rel)?;
            } else if path.is_file() {
                self.stage_file(&path, target, &child_rel)?;
            }
        }

        Ok(())
    }
}
