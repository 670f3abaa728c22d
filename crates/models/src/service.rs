use crate::{GantryError, ProcessSpec, ServerConfig, Variant};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Build-time description of one deployable service: where its files
/// live and how its container process is started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSpec {
    pub name: String,
    pub root: PathBuf,
    pub variant: Variant,
    pub manifest: String,
    pub entrypoint: String,
    pub source_dir: String,
    pub app_ref: String,
    pub environment: HashMap<String, String>,
}

impl ServiceSpec {
    pub fn new(
        name: impl Into<String>,
        root: impl Into<PathBuf>,
        variant: Variant,
    ) -> Result<Self, GantryError> {
        let name = name.into();
        if !is_valid_service_name(&name) {
            return Err(GantryError::InvalidServiceName { name });
        }
        Ok(Self {
            name,
            root: root.into(),
            variant,
            manifest: "requirements.txt".to_string(),
            entrypoint: "app.py".to_string(),
            source_dir: "src".to_string(),
            app_ref: "app:app".to_string(),
            environment: HashMap::new(),
        })
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(&self.manifest)
    }

    pub fn entrypoint_path(&self) -> PathBuf {
        self.root.join(&self.entrypoint)
    }

    pub fn source_path(&self) -> PathBuf {
        self.root.join(&self.source_dir)
    }

    /// Start command for this service under the configured server
    /// defaults. Host and port come from config; the access-log flag and
    /// log level follow the variant.
    pub fn process_spec(&self, server: &ServerConfig) -> ProcessSpec {
        match self.variant {
            Variant::Script => ProcessSpec::Script {
                interpreter: "python".to_string(),
                entrypoint: self.entrypoint.clone(),
            },
            Variant::Server | Variant::ServerVerbose => ProcessSpec::AsgiServer {
                app_ref: self.app_ref.clone(),
                host: server.host.clone(),
                port: server.port,
                log_level: Some(server.log_level),
                access_log: self.variant.access_log(),
            },
        }
    }
}

/// Service names end up in image references and container names, so the
/// accepted alphabet is the intersection of both.
pub fn is_valid_service_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric())
}

/// Derive a service name from its application directory.
pub fn service_name_from_root(root: &Path) -> Option<String> {
    root.canonicalize()
        .ok()?
        .file_name()?
        .to_str()
        .map(|s| s.to_string())
        .filter(|s| is_valid_service_name(s))
}
