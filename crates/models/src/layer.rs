use crate::{ImageConfig, ProcessSpec, ServiceSpec};
use serde::{Deserialize, Serialize};

/// Working directory every image roots its application tree at.
pub const WORKDIR: &str = "/app";

/// One image build step. A plan is an ordered sequence of these;
/// rendering emits them in construction order and never reorders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LayerOp {
    From { image: String },
    Workdir { path: String },
    CopyManifest { manifest: String },
    InstallDeps { manifest: String },
    CopyEntrypoint { entrypoint: String },
    CopySource { dir: String },
    Env { key: String, value: String },
    Expose { port: u16 },
    Cmd { argv: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerPlan {
    ops: Vec<LayerOp>,
}

impl LayerPlan {
    /// Fixed layer order for a service image. The manifest is copied and
    /// installed before the entrypoint and source tree land, so source
    /// edits reuse the cached dependency layer.
    pub fn for_service(spec: &ServiceSpec, process: &ProcessSpec, image: &ImageConfig) -> Self {
        let mut ops = vec![
            LayerOp::From {
                image: image.base_image.clone(),
            },
            LayerOp::Workdir {
                path: WORKDIR.to_string(),
            },
            LayerOp::CopyManifest {
                manifest: spec.manifest.clone(),
            },
            LayerOp::InstallDeps {
                manifest: spec.manifest.clone(),
            },
            LayerOp::CopyEntrypoint {
                entrypoint: spec.entrypoint.clone(),
            },
            LayerOp::CopySource {
                dir: spec.source_dir.clone(),
            },
        ];

        if spec.variant.unbuffered_io() {
            ops.push(LayerOp::Env {
                key: "PYTHONUNBUFFERED".to_string(),
                value: "1".to_string(),
            });
        }

        if let Some(port) = process.listen_port() {
            ops.push(LayerOp::Expose { port });
        }

        ops.push(LayerOp::Cmd {
            argv: process.argv(),
        });

        Self { ops }
    }

    pub fn ops(&self) -> &[LayerOp] {
        &self.ops
    }

    /// True when dependency installation comes before the source copy.
    /// Holds by construction; tests assert it stays that way.
    pub fn install_precedes_source(&self) -> bool {
        let install = self
            .ops
            .iter()
            .position(|op| matches!(op, LayerOp::InstallDeps { .. }));
        let source = self
            .ops
            .iter()
            .position(|op| matches!(op, LayerOp::CopySource { .. }));
        match (install, source) {
            (Some(i), Some(s)) => i < s,
            _ => false,
        }
    }
}
