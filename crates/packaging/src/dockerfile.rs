use gantry_models::{LayerOp, LayerPlan};

/// Render a layer plan into Dockerfile text, one instruction per op, in
/// plan order.
pub fn render_dockerfile(plan: &LayerPlan) -> String {
    let mut out = String::new();
    for op in plan.ops() {
        let line = match op {
            LayerOp::From { image } => format!("FROM {image}"),
            LayerOp::Workdir { path } => format!("WORKDIR {path}"),
            LayerOp::CopyManifest { manifest } => format!("COPY {manifest} ./{manifest}"),
            LayerOp::InstallDeps { manifest } => {
                format!("RUN pip install --no-cache-dir -r {manifest}")
            }
            LayerOp::CopyEntrypoint { entrypoint } => format!("COPY {entrypoint} ./{entrypoint}"),
            LayerOp::CopySource { dir } => format!("COPY {dir} ./{dir}"),
            LayerOp::Env { key, value } => format!("ENV {key}={value}"),
            LayerOp::Expose { port } => format!("EXPOSE {port}"),
            LayerOp::Cmd { argv } => format!("CMD {}", exec_form(argv)),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// JSON-array (exec) form, so the process runs without a shell wrapper
/// and receives signals directly.
fn exec_form(argv: &[String]) -> String {
    let quoted: Vec<String> = argv
        .iter()
        .map(|arg| format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("[{}]", quoted.join(", "))
}
