use tokio::process::Command;

/// Check if Docker is running and accessible
pub async fn docker_available() -> bool {
    match Command::new("docker")
        .args(["version", "--format", "{{.Server.Version}}"])
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}
