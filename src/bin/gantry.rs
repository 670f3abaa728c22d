use anyhow::Result;
use clap::{Parser, Subcommand};
use gantry_invoker::{RunSpec, Runner};
use gantry_models::{service_name_from_root, Config, ServiceSpec, Variant};
use gantry_packaging::ImageBuilder;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "gantry")]
#[command(about = "Build and launch containerized Python web services")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: gantry.toml, then configs/default.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a service image
    Build {
        /// Application directory
        path: PathBuf,
        /// Service name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,
        /// Launch variant (script, server, server-verbose)
        #[arg(long, default_value = "server")]
        variant: Variant,
    },
    /// Build a service image and start its container
    Run {
        /// Application directory
        path: PathBuf,
        /// Service name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,
        /// Launch variant (script, server, server-verbose)
        #[arg(long, default_value = "server")]
        variant: Variant,
        /// Extra environment variables (KEY=VALUE, repeatable)
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,
        /// Wait for the container to exit and propagate its exit code
        #[arg(long)]
        wait: bool,
    },
    /// Stop a running container
    Stop {
        container: String,
    },
    /// Remove a container
    Rm {
        container: String,
    },
    /// Print a container's logs
    Logs {
        container: String,
    },
    /// List service images
    Images,
    /// Remove a service image
    Rmi {
        image: String,
        #[arg(long)]
        force: bool,
    },
}

/// Check if Docker is running and accessible
async fn is_docker_running() -> bool {
    match tokio::process::Command::new("docker")
        .args(["version", "--format", "{{.Server.Version}}"])
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

fn load_config(cli_path: Option<&Path>) -> Result<Config> {
    // An explicit --config must load; the fallback chain may not exist.
    if let Some(path) = cli_path {
        return Ok(Config::load(&path.to_string_lossy())?);
    }

    for path in ["gantry.toml", "configs/default.toml"] {
        if Path::new(path).exists() {
            match Config::load(path) {
                Ok(config) => return Ok(config),
                Err(e) => warn!("Failed to load config file {}: {}", path, e),
            }
        }
    }

    info!("Using default configuration");
    Ok(Config::default())
}

fn service_spec(
    path: PathBuf,
    name: Option<String>,
    variant: Variant,
    env: Vec<String>,
) -> Result<ServiceSpec> {
    let name = match name {
        Some(name) => name,
        None => service_name_from_root(&path).ok_or_else(|| {
            anyhow::anyhow!(
                "cannot derive a service name from {}; pass --name",
                path.display()
            )
        })?,
    };

    let mut spec = ServiceSpec::new(name, path, variant)?;
    for pair in env {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("invalid --env {pair}, expected KEY=VALUE"))?;
        spec.environment.insert(key.to_string(), value.to_string());
    }
    Ok(spec)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if !is_docker_running().await {
        error!("Docker is not running or not accessible");
        error!("Please ensure Docker is installed and running");
        std::process::exit(1);
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Build {
            path,
            name,
            variant,
        } => {
            let spec = service_spec(path, name, variant, vec![])?;
            let built = ImageBuilder::new(config).build(&spec).await?;
            println!("{}", built.image_ref);
        }
        Commands::Run {
            path,
            name,
            variant,
            env,
            wait,
        } => {
            let spec = service_spec(path, name, variant, env)?;
            let built = ImageBuilder::new(config.clone()).build(&spec).await?;

            let runner = Runner::new(config.clone()).await?;
            let run = RunSpec::for_service(&built.image_ref, &built.process, &spec, &config);
            let container_id = runner.create_container(&run).await?;
            runner.start_container(&container_id).await?;
            info!("Started container {} ({})", run.name, container_id);

            if wait {
                let code = runner
                    .wait_for_exit(&container_id, config.limits.wait_timeout_ms)
                    .await?;
                info!("Container exited with code {}", code);
                std::process::exit(code as i32);
            }
            println!("{container_id}");
        }
        Commands::Stop { container } => {
            let runner = Runner::new(config).await?;
            runner.stop_container(&container).await?;
        }
        Commands::Rm { container } => {
            let runner = Runner::new(config).await?;
            runner.remove_container(&container).await?;
        }
        Commands::Logs { container } => {
            let runner = Runner::new(config).await?;
            let logs = runner.get_container_logs(&container).await?;
            print!("{logs}");
        }
        Commands::Images => {
            let runner = Runner::new(config).await?;
            for image in runner.list_service_images().await? {
                println!("{image}");
            }
        }
        Commands::Rmi { image, force } => {
            let runner = Runner::new(config).await?;
            runner.remove_image(&image, force).await?;
        }
    }

    Ok(())
}
