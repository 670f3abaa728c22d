use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::image::{ListImagesOptions, RemoveImageOptions};
use bollard::models::{
    ContainerCreateResponse, EventMessage, HostConfig, PortBinding, RestartPolicy,
    RestartPolicyNameEnum,
};
use bollard::Docker;

use async_trait::async_trait;
use futures_util::StreamExt;
use gantry_models::{Config as AppConfig, GantryError, ProcessSpec, ServiceSpec};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

/// Engine lifecycle notifications surfaced to whoever runs containers.
/// The container lifecycle here is the plain one: created, started,
/// running until the process exits or is signaled, then gone.
#[derive(Clone, Debug)]
pub enum ContainerEvent {
    Die {
        container_id: String,
        exit_code: Option<i64>,
    },
    Stop {
        container_id: String,
    },
    Kill {
        container_id: String,
    },
    Remove {
        container_id: String,
    },
    Start {
        container_id: String,
    },
    Create {
        container_id: String,
    },
}

pub type ContainerEventSender = mpsc::UnboundedSender<ContainerEvent>;

/// One port published from the container to the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortPublish {
    pub container_port: u16,
    pub host_ip: String,
    pub host_port: u16,
}

/// Everything needed to create one service container.
#[derive(Clone, Debug)]
pub struct RunSpec {
    pub image: String,
    pub name: String,
    pub env: Vec<(String, String)>,
    pub ports: Vec<PortPublish>,
    pub labels: Vec<(String, String)>,
}

impl Default for RunSpec {
    fn default() -> Self {
        Self {
            image: "test:latest".to_string(),
            name: "test-container".to_string(),
            env: vec![],
            ports: vec![],
            labels: vec![],
        }
    }
}

impl RunSpec {
    /// Launch settings for a built service image. Server variants get
    /// their listen port published on all host interfaces; the verbose
    /// variant additionally runs with unbuffered stdio.
    pub fn for_service(
        image_ref: &str,
        process: &ProcessSpec,
        spec: &ServiceSpec,
        config: &AppConfig,
    ) -> Self {
        let name = format!("gantry-{}-{}", spec.name, uuid::Uuid::new_v4());

        let mut env: Vec<(String, String)> = Vec::new();
        if spec.variant.unbuffered_io() {
            env.push(("PYTHONUNBUFFERED".to_string(), "1".to_string()));
        }
        // Sorted so the rendered environment is stable run to run.
        let custom: BTreeMap<_, _> = spec.environment.iter().collect();
        for (key, value) in custom {
            env.push((key.clone(), value.clone()));
        }

        let ports = process
            .listen_port()
            .map(|port| PortPublish {
                container_port: port,
                host_ip: config.server.host.clone(),
                host_port: port,
            })
            .into_iter()
            .collect();

        Self {
            image: image_ref.to_string(),
            name,
            env,
            ports,
            labels: vec![
                ("gantry.service".to_string(), spec.name.clone()),
                ("gantry.variant".to_string(), spec.variant.to_string()),
            ],
        }
    }
}

#[async_trait]
pub trait EngineLike: Send + Sync + 'static {
    async fn create(&self, spec: RunSpec) -> anyhow::Result<String>; // returns container_id
    async fn start(&self, container_id: &str) -> anyhow::Result<()>;
    async fn stop(&self, container_id: &str, timeout_secs: u64) -> anyhow::Result<()>;
    async fn remove(&self, container_id: &str, force: bool) -> anyhow::Result<()>;
    async fn inspect_running(&self, container_id: &str) -> anyhow::Result<bool>;
}

pub struct Runner {
    docker: Docker,
    config: AppConfig,
    event_sender: Option<ContainerEventSender>,
}

impl Runner {
    pub async fn new(config: AppConfig) -> Result<Self, GantryError> {
        let docker_host = if !config.docker.host.is_empty() {
            Some(config.docker.host.clone())
        } else {
            std::env::var("DOCKER_HOST").ok()
        };

        let docker = match docker_host {
            Some(host) if host.starts_with("tcp://") => {
                Docker::connect_with_http(&host, 120, bollard::API_DEFAULT_VERSION).map_err(
                    |e| GantryError::DockerError {
                        message: format!("Failed to connect to Docker at {host}: {e}"),
                    },
                )?
            }
            _ => {
                // Default to Unix socket connection
                Docker::connect_with_socket_defaults().map_err(|e| GantryError::DockerError {
                    message: e.to_string(),
                })?
            }
        };

        Ok(Self {
            docker,
            config,
            event_sender: None,
        })
    }

    pub fn with_event_sender(mut self, sender: ContainerEventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    #[instrument(skip(self))]
    pub async fn start_events_monitor(&self) -> Result<(), GantryError> {
        let docker = self.docker.clone();
        let event_sender = self.event_sender.clone();

        tokio::spawn(async move {
            if let Err(e) = Self::monitor_docker_events(docker, event_sender).await {
                error!("Docker events monitor failed: {}", e);
            }
        });

        info!("Started Docker events monitor");
        Ok(())
    }

    async fn monitor_docker_events(
        docker: Docker,
        event_sender: Option<ContainerEventSender>,
    ) -> Result<(), GantryError> {
        let mut events_stream = docker.events::<String>(None);

        info!("Docker events monitor started");

        while let Some(event_result) = events_stream.next().await {
            match event_result {
                Ok(event) => {
                    if let Some(sender) = &event_sender {
                        if let Some(container_event) = parse_docker_event(event) {
                            if let Err(e) = sender.send(container_event) {
                                warn!("Failed to send container event: {}", e);
                            }
                        }
                    }
                }
                Err(e) => {
                    error!("Error receiving Docker event: {}", e);
                    // Continue monitoring even if we get errors
                }
            }
        }

        warn!("Docker events stream ended");
        Ok(())
    }

    #[instrument(skip(self, run), fields(container = %run.name))]
    pub async fn create_container(&self, run: &RunSpec) -> Result<String, GantryError> {
        let env: Vec<String> = run.env.iter().map(|(k, v)| format!("{k}={v}")).collect();

        let mut port_bindings = HashMap::new();
        let mut exposed_ports = HashMap::new();
        for publish in &run.ports {
            let key = format!("{}/tcp", publish.container_port);
            exposed_ports.insert(key.clone(), HashMap::new());
            port_bindings.insert(
                key,
                Some(vec![PortBinding {
                    host_ip: Some(publish.host_ip.clone()),
                    host_port: Some(publish.host_port.to_string()),
                }]),
            );
        }

        let host_config = HostConfig {
            port_bindings: if port_bindings.is_empty() {
                None
            } else {
                Some(port_bindings)
            },
            restart_policy: Some(RestartPolicy {
                name: Some(RestartPolicyNameEnum::NO),
                maximum_retry_count: None,
            }),
            ..Default::default()
        };

        let container_config = Config {
            image: Some(run.image.clone()),
            env: Some(env),
            exposed_ports: if exposed_ports.is_empty() {
                None
            } else {
                Some(exposed_ports)
            },
            host_config: Some(host_config),
            labels: Some(run.labels.iter().cloned().collect()),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: run.name.clone(),
            ..Default::default()
        };

        let response: ContainerCreateResponse = self
            .docker
            .create_container(Some(options), container_config)
            .await
            .map_err(|e| GantryError::DockerError {
                message: e.to_string(),
            })?;

        info!("Created container: {} with ID: {}", run.name, response.id);
        Ok(response.id)
    }

    #[instrument(skip(self))]
    pub async fn start_container(&self, container_id: &str) -> Result<(), GantryError> {
        self.docker
            .start_container(container_id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| GantryError::DockerError {
                message: e.to_string(),
            })?;

        info!("Started container: {}", container_id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn stop_container(&self, container_id: &str) -> Result<(), GantryError> {
        let options = StopContainerOptions {
            t: self.config.limits.stop_grace_secs as i64,
        };

        self.docker
            .stop_container(container_id, Some(options))
            .await
            .map_err(|e| GantryError::DockerError {
                message: e.to_string(),
            })?;

        info!("Stopped container: {}", container_id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn remove_container(&self, container_id: &str) -> Result<(), GantryError> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };

        self.docker
            .remove_container(container_id, Some(options))
            .await
            .map_err(|e| GantryError::DockerError {
                message: e.to_string(),
            })?;

        info!("Removed container: {}", container_id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_container_logs(&self, container_id: &str) -> Result<String, GantryError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            timestamps: true,
            ..Default::default()
        };

        let mut stream = self.docker.logs(container_id, Some(options));

        let mut logs = String::new();
        while let Some(log) = stream.next().await {
            match log {
                Ok(LogOutput::StdOut { message }) => {
                    logs.push_str(&String::from_utf8_lossy(&message));
                }
                Ok(LogOutput::StdErr { message }) => {
                    logs.push_str(&String::from_utf8_lossy(&message));
                }
                Ok(LogOutput::StdIn { message }) => {
                    logs.push_str(&String::from_utf8_lossy(&message));
                }
                Ok(LogOutput::Console { message }) => {
                    logs.push_str(&String::from_utf8_lossy(&message));
                }
                Err(e) => {
                    error!("Error reading container logs: {}", e);
                    break;
                }
            }
        }

        Ok(logs)
    }

    /// Block until the container's process exits and hand back its exit
    /// code unchanged. A bind failure inside the container shows up here
    /// as a nonzero code, not as a distinct error.
    #[instrument(skip(self))]
    pub async fn wait_for_exit(
        &self,
        container_id: &str,
        timeout_ms: u64,
    ) -> Result<i64, GantryError> {
        let timeout = std::time::Duration::from_millis(timeout_ms);
        let start = std::time::Instant::now();

        loop {
            if start.elapsed() >= timeout {
                return Err(GantryError::ContainerTimeout { timeout_ms });
            }

            match self.docker.inspect_container(container_id, None).await {
                Ok(container) => {
                    if let Some(state) = container.state {
                        if let Some(status) = state.status {
                            if status.to_string() == "exited" {
                                if let Some(exit_code) = state.exit_code {
                                    return Ok(exit_code);
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    error!("Error inspecting container {}: {}", container_id, e);
                    return Err(GantryError::DockerError {
                        message: e.to_string(),
                    });
                }
            }

            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }

    #[instrument(skip(self))]
    pub async fn remove_image(&self, image_ref: &str, force: bool) -> Result<(), GantryError> {
        let options = RemoveImageOptions {
            force,
            noprune: false,
        };

        self.docker
            .remove_image(image_ref, Some(options), None)
            .await
            .map_err(|e| GantryError::DockerError {
                message: format!("Failed to remove image {image_ref}: {e}"),
            })?;

        info!("Removed image: {}", image_ref);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_service_images(&self) -> Result<Vec<String>, GantryError> {
        let options = ListImagesOptions::<String> {
            all: true,
            ..Default::default()
        };

        let images =
            self.docker
                .list_images(Some(options))
                .await
                .map_err(|e| GantryError::DockerError {
                    message: format!("Failed to list images: {e}"),
                })?;

        let prefix = format!("{}/", self.config.image.repository);
        let service_images: Vec<String> = images
            .into_iter()
            .filter_map(|image| {
                image
                    .repo_tags
                    .into_iter()
                    .find(|tag| tag.starts_with(&prefix))
            })
            .collect();

        Ok(service_images)
    }
}

pub(crate) fn parse_docker_event(event: EventMessage) -> Option<ContainerEvent> {
    let actor = event.actor?;
    let container_id = actor.id?;

    match event.action.as_deref() {
        Some("die") => {
            let exit_code = actor
                .attributes
                .and_then(|attrs| attrs.get("exitCode").cloned())
                .and_then(|code| code.parse::<i64>().ok());

            Some(ContainerEvent::Die {
                container_id,
                exit_code,
            })
        }
        Some("stop") => Some(ContainerEvent::Stop { container_id }),
        Some("kill") => Some(ContainerEvent::Kill { container_id }),
        Some("remove") => Some(ContainerEvent::Remove { container_id }),
        Some("start") => Some(ContainerEvent::Start { container_id }),
        Some("create") => Some(ContainerEvent::Create { container_id }),
        _ => None, // Ignore other events
    }
}

#[async_trait]
impl EngineLike for Runner {
    async fn create(&self, spec: RunSpec) -> anyhow::Result<String> {
        self.create_container(&spec)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }

    async fn start(&self, container_id: &str) -> anyhow::Result<()> {
        self.start_container(container_id)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }

    async fn stop(&self, container_id: &str, timeout_secs: u64) -> anyhow::Result<()> {
        let options = StopContainerOptions {
            t: timeout_secs as i64,
        };
        self.docker
            .stop_container(container_id, Some(options))
            .await?;
        Ok(())
    }

    async fn remove(&self, container_id: &str, force: bool) -> anyhow::Result<()> {
        let options = RemoveContainerOptions {
            force,
            ..Default::default()
        };
        self.docker
            .remove_container(container_id, Some(options))
            .await?;
        Ok(())
    }

    async fn inspect_running(&self, container_id: &str) -> anyhow::Result<bool> {
        let container = self.docker.inspect_container(container_id, None).await?;
        Ok(container
            .state
            .is_some_and(|state| state.running.unwrap_or(false)))
    }
}
