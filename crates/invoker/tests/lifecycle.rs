use async_trait::async_trait;
use gantry_invoker::docker::{EngineLike, RunSpec};
use gantry_models::{Config, ServiceSpec, Variant};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
pub struct FakeEngine {
    pub created: Arc<Mutex<Vec<RunSpec>>>,
    pub started: Arc<Mutex<Vec<String>>>,
    pub stopped: Arc<Mutex<Vec<(String, u64)>>>,
    pub removed: Arc<Mutex<Vec<(String, bool)>>>,
    pub running: Arc<Mutex<bool>>,
    pub next_id: Arc<Mutex<u64>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn last_created(&self) -> RunSpec {
        self.created
            .lock()
            .await
            .last()
            .cloned()
            .expect("no create")
    }
}

#[async_trait]
impl EngineLike for FakeEngine {
    async fn create(&self, spec: RunSpec) -> anyhow::Result<String> {
        self.created.lock().await.push(spec);
        let mut id = self.next_id.lock().await;
        *id += 1;
        Ok(format!("ctr-{}", *id))
    }
    async fn start(&self, container_id: &str) -> anyhow::Result<()> {
        self.started.lock().await.push(container_id.to_string());
        *self.running.lock().await = true;
        Ok(())
    }
    async fn stop(&self, container_id: &str, timeout_secs: u64) -> anyhow::Result<()> {
        self.stopped
            .lock()
            .await
            .push((container_id.to_string(), timeout_secs));
        *self.running.lock().await = false;
        Ok(())
    }
    async fn remove(&self, container_id: &str, force: bool) -> anyhow::Result<()> {
        self.removed
            .lock()
            .await
            .push((container_id.to_string(), force));
        Ok(())
    }
    async fn inspect_running(&self, _container_id: &str) -> anyhow::Result<bool> {
        Ok(*self.running.lock().await)
    }
}

#[tokio::test]
async fn start_stop_remove_lifecycle() {
    let engine = FakeEngine::new();

    // Create & start
    let id = engine.create(Default::default()).await.unwrap();
    engine.start(&id).await.unwrap();
    assert!(engine.inspect_running(&id).await.unwrap());

    // Graceful stop
    engine.stop(&id, 10).await.unwrap();
    assert!(!engine.inspect_running(&id).await.unwrap());

    // Remove
    engine.remove(&id, true).await.unwrap();

    let started = engine.started.lock().await.clone();
    let stopped = engine.stopped.lock().await.clone();
    let removed = engine.removed.lock().await.clone();

    assert_eq!(started, vec![id.clone()]);
    assert_eq!(stopped, vec![(id.clone(), 10)]);
    assert_eq!(removed, vec![(id.clone(), true)]);
}

#[tokio::test]
async fn server_launch_reaches_engine_with_published_port() {
    let engine = FakeEngine::new();
    let config = Config::default();

    let spec = ServiceSpec::new("web-app", "/tmp/web-app", Variant::ServerVerbose).unwrap();
    let process = spec.process_spec(&config.server);
    let run = RunSpec::for_service("gantry/web-app:abc123", &process, &spec, &config);

    let id = engine.create(run).await.unwrap();
    engine.start(&id).await.unwrap();

    let created = engine.last_created().await;
    assert_eq!(created.image, "gantry/web-app:abc123");
    assert_eq!(created.ports.len(), 1);
    assert_eq!(created.ports[0].container_port, 3000);
    assert_eq!(created.ports[0].host_ip, "0.0.0.0");
    assert!(created
        .env
        .contains(&("PYTHONUNBUFFERED".to_string(), "1".to_string())));
}
