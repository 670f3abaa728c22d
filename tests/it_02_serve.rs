#![cfg(feature = "docker_tests")]

use gantry_invoker::{RunSpec, Runner};
use gantry_models::{Config, ServiceSpec, Variant};
use gantry_packaging::ImageBuilder;
use gantry_testsupport::{docker_available, write_script_app, write_server_app, ProbeClient};
use std::time::Duration;

const PROBE_URL: &str = "http://127.0.0.1:3000/";

async fn launch(variant: Variant, name: &str) -> anyhow::Result<(Runner, String, String)> {
    let config = Config::default();

    let app_dir = tempfile::tempdir()?;
    write_server_app(app_dir.path())?;
    let spec = ServiceSpec::new(name, app_dir.path(), variant)?;

    let built = ImageBuilder::new(config.clone()).build(&spec).await?;

    let runner = Runner::new(config.clone()).await?;
    let run = RunSpec::for_service(&built.image_ref, &built.process, &spec, &config);
    let container_id = runner.create_container(&run).await?;
    runner.start_container(&container_id).await?;

    Ok((runner, container_id, built.image_ref))
}

async fn teardown(runner: &Runner, container_id: &str, image_ref: &str) {
    let _ = runner.stop_container(container_id).await;
    let _ = runner.remove_container(container_id).await;
    let _ = runner.remove_image(image_ref, true).await;
}

// Both server variants bind 3000 on the host, so this runs them one
// after the other inside a single test.
#[tokio::test(flavor = "multi_thread")]
async fn server_variants_bind_port_and_toggle_access_log() -> anyhow::Result<()> {
    if !docker_available().await {
        eprintln!("skipping: docker not available");
        return Ok(());
    }

    let probe = ProbeClient::new();

    // Verbose variant: port reachable, request shows up in the access log
    let (runner, container_id, image_ref) =
        launch(Variant::ServerVerbose, "it-serve-verbose").await?;
    assert!(
        probe
            .wait_for_http(PROBE_URL, 60, Duration::from_millis(500))
            .await,
        "service never answered on port 3000"
    );
    let body = probe.get_text(PROBE_URL).await?;
    assert_eq!(body, "ok");

    tokio::time::sleep(Duration::from_millis(500)).await;
    let logs = runner.get_container_logs(&container_id).await?;
    assert!(
        logs.contains("GET /"),
        "expected access log lines, got: {logs}"
    );
    teardown(&runner, &container_id, &image_ref).await;

    // Plain variant: port reachable, access log stays silent
    let (runner, container_id, image_ref) = launch(Variant::Server, "it-serve-plain").await?;
    assert!(
        probe
            .wait_for_http(PROBE_URL, 60, Duration::from_millis(500))
            .await,
        "service never answered on port 3000"
    );
    let _ = probe.get_text(PROBE_URL).await?;

    tokio::time::sleep(Duration::from_millis(500)).await;
    let logs = runner.get_container_logs(&container_id).await?;
    assert!(
        !logs.contains("GET /"),
        "unexpected access log lines: {logs}"
    );
    teardown(&runner, &container_id, &image_ref).await;

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn script_variant_exit_code_is_inherited() -> anyhow::Result<()> {
    if !docker_available().await {
        eprintln!("skipping: docker not available");
        return Ok(());
    }

    let config = Config::default();

    let app_dir = tempfile::tempdir()?;
    write_script_app(app_dir.path())?;
    let spec = ServiceSpec::new("it-serve-script", app_dir.path(), Variant::Script)?;

    let built = ImageBuilder::new(config.clone()).build(&spec).await?;

    let runner = Runner::new(config.clone()).await?;
    let run = RunSpec::for_service(&built.image_ref, &built.process, &spec, &config);
    let container_id = runner.create_container(&run).await?;
    runner.start_container(&container_id).await?;

    let exit_code = runner.wait_for_exit(&container_id, 60_000).await?;
    assert_eq!(exit_code, 0);

    let logs = runner.get_container_logs(&container_id).await?;
    assert!(logs.contains("script done"));

    let _ = runner.remove_container(&container_id).await;
    let _ = runner.remove_image(&built.image_ref, true).await;

    Ok(())
}
