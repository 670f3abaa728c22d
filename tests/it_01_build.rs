#![cfg(feature = "docker_tests")]

use gantry_models::{Config, ServiceSpec, Variant};
use gantry_packaging::ImageBuilder;
use gantry_testsupport::{docker_available, write_script_app, write_server_app};

#[tokio::test(flavor = "multi_thread")]
async fn build_all_variants() -> anyhow::Result<()> {
    if !docker_available().await {
        eprintln!("skipping: docker not available");
        return Ok(());
    }

    let builder = ImageBuilder::new(Config::default());

    let script_dir = tempfile::tempdir()?;
    write_script_app(script_dir.path())?;
    let script = ServiceSpec::new("it-build-script", script_dir.path(), Variant::Script)?;
    let script_image = builder.build(&script).await?;
    assert!(script_image.image_ref.starts_with("gantry/it-build-script:"));

    let app_dir = tempfile::tempdir()?;
    write_server_app(app_dir.path())?;
    let server = ServiceSpec::new("it-build-server", app_dir.path(), Variant::Server)?;
    let verbose = ServiceSpec::new("it-build-server", app_dir.path(), Variant::ServerVerbose)?;

    let server_image = builder.build(&server).await?;
    let verbose_image = builder.build(&verbose).await?;

    // Same tree under two variants must not collide on one tag
    assert_ne!(server_image.image_ref, verbose_image.image_ref);

    // Unchanged inputs rebuild to the identical reference
    let rebuilt = builder.build(&server).await?;
    assert_eq!(rebuilt.image_ref, server_image.image_ref);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn build_fails_without_manifest() -> anyhow::Result<()> {
    if !docker_available().await {
        eprintln!("skipping: docker not available");
        return Ok(());
    }

    let app_dir = tempfile::tempdir()?;
    write_server_app(app_dir.path())?;
    std::fs::remove_file(app_dir.path().join("requirements.txt"))?;

    let spec = ServiceSpec::new("it-build-broken", app_dir.path(), Variant::Server)?;
    let err = ImageBuilder::new(Config::default()).build(&spec).await;
    assert!(matches!(
        err,
        Err(gantry_models::GantryError::ManifestMissing { .. })
    ));

    Ok(())
}
