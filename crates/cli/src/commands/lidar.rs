//! `lidar` command implementation.

use actor_factory::ActorFactory;
use anyhow::{Context, Result};
use carla_capture::lidar_sweep;
use tracing::info;

use super::{connect, listen_for_shutdown, load_blueprint};
use crate::cli::LidarArgs;

/// Execute the `lidar` command
pub async fn run_lidar(args: &LidarArgs) -> Result<()> {
    let mut blueprint = load_blueprint(&args.connection)?;
    if let Some(records) = args.records {
        blueprint.lidar.records = records;
    }
    if let Some(ref output) = args.output {
        blueprint.lidar.output_dir = output.to_string_lossy().into_owned();
    }
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after command-line overrides")?;

    let client = connect(&blueprint.world).await?;
    let factory = ActorFactory::new(client);
    factory
        .configure_world(&blueprint.world)
        .await
        .context("Failed to configure world")?;

    info!(
        records = blueprint.lidar.records,
        output = %blueprint.lidar.output_dir,
        "Starting lidar sweep..."
    );
    let shutdown = listen_for_shutdown();
    let report = lidar_sweep(&factory, &blueprint.lidar, &blueprint.sync, &shutdown)
        .await
        .context("Lidar sweep failed")?;

    println!("\n=== Lidar Sweep ===");
    println!("Clouds written: {}", report.clouds);
    println!("Points accumulated: {}", report.points);
    println!("Ticks skipped: {}", report.skipped);
    println!("Point cloud: {}", report.pcd.display());
    if report.interrupted {
        println!("Stopped early by shutdown signal");
    }
    Ok(())
}
