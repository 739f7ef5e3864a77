//! `run` command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use carla_capture::SessionDriver;
use contracts::CaptureBlueprint;
use tracing::{info, warn};

use super::{connect, listen_for_shutdown, load_blueprint};
use crate::cli::RunArgs;

/// Execute the `run` command
pub async fn run_capture(args: &RunArgs) -> Result<()> {
    let mut blueprint = load_blueprint(&args.connection)?;
    apply_overrides(&mut blueprint, args);
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after command-line overrides")?;

    info!(
        map = %blueprint.world.map,
        host = %blueprint.world.carla_host,
        port = blueprint.world.carla_port,
        spawn_points = ?blueprint.vehicle.spawn_points,
        runs = blueprint.total_runs(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    let base_dir = PathBuf::from(&blueprint.output.base_dir);
    let client = connect(&blueprint.world).await?;
    let mut driver = SessionDriver::new(client, blueprint).with_shutdown(listen_for_shutdown());
    let started = chrono::Local::now().naive_local();

    info!("Starting capture session...");

    let report = driver
        .run_session(&base_dir, started)
        .await
        .context("Capture session failed")?;
    if report.interrupted {
        warn!(
            session_dir = %report.session_dir.display(),
            runs = report.runs.len(),
            frames = report.frames_recorded(),
            "Capture session stopped early by shutdown signal"
        );
    } else {
        info!(
            session_dir = %report.session_dir.display(),
            runs = report.runs.len(),
            frames = report.frames_recorded(),
            "Capture session completed successfully"
        );
    }
    println!("\n{}", report.summary);

    info!("CARLA Capture finished");
    Ok(())
}

fn apply_overrides(blueprint: &mut CaptureBlueprint, args: &RunArgs) {
    if let Some(ref output) = args.output {
        blueprint.output.base_dir = output.to_string_lossy().into_owned();
    }
    if !args.spawn_points.is_empty() {
        blueprint.vehicle.spawn_points = args.spawn_points.clone();
    }
    if let Some(runs) = args.runs {
        blueprint.run.runs_per_spawn = runs;
    }
    if let Some(frames) = args.frames {
        blueprint.run.frames_per_run = frames;
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &CaptureBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("World:");
    println!("  Map: {}", blueprint.world.map);
    println!(
        "  CARLA: {}:{}",
        blueprint.world.carla_host, blueprint.world.carla_port
    );
    println!("\nVehicle: {}", blueprint.vehicle.blueprint);
    println!("  Spawn points: {:?}", blueprint.vehicle.spawn_points);
    println!(
        "  Runs: {} per spawn point ({} total)",
        blueprint.run.runs_per_spawn,
        blueprint.total_runs()
    );
    println!(
        "\nCamera: {}x{}, fov {}",
        blueprint.camera.width, blueprint.camera.height, blueprint.camera.fov
    );
    println!("\nSync Settings:");
    println!("  Ticks per second: {}", blueprint.sync.fps);
    println!("  Timeout: {}s ({:?})", blueprint.sync.timeout_sec, blueprint.sync.on_timeout);
    println!(
        "  Ticks per run: {} ({} warm-up)",
        blueprint.run.frames_per_run, blueprint.run.warmup_ticks
    );
    println!("\nOutput: {}", blueprint.output.base_dir);
    println!();
}
