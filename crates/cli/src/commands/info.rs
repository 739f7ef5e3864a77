//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{CaptureBlueprint, WeatherPreset};
use tracing::info;

use crate::cli::InfoArgs;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    match &args.config {
        Some(path) => info!(config = %path.display(), "Loading configuration info"),
        None => info!("Showing built-in defaults"),
    }

    let blueprint = config_loader::ConfigLoader::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    if args.json {
        let json = config_loader::ConfigLoader::to_json(&blueprint)
            .context("Failed to serialize config")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint);
    }

    Ok(())
}

fn print_config_info(blueprint: &CaptureBlueprint) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               CARLA Capture Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let world = &blueprint.world;
    println!("📍 World");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Map: {}", world.map);
    println!("   ├─ CARLA Server: {}:{}", world.carla_host, world.carla_port);
    println!("   ├─ All lights green: {}", world.traffic_lights_green);
    match world.weather {
        WeatherPreset::ClearNoon => println!("   └─ Weather: ClearNoon"),
        WeatherPreset::Custom(ref params) => println!("   └─ Weather: {:?}", params),
    }

    let vehicle = &blueprint.vehicle;
    println!("\n🚗 Vehicle");
    println!("   ├─ Blueprint: {}", vehicle.blueprint);
    println!("   ├─ Autopilot: {}", vehicle.autopilot);
    println!("   └─ Spawn points: {:?}", vehicle.spawn_points);

    let camera = &blueprint.camera;
    println!("\n📷 Cameras (rgb / depth / semseg)");
    println!("   ├─ Image: {}x{}, fov {}", camera.width, camera.height, camera.fov);
    println!(
        "   ├─ Mount: ({}, {}, {})",
        camera.mount.x, camera.mount.y, camera.mount.z
    );
    println!("   └─ Jitter: y ±{}, z ±{}", camera.y_jitter, camera.z_jitter);

    let sync = &blueprint.sync;
    let run = &blueprint.run;
    println!("\n⚙️  Sync Settings");
    println!("   ├─ Ticks per second: {}", sync.fps);
    println!("   ├─ Timeout: {}s ({:?})", sync.timeout_sec, sync.on_timeout);
    println!(
        "   ├─ Runs: {} per spawn point ({} total)",
        run.runs_per_spawn,
        blueprint.total_runs()
    );
    println!(
        "   └─ Ticks per run: {} ({} warm-up, {} recorded)",
        run.frames_per_run,
        run.warmup_ticks,
        run.recorded_frames()
    );

    println!("\n📤 Output");
    println!("   ├─ Base dir: {}", blueprint.output.base_dir);
    println!("   ├─ Lidar dir: {}", blueprint.lidar.output_dir);
    let archived: Vec<&str> = blueprint
        .archive
        .modalities
        .iter()
        .map(|m| m.dir_name())
        .collect();
    println!(
        "   └─ Archive: {} ({})",
        blueprint.archive.output,
        archived.join(", ")
    );

    println!();
}
