//! Command implementations.

mod archive;
mod cleanup;
mod info;
mod lidar;
mod locate;
mod run;
mod validate;

pub use archive::run_archive;
pub use cleanup::run_cleanup;
pub use info::run_info;
pub use lidar::run_lidar;
pub use locate::run_locate;
pub use run::run_capture;
pub use validate::run_validate;

use std::time::Duration;

use actor_factory::SimulatorClient;
use anyhow::{Context, Result};
use carla_capture::Shutdown;
use contracts::{CaptureBlueprint, WorldConfig};
use tracing::{info, warn};

use crate::cli::ConnectionArgs;

/// Simulator backend selected at build time
#[cfg(feature = "real-carla")]
pub(crate) type Simulator = actor_factory::RealCarlaClient;

/// Simulator backend selected at build time
#[cfg(not(feature = "real-carla"))]
pub(crate) type Simulator = actor_factory::MockSimulator;

/// Load the configuration (or defaults) and apply host/port overrides
pub(crate) fn load_blueprint(args: &ConnectionArgs) -> Result<CaptureBlueprint> {
    if let Some(path) = &args.config {
        if !path.exists() {
            anyhow::bail!("Configuration file not found: {}", path.display());
        }
        info!(config = %path.display(), "Loading configuration");
    } else {
        info!("No configuration file given, using built-in defaults");
    }

    let mut blueprint = config_loader::ConfigLoader::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    if let Some(ref host) = args.host {
        info!(host = %host, "Overriding CARLA host from CLI");
        blueprint.world.carla_host = host.clone();
    }
    if let Some(port) = args.port {
        info!(port = %port, "Overriding CARLA port from CLI");
        blueprint.world.carla_port = port;
    }
    Ok(blueprint)
}

/// Connect to the simulator named in `world`
pub(crate) async fn connect(world: &WorldConfig) -> Result<Simulator> {
    #[cfg(not(feature = "real-carla"))]
    warn!("Built without `real-carla`: running against the in-process mock simulator");

    info!(
        host = %world.carla_host,
        port = world.carla_port,
        "Connecting to CARLA server..."
    );

    let mut client = Simulator::new();
    client
        .connect(
            &world.carla_host,
            world.carla_port,
            Duration::from_secs_f64(world.timeout_sec),
        )
        .await
        .with_context(|| {
            format!(
                "Failed to connect to CARLA at {}:{}",
                world.carla_host, world.carla_port
            )
        })?;

    info!("Connected to CARLA server");
    Ok(client)
}

/// Turn the first Ctrl+C or SIGTERM into a [`Shutdown`] request
///
/// The session stops at the next tick boundary, then restores the world
/// settings and destroys its actors as on a normal exit.
pub(crate) fn listen_for_shutdown() -> Shutdown {
    let (trigger, shutdown) = Shutdown::channel();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received shutdown signal, finishing the current tick and cleaning up");
        trigger.trigger();
    });
    shutdown
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
