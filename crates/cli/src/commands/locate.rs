//! `locate` command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use carla_capture::locate_closest;
use tracing::{info, warn};

use super::{connect, load_blueprint};
use crate::cli::LocateArgs;

/// Execute the `locate` command
pub async fn run_locate(args: &LocateArgs) -> Result<()> {
    let blueprint = load_blueprint(&args.connection)?;
    let client = connect(&blueprint.world).await?;

    let mut interval = tokio::time::interval(Duration::from_millis(args.interval_ms.max(1)));
    let mut polls = 0u64;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            }
        }

        match locate_closest(&client).await.context("Failed to query spawn points")? {
            Some(found) if args.json => println!("{}", serde_json::to_string(&found)?),
            Some(found) => println!(
                "closest spawn point: {} (spectator at {:.1}, {:.1}, {:.1})",
                found.index,
                found.spectator.location.x,
                found.spectator.location.y,
                found.spectator.location.z
            ),
            None => warn!("Map has no spawn points"),
        }

        polls += 1;
        if args.count != 0 && polls >= args.count {
            break;
        }
    }
    Ok(())
}
