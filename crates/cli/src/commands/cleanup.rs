//! `cleanup` command implementation.

use actor_factory::ActorFactory;
use anyhow::{Context, Result};
use tracing::info;

use super::{connect, load_blueprint};
use crate::cli::CleanupArgs;

/// Execute the `cleanup` command
pub async fn run_cleanup(args: &CleanupArgs) -> Result<()> {
    let blueprint = load_blueprint(&args.connection)?;
    let client = connect(&blueprint.world).await?;
    let factory = ActorFactory::new(client);

    let destroyed = factory
        .cleanup_by_type(&args.type_id)
        .await
        .with_context(|| format!("Failed to clean up actors of type {}", args.type_id))?;

    info!(type_id = %args.type_id, destroyed, "Cleanup finished");
    println!("Destroyed {destroyed} actor(s) of type {}", args.type_id);
    Ok(())
}
