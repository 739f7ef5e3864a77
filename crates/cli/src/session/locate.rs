//! Closest spawn point to the spectator

use actor_factory::{closest_spawn_point, SimulatorClient};
use contracts::Transform;
use serde::Serialize;

use crate::error::Result;

/// Spectator pose and the spawn point nearest to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpawnPointMatch {
    pub spectator: Transform,
    pub index: usize,
    pub spawn_point: Transform,
}

/// `None` when the map has no spawn points
pub async fn locate_closest<C: SimulatorClient>(client: &C) -> Result<Option<SpawnPointMatch>> {
    let spawn_points = client.spawn_points().await?;
    let spectator = client.spectator().await?;
    let pose = client.actor_transform(spectator).await?;

    Ok(closest_spawn_point(&spawn_points, pose.location).and_then(|index| {
        spawn_points.get(index).map(|&spawn_point| SpawnPointMatch {
            spectator: pose,
            index,
            spawn_point,
        })
    }))
}
