//! Session modes
//!
//! - [`SessionDriver`]: camera capture runs (spawn → sync → post-process → export)
//! - [`lidar_sweep`]: point clouds from a lidar on the spectator
//! - [`locate_closest`]: spawn point nearest to the spectator

mod driver;
mod lidar;
mod locate;
mod report;
mod shutdown;
mod sinks;

pub use driver::SessionDriver;
pub use lidar::{lidar_sweep, LidarReport, POINTCLOUD_FILE};
pub use locate::{locate_closest, SpawnPointMatch};
pub use report::{RunReport, SessionReport, OUTCOME_COMPLETED, OUTCOME_INTERRUPTED};
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use sinks::CAMERA_MODALITIES;

use contracts::{ImageData, SensorPayload};
use sync_engine::SyncedTick;

use crate::error::{Result, SessionError};

/// Image delivered by `sensor_id` at this tick
pub(crate) fn camera_image<'a>(synced: &'a SyncedTick, sensor_id: &str) -> Result<&'a ImageData> {
    let record = synced
        .record(sensor_id)
        .ok_or_else(|| SessionError::missing_record(sensor_id, synced.tick))?;
    record
        .payload
        .as_image()
        .ok_or_else(|| SessionError::unexpected_payload(sensor_id, payload_kind(&record.payload)))
}

pub(crate) fn payload_kind(payload: &SensorPayload) -> &'static str {
    match payload {
        SensorPayload::Image(_) => "image",
        SensorPayload::PointCloud(_) => "point cloud",
        SensorPayload::WorldTick(_) => "world tick",
        SensorPayload::Raw(_) => "raw",
    }
}
