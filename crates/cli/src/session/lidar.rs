//! Lidar sweep from the spectator
//!
//! 雷达挂在观察者上，每个 tick 的点云平移到观察者坐标系下写成
//! `<i>.ply`，全部累积后 y 取反写成 `pointcloud.pcd`。
//! 单个 tick 的失败只记录并跳过。停止请求在 tick 之间生效。

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use actor_factory::{ActorFactory, ActorFactoryError, SimulatorClient, LIDAR_SENSOR_ID};
use contracts::{ActorId, LidarConfig, LidarPoint, RuntimeGraph, SyncConfig};
use exporter::{write_pcd, write_ply, ExportError};
use postprocess::{translate, PointCloudAccumulator};
use sync_engine::TickSynchronizer;
use tracing::{debug, info, instrument, warn};

use super::payload_kind;
use super::shutdown::Shutdown;
use crate::error::{Result, SessionError};

/// Accumulated cloud file name
pub const POINTCLOUD_FILE: &str = "pointcloud.pcd";

/// Result of a sweep
#[derive(Debug, Clone, PartialEq)]
pub struct LidarReport {
    pub output_dir: PathBuf,
    /// Path of the accumulated cloud
    pub pcd: PathBuf,
    /// Ticks whose cloud was kept
    pub clouds: usize,
    pub points: usize,
    /// Ticks skipped after a failure
    pub skipped: u64,
    /// Stopped by a shutdown request before `records` ticks
    pub interrupted: bool,
}

/// Spawn the lidar rig, capture `lidar.records` ticks, write PLY/PCD files
#[instrument(name = "lidar_sweep", skip_all, fields(records = lidar.records))]
pub async fn lidar_sweep<C: SimulatorClient>(
    factory: &ActorFactory<C>,
    lidar: &LidarConfig,
    sync: &SyncConfig,
    shutdown: &Shutdown,
) -> Result<LidarReport> {
    let output_dir = PathBuf::from(&lidar.output_dir);
    fs::create_dir_all(&output_dir).map_err(|e| ExportError::io(&output_dir, e))?;

    let graph = factory.spawn_lidar_rig(lidar).await?;
    let swept = sweep(factory, &graph, lidar, sync, shutdown, &output_dir).await;

    let failed = factory.teardown(&graph).await;
    if failed > 0 {
        warn!(failed, "lidar teardown incomplete");
    }
    let Swept {
        accumulated,
        skipped,
        interrupted,
    } = swept?;

    let pcd = output_dir.join(POINTCLOUD_FILE);
    write_pcd(&pcd, &accumulated.mirrored())?;

    info!(
        clouds = accumulated.clouds(),
        points = accumulated.len(),
        skipped,
        interrupted,
        pcd = %pcd.display(),
        "lidar sweep finished"
    );
    Ok(LidarReport {
        output_dir,
        pcd,
        clouds: accumulated.clouds(),
        points: accumulated.len(),
        skipped,
        interrupted,
    })
}

struct Swept {
    accumulated: PointCloudAccumulator,
    skipped: u64,
    interrupted: bool,
}

async fn sweep<C: SimulatorClient>(
    factory: &ActorFactory<C>,
    graph: &RuntimeGraph,
    lidar: &LidarConfig,
    sync_cfg: &SyncConfig,
    shutdown: &Shutdown,
    output_dir: &Path,
) -> Result<Swept> {
    let spectator = graph
        .sensor(LIDAR_SENSOR_ID)
        .map(|s| s.parent_id)
        .ok_or_else(|| ActorFactoryError::simulator("lidar rig has no lidar"))?;
    let sources = factory.sensor_sources(graph)?;
    let client = factory.client();
    let mut sync = TickSynchronizer::begin(client, sources, sync_cfg.fps).await?;

    let mut accumulated = PointCloudAccumulator::new();
    let mut skipped = 0;
    let mut interrupted = false;
    let swept: Result<()> = async {
        for i in 0..lidar.records {
            if shutdown.is_requested() {
                info!(record = i, "shutdown requested, stopping sweep");
                interrupted = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(lidar.pace_ms)).await;
            let path = output_dir.join(format!("{i}.ply"));
            match sweep_tick(client, &mut sync, spectator, sync_cfg.timeout(), &path).await {
                Ok(points) => {
                    debug!(record = i, points = points.len(), "cloud written");
                    accumulated.extend(&points);
                }
                Err(e) if skippable(&e) => {
                    warn!(record = i, error = %e, "lidar tick skipped");
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
    .await;

    let ended = sync.end().await;
    swept?;
    ended?;
    Ok(Swept {
        accumulated,
        skipped,
        interrupted,
    })
}

/// One tick: cloud in spectator-relative coordinates, written to `path`
async fn sweep_tick<C: SimulatorClient>(
    client: &C,
    sync: &mut TickSynchronizer<'_, C>,
    spectator: ActorId,
    timeout: Duration,
    path: &Path,
) -> Result<Vec<LidarPoint>> {
    let synced = sync.advance(timeout).await?;
    let record = synced
        .record(LIDAR_SENSOR_ID)
        .ok_or_else(|| SessionError::missing_record(LIDAR_SENSOR_ID, synced.tick))?;
    let points = record
        .payload
        .as_point_cloud()
        .and_then(|cloud| cloud.points())
        .ok_or_else(|| {
            SessionError::unexpected_payload(LIDAR_SENSOR_ID, payload_kind(&record.payload))
        })?;

    let location = client.actor_transform(spectator).await?.location;
    let moved = translate(&points, location.negated());
    write_ply(path, &moved)?;
    Ok(moved)
}

/// Timeouts and per-tick data or file errors; the session itself is still usable
fn skippable(error: &SessionError) -> bool {
    match error {
        SessionError::Sync(e) => e.is_recoverable(),
        SessionError::Simulator(_) => false,
        _ => true,
    }
}
