//! Session driver
//!
//! 每次运行的线性流程：
//!
//! ```text
//! spawn 相机组 → 运行目录 → begin 同步 → focal.txt
//!   → loop { advance → 预热跳过 → 后处理 → 写盘 + 位姿 }
//!   → camera.txt → end 同步 → 销毁 actors → run.json
//! ```
//!
//! 循环中任何失败之后，`end` 与 teardown 仍然执行。
//! 停止请求 ([`Shutdown`]) 在 tick 之间生效，走同一条收尾路径。

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use actor_factory::{
    ActorFactory, ActorFactoryError, SimulatorClient, DEPTH_SENSOR_ID, RGB_SENSOR_ID,
    SEMSEG_SENSOR_ID,
};
use chrono::{Local, NaiveDateTime, SecondsFormat};
use contracts::{ActorId, CaptureBlueprint, CapturedFrame, RuntimeGraph, TimeoutPolicy};
use exporter::{run_dir_name, session_dir, ExportError, RunMetadata, RunWriter};
use observability::{
    record_frame_captured, record_postprocess_ms, record_run_finished, record_timeout,
    record_warmup_tick, CaptureStatsAggregator,
};
use postprocess::{focal_length, FrameProcessor};
use rand::Rng;
use sync_engine::{SyncError, SyncedTick, TickSynchronizer};
use tracing::{debug, error, info, instrument, warn};

use super::camera_image;
use super::report::{
    RunReport, SessionParams, SessionReport, OUTCOME_COMPLETED, OUTCOME_INTERRUPTED,
};
use super::shutdown::Shutdown;
use super::sinks::RunSinks;
use crate::error::{Result, SessionError};

/// Drives capture runs against one simulator
pub struct SessionDriver<C: SimulatorClient> {
    factory: ActorFactory<C>,
    blueprint: CaptureBlueprint,
    processor: FrameProcessor,
    params: SessionParams,
    stats: CaptureStatsAggregator,
    shutdown: Shutdown,
}

/// Everything the capture loop reads
struct LoopContext<'a, C> {
    client: &'a C,
    camera: ActorId,
    processor: &'a FrameProcessor,
    frames_per_run: u64,
    warmup_ticks: u64,
    timeout: Duration,
    policy: TimeoutPolicy,
    run_name: String,
    shutdown: &'a Shutdown,
}

impl<C: SimulatorClient> SessionDriver<C> {
    /// `client` must already be connected
    pub fn new(client: C, blueprint: CaptureBlueprint) -> Self {
        let params = SessionParams {
            map: blueprint.world.map.clone(),
            image_width: blueprint.camera.width,
            image_height: blueprint.camera.height,
            fov: blueprint.camera.fov,
            focal_length: focal_length(blueprint.camera.width, blueprint.camera.fov),
            fps: blueprint.sync.fps,
            warmup_ticks: blueprint.run.warmup_ticks,
            frames_per_run: blueprint.run.frames_per_run,
        };

        Self {
            factory: ActorFactory::new(client),
            processor: FrameProcessor::new(&blueprint.postprocess),
            blueprint,
            params,
            stats: CaptureStatsAggregator::new(),
            shutdown: Shutdown::never(),
        }
    }

    /// Stop at the next tick boundary once `shutdown` is requested
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn factory(&self) -> &ActorFactory<C> {
        &self.factory
    }

    pub fn client(&self) -> &C {
        self.factory.client()
    }

    pub fn blueprint(&self) -> &CaptureBlueprint {
        &self.blueprint
    }

    pub fn stats(&self) -> &CaptureStatsAggregator {
        &self.stats
    }

    /// Configure the scene, then run every spawn point `runs_per_spawn` times
    ///
    /// The first failed run ends the session; its actors are destroyed and
    /// the world settings restored before the error is returned. A shutdown
    /// request finishes the current run early and starts no further runs.
    #[instrument(
        name = "session_run",
        skip(self, base_dir, started),
        fields(map = %self.blueprint.world.map, runs = self.blueprint.total_runs())
    )]
    pub async fn run_session(
        &mut self,
        base_dir: &Path,
        started: NaiveDateTime,
    ) -> Result<SessionReport> {
        self.factory.configure_world(&self.blueprint.world).await?;

        let dir = session_dir(base_dir, started);
        fs::create_dir_all(&dir).map_err(|e| ExportError::io(&dir, e))?;
        info!(session_dir = %dir.display(), "session started");

        let spawn_points = self.blueprint.vehicle.spawn_points.clone();
        let runs_per_spawn = self.blueprint.run.runs_per_spawn as usize;
        let mut runs = Vec::with_capacity(self.blueprint.total_runs());
        let mut interrupted = false;

        'spawns: for (i, &spawn_index) in spawn_points.iter().enumerate() {
            for run_ordinal in 1..=runs_per_spawn {
                if self.shutdown.is_requested() {
                    interrupted = true;
                    break 'spawns;
                }
                let run = self.run_once(&dir, spawn_index, i + 1, run_ordinal).await?;
                interrupted = run.interrupted;
                runs.push(run);
                if interrupted {
                    break 'spawns;
                }
            }
        }

        let report = SessionReport {
            session_dir: dir,
            runs,
            summary: self.stats.summary(),
            interrupted,
        };
        info!(
            runs = report.runs.len(),
            frames = report.frames_recorded(),
            interrupted,
            "session finished"
        );
        Ok(report)
    }

    /// One run at `spawn_index`, written to `<session_dir>/<spawn_ordinal>_<run_ordinal>`
    #[instrument(
        name = "session_run_once",
        skip(self, session_dir),
        fields(run = %run_dir_name(spawn_ordinal, run_ordinal))
    )]
    pub async fn run_once(
        &mut self,
        session_dir: &Path,
        spawn_index: usize,
        spawn_ordinal: usize,
        run_ordinal: usize,
    ) -> Result<RunReport> {
        let (dy, dz) = self.camera_jitter();
        let mount = self.blueprint.camera.mount_transform(dy, dz);
        let mut report = RunReport {
            dir: session_dir.join(run_dir_name(spawn_ordinal, run_ordinal)),
            spawn_index,
            spawn_ordinal,
            run_ordinal,
            camera_offset: mount.location,
            ..Default::default()
        };

        let graph = self
            .factory
            .spawn_camera_rig(&self.blueprint, spawn_index, mount)
            .await?;
        let started_at = now_rfc3339();

        let result = self.record(&graph, &mut report).await;

        report.teardown_failures = self.factory.teardown(&graph).await;
        if report.teardown_failures > 0 {
            warn!(
                failed = report.teardown_failures,
                "some actors survived teardown"
            );
        }

        let outcome = match &result {
            Ok(()) if report.interrupted => OUTCOME_INTERRUPTED.to_string(),
            Ok(()) => OUTCOME_COMPLETED.to_string(),
            Err(e) => e.to_string(),
        };
        self.stats.record_run(result.is_ok());
        record_run_finished(match &result {
            Ok(()) if report.interrupted => OUTCOME_INTERRUPTED,
            Ok(()) => OUTCOME_COMPLETED,
            Err(_) => "failed",
        });

        let written = if self.blueprint.output.write_run_metadata && report.dir.is_dir() {
            let metadata = report.metadata(&self.params, started_at, now_rfc3339(), outcome);
            write_metadata(&report.dir, &metadata)
        } else {
            Ok(())
        };

        if let Err(e) = &result {
            if let Err(meta) = &written {
                warn!(error = %meta, "run.json not written");
            }
            error!(error = %e, "run failed");
        }
        result?;
        written?;

        info!(
            frames = report.frames_recorded,
            timeouts = report.timeouts,
            late = report.late_discarded,
            interrupted = report.interrupted,
            dir = %report.dir.display(),
            "run finished"
        );
        Ok(report)
    }

    /// Synchronized capture for one spawned rig; always ends synchronization
    async fn record(&mut self, graph: &RuntimeGraph, report: &mut RunReport) -> Result<()> {
        let camera = graph
            .sensor(RGB_SENSOR_ID)
            .map(|s| s.actor_id)
            .ok_or_else(|| ActorFactoryError::simulator("camera rig has no rgb camera"))?;
        let sources = self.factory.sensor_sources(graph)?;
        let mut sinks = RunSinks::create(&report.dir, self.blueprint.output.log_frames)?;

        let client = self.factory.client();
        let mut sync =
            match TickSynchronizer::begin(client, sources, self.blueprint.sync.fps).await {
                Ok(sync) => sync,
                Err(e) => {
                    if let Err(closed) = sinks.close().await {
                        warn!(error = %closed, "failed to close sinks");
                    }
                    return Err(e.into());
                }
            };

        let ctx = LoopContext {
            client,
            camera,
            processor: &self.processor,
            frames_per_run: self.blueprint.run.frames_per_run,
            warmup_ticks: self.blueprint.run.warmup_ticks,
            timeout: self.blueprint.sync.timeout(),
            policy: self.blueprint.sync.on_timeout,
            run_name: run_dir_name(report.spawn_ordinal, report.run_ordinal),
            shutdown: &self.shutdown,
        };

        let looped = match sinks.writer().write_focal(self.params.focal_length) {
            Ok(_) => capture_loop(&ctx, &mut sync, &mut sinks, &mut self.stats, report).await,
            Err(e) => Err(e.into()),
        };

        let closed = sinks.close().await;
        let ended = sync.end().await;
        report.late_discarded = sync.stats().late_discarded;

        if let Err(e) = &ended {
            error!(error = %e, "failed to restore world settings");
        }
        looped?;
        closed?;
        ended?;
        Ok(())
    }

    fn camera_jitter(&self) -> (f64, f64) {
        let camera = &self.blueprint.camera;
        let mut rng = rand::rng();
        (
            rng.random_range(-camera.y_jitter..=camera.y_jitter),
            rng.random_range(-camera.z_jitter..=camera.z_jitter),
        )
    }
}

async fn capture_loop<C: SimulatorClient>(
    ctx: &LoopContext<'_, C>,
    sync: &mut TickSynchronizer<'_, C>,
    sinks: &mut RunSinks,
    stats: &mut CaptureStatsAggregator,
    report: &mut RunReport,
) -> Result<()> {
    for sequence in 0..ctx.frames_per_run {
        if ctx.shutdown.is_requested() {
            info!(sequence, run = %ctx.run_name, "shutdown requested, stopping run");
            report.interrupted = true;
            break;
        }

        let synced = match sync.advance(ctx.timeout).await {
            Ok(synced) => synced,
            Err(SyncError::Timeout {
                sensor_id,
                tick,
                waited,
            }) if ctx.policy == TimeoutPolicy::Skip => {
                warn!(sequence, sensor_id = %sensor_id, tick = %tick, ?waited, "tick timed out, skipped");
                report.timeouts += 1;
                stats.record_timeout(&sensor_id);
                record_timeout(&sensor_id);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if sequence < ctx.warmup_ticks {
            debug!(sequence, tick = %synced.tick, "warm-up tick");
            report.warmup_ticks += 1;
            stats.record_warmup();
            record_warmup_tick();
            continue;
        }

        let started = Instant::now();
        let (frame, foreground) = build_frame(ctx, &synced, sequence).await?;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        sinks.write(&frame).await?;

        report.frames_recorded += 1;
        report.note_tick(synced.tick);
        stats.record_frame(foreground, elapsed_ms);
        record_frame_captured(&ctx.run_name, foreground);
        record_postprocess_ms(elapsed_ms);
    }
    Ok(())
}

/// Post-process one synced tick and attach the camera's world pose
async fn build_frame<C: SimulatorClient>(
    ctx: &LoopContext<'_, C>,
    synced: &SyncedTick,
    sequence: u64,
) -> Result<(CapturedFrame, f64)> {
    let rgb = camera_image(synced, RGB_SENSOR_ID)?;
    let depth = camera_image(synced, DEPTH_SENSOR_ID)?;
    let semseg = camera_image(synced, SEMSEG_SENSOR_ID)?;

    let processed = ctx
        .processor
        .process(rgb, depth, semseg)
        .map_err(|source| SessionError::Postprocess {
            tick: synced.tick,
            source,
        })?;
    let foreground = processed.foreground_ratio;
    let camera_pose = ctx.client.actor_transform(ctx.camera).await?;

    let frame = CapturedFrame {
        sequence,
        tick: synced.tick,
        timestamp: synced.elapsed_seconds().unwrap_or_default(),
        camera_pose,
        outputs: processed.into_outputs(),
    };
    Ok((frame, foreground))
}

fn write_metadata(dir: &Path, metadata: &RunMetadata) -> Result<()> {
    RunWriter::create(dir, &[])?.write_metadata(metadata)?;
    Ok(())
}

fn now_rfc3339() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}
