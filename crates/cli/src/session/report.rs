//! Run and session reports

use std::path::PathBuf;

use contracts::{Location, Tick};
use exporter::RunMetadata;
use observability::CaptureSummary;

/// Outcome string stored in `run.json` for a run that captured every tick
pub const OUTCOME_COMPLETED: &str = "completed";

/// Outcome string for a run stopped early by a shutdown request
pub const OUTCOME_INTERRUPTED: &str = "interrupted";

/// Counters of one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub dir: PathBuf,
    pub spawn_index: usize,
    pub spawn_ordinal: usize,
    pub run_ordinal: usize,
    pub camera_offset: Location,
    /// Ticks that produced outputs
    pub frames_recorded: u64,
    /// Ticks consumed by warm-up
    pub warmup_ticks: u64,
    /// Ticks skipped after a timeout
    pub timeouts: u64,
    /// Late records dropped by the synchronizer
    pub late_discarded: u64,
    pub first_tick: Option<Tick>,
    pub last_tick: Option<Tick>,
    /// Actors that could not be destroyed
    pub teardown_failures: usize,
    /// Stopped by a shutdown request before `frames_per_run` ticks
    pub interrupted: bool,
}

impl RunReport {
    pub(crate) fn note_tick(&mut self, tick: Tick) {
        self.first_tick.get_or_insert(tick);
        self.last_tick = Some(tick);
    }

    pub(crate) fn metadata(
        &self,
        session: &SessionParams,
        started_at: String,
        finished_at: String,
        outcome: String,
    ) -> RunMetadata {
        RunMetadata {
            map: session.map.clone(),
            spawn_index: self.spawn_index,
            spawn_ordinal: self.spawn_ordinal,
            run_ordinal: self.run_ordinal,
            camera_offset: self.camera_offset,
            image_width: session.image_width,
            image_height: session.image_height,
            fov: session.fov,
            focal_length: session.focal_length,
            fps: session.fps,
            warmup_ticks: session.warmup_ticks,
            frames_per_run: session.frames_per_run,
            frames_recorded: self.frames_recorded,
            timeouts: self.timeouts,
            late_discarded: self.late_discarded,
            first_tick: self.first_tick,
            last_tick: self.last_tick,
            started_at,
            finished_at,
            outcome,
        }
    }
}

/// Settings shared by every run of a session, copied into `run.json`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SessionParams {
    pub map: String,
    pub image_width: u32,
    pub image_height: u32,
    pub fov: f64,
    pub focal_length: f64,
    pub fps: f64,
    pub warmup_ticks: u64,
    pub frames_per_run: u64,
}

/// Result of a full session
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_dir: PathBuf,
    pub runs: Vec<RunReport>,
    pub summary: CaptureSummary,
    /// A shutdown request ended the session early
    pub interrupted: bool,
}

impl SessionReport {
    pub fn frames_recorded(&self) -> u64 {
        self.runs.iter().map(|r| r.frames_recorded).sum()
    }
}
