//! Output directory naming

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

/// Pose table file name inside a run folder
pub const CAMERA_FILE: &str = "camera.txt";
/// Focal length file name inside a run folder
pub const FOCAL_FILE: &str = "focal.txt";
/// Run metadata file name inside a run folder
pub const RUN_METADATA_FILE: &str = "run.json";

/// Session folder name, `%m_%d_%H_%M_%S`
pub fn session_dir_name(started: NaiveDateTime) -> String {
    started.format("%m_%d_%H_%M_%S").to_string()
}

/// Run folder name, `{spawn_ordinal}_{run_ordinal}` (both 1-based)
pub fn run_dir_name(spawn_ordinal: usize, run_ordinal: usize) -> String {
    format!("{spawn_ordinal}_{run_ordinal}")
}

/// `base_dir/<session>` for a session started at `started`
pub fn session_dir(base_dir: &Path, started: NaiveDateTime) -> PathBuf {
    base_dir.join(session_dir_name(started))
}
