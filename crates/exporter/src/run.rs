//! RunWriter - one run folder
//!
//! ```text
//! <session>/<spawn>_<run>/
//!     rgb/ masked_rgb/ depth/ semseg/ semseg_masked/
//!     camera.txt   one pose row per captured tick
//!     focal.txt    focal length in pixels
//!     run.json     run metadata
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use contracts::{CapturedFrame, Location, Modality, SensorPayload, Tick, Transform};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{ExportError, Result};
use crate::format::{pose_line, sci};
use crate::image_io::save_png;
use crate::layout::{CAMERA_FILE, FOCAL_FILE, RUN_METADATA_FILE};
use crate::pointcloud_io::write_ply;

/// Run metadata, written as `run.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub map: String,
    /// Index into the map's spawn points
    pub spawn_index: usize,
    pub spawn_ordinal: usize,
    pub run_ordinal: usize,
    /// Camera mount relative to the vehicle, jitter included
    pub camera_offset: Location,
    pub image_width: u32,
    pub image_height: u32,
    pub fov: f64,
    pub focal_length: f64,
    pub fps: f64,
    pub warmup_ticks: u64,
    pub frames_per_run: u64,
    pub frames_recorded: u64,
    pub timeouts: u64,
    pub late_discarded: u64,
    pub first_tick: Option<Tick>,
    pub last_tick: Option<Tick>,
    /// RFC 3339
    pub started_at: String,
    pub finished_at: String,
    /// `completed`, or the error that ended the run
    pub outcome: String,
}

/// Writes the files of one run folder
#[derive(Debug)]
pub struct RunWriter {
    dir: PathBuf,
    modalities: Vec<Modality>,
    poses: Vec<[f64; 6]>,
    frames_written: u64,
}

impl RunWriter {
    /// Create the run folder and one subfolder per modality
    pub fn create(dir: impl Into<PathBuf>, modalities: &[Modality]) -> Result<Self> {
        let dir = dir.into();
        for modality in modalities {
            let sub = dir.join(modality.dir_name());
            fs::create_dir_all(&sub).map_err(|e| ExportError::io(&sub, e))?;
        }
        fs::create_dir_all(&dir).map_err(|e| ExportError::io(&dir, e))?;
        debug!(dir = %dir.display(), ?modalities, "run folder created");

        Ok(Self {
            dir,
            modalities: modalities.to_vec(),
            poses: Vec::new(),
            frames_written: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn modalities(&self) -> &[Modality] {
        &self.modalities
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn poses(&self) -> &[[f64; 6]] {
        &self.poses
    }

    /// Write `focal.txt`
    pub fn write_focal(&self, focal: f64) -> Result<PathBuf> {
        let path = self.dir.join(FOCAL_FILE);
        fs::write(&path, format!("{}\n", sci(focal))).map_err(|e| ExportError::io(&path, e))?;
        Ok(path)
    }

    /// Persist every output of `frame` and remember its camera pose
    pub fn write_frame(&mut self, frame: &CapturedFrame) -> Result<()> {
        for (modality, payload) in &frame.outputs {
            if !self.modalities.contains(modality) {
                trace!(?modality, sequence = frame.sequence, "modality not exported");
                continue;
            }
            let path = self
                .dir
                .join(modality.dir_name())
                .join(modality.file_name(frame.sequence));
            match payload {
                SensorPayload::Image(image) => save_png(&path, image)?,
                SensorPayload::PointCloud(cloud) => {
                    let points = cloud
                        .points()
                        .ok_or(ExportError::UnsupportedPayload {
                            modality: *modality,
                        })?;
                    write_ply(&path, &points)?;
                }
                _ => {
                    return Err(ExportError::UnsupportedPayload {
                        modality: *modality,
                    });
                }
            }
        }

        self.record_pose(frame.camera_pose);
        self.frames_written += 1;
        Ok(())
    }

    pub fn record_pose(&mut self, pose: Transform) {
        self.poses.push(pose.pose_row());
    }

    /// Write `camera.txt`, one `x y z roll yaw pitch` row per recorded pose
    pub fn write_pose_table(&self) -> Result<PathBuf> {
        let path = self.dir.join(CAMERA_FILE);
        let mut text = String::new();
        for row in &self.poses {
            text.push_str(&pose_line(row));
            text.push('\n');
        }
        fs::write(&path, text).map_err(|e| ExportError::io(&path, e))?;
        debug!(path = %path.display(), rows = self.poses.len(), "pose table written");
        Ok(path)
    }

    /// Write `run.json`
    pub fn write_metadata(&self, metadata: &RunMetadata) -> Result<PathBuf> {
        let path = self.dir.join(RUN_METADATA_FILE);
        let json = serde_json::to_vec_pretty(metadata)?;
        fs::write(&path, json).map_err(|e| ExportError::io(&path, e))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use contracts::{ImageData, ImageFormat, Rotation};
    use tempfile::tempdir;

    use super::*;

    fn frame(sequence: u64, x: f64) -> CapturedFrame {
        let image = ImageData {
            width: 2,
            height: 2,
            format: ImageFormat::Bgra8,
            data: Bytes::from(vec![128u8; 16]),
        };
        CapturedFrame {
            sequence,
            tick: Tick::new(sequence + 100),
            timestamp: 0.0,
            camera_pose: Transform::new(
                Location::new(x, 2.0, 3.0),
                Rotation {
                    pitch: 0.5,
                    yaw: 90.0,
                    roll: -1.0,
                },
            ),
            outputs: vec![
                (Modality::Rgb, SensorPayload::Image(image.clone())),
                (Modality::MaskedRgb, SensorPayload::Image(image)),
            ],
        }
    }

    #[test]
    fn test_create_makes_modality_dirs() {
        let dir = tempdir().unwrap();
        let run = dir.path().join("1_1");
        RunWriter::create(&run, &[Modality::Rgb, Modality::Semseg]).unwrap();
        assert!(run.join("rgb").is_dir());
        assert!(run.join("semseg").is_dir());
        assert!(!run.join("depth").exists());
    }

    #[test]
    fn test_write_frame_names_files_by_sequence() {
        let dir = tempdir().unwrap();
        let mut writer =
            RunWriter::create(dir.path(), &[Modality::Rgb, Modality::MaskedRgb]).unwrap();
        writer.write_frame(&frame(10, 1.0)).unwrap();
        writer.write_frame(&frame(11, 1.5)).unwrap();

        assert!(dir.path().join("rgb/10.png").is_file());
        assert!(dir.path().join("masked_rgb/11_masked.png").is_file());
        assert_eq!(writer.frames_written(), 2);
    }

    #[test]
    fn test_unselected_modality_skipped() {
        let dir = tempdir().unwrap();
        let mut writer = RunWriter::create(dir.path(), &[Modality::Rgb]).unwrap();
        writer.write_frame(&frame(3, 0.0)).unwrap();
        assert!(dir.path().join("rgb/3.png").is_file());
        assert!(!dir.path().join("masked_rgb").exists());
    }

    #[test]
    fn test_pose_table_format() {
        let dir = tempdir().unwrap();
        let mut writer = RunWriter::create(dir.path(), &[]).unwrap();
        writer.write_frame(&frame(0, 1.0)).unwrap();
        writer.write_frame(&frame(1, 1.5)).unwrap();
        let path = writer.write_pose_table().unwrap();

        let text = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "1.000000000000000000e+00 2.000000000000000000e+00 3.000000000000000000e+00 \
             -1.000000000000000000e+00 9.000000000000000000e+01 5.000000000000000000e-01"
        );
        assert!(lines[1].starts_with("1.500000000000000000e+00 "));
    }

    #[test]
    fn test_focal_file() {
        let dir = tempdir().unwrap();
        let writer = RunWriter::create(dir.path(), &[]).unwrap();
        let path = writer.write_focal(640.0).unwrap();
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "6.400000000000000000e+02\n"
        );
    }

    #[test]
    fn test_metadata_json() {
        let dir = tempdir().unwrap();
        let writer = RunWriter::create(dir.path(), &[]).unwrap();
        let metadata = RunMetadata {
            map: "Town03".into(),
            spawn_index: 221,
            spawn_ordinal: 1,
            run_ordinal: 2,
            camera_offset: Location::new(1.5, 0.3, 2.4),
            image_width: 1280,
            image_height: 720,
            fov: 120.0,
            focal_length: 369.5,
            fps: 30.0,
            warmup_ticks: 10,
            frames_per_run: 110,
            frames_recorded: 100,
            timeouts: 0,
            late_discarded: 0,
            first_tick: Some(Tick::new(11)),
            last_tick: Some(Tick::new(110)),
            started_at: "2024-08-24T13:30:13+02:00".into(),
            finished_at: "2024-08-24T13:30:20+02:00".into(),
            outcome: "completed".into(),
        };
        let path = writer.write_metadata(&metadata).unwrap();
        let back: RunMetadata =
            serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(back, metadata);
    }
}
