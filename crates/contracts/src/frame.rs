//! CapturedFrame - post-processing output, sink input
//!
//! One captured tick worth of derived outputs plus the camera pose.

use serde::{Deserialize, Serialize};

use crate::{SensorPayload, Tick, Transform};

/// Output modality; each one is persisted under its own subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    /// Raw color image
    Rgb,
    /// Color image with far/near background removed by the depth mask
    MaskedRgb,
    /// Logarithmic depth preview
    Depth,
    /// Segmentation rendered with the cityscapes palette
    Semseg,
    /// Masked color image additionally gated by labeled segmentation
    SemsegMasked,
    /// Lidar sweep
    Lidar,
}

impl Modality {
    pub const ALL: [Modality; 6] = [
        Modality::Rgb,
        Modality::MaskedRgb,
        Modality::Depth,
        Modality::Semseg,
        Modality::SemsegMasked,
        Modality::Lidar,
    ];

    /// Subdirectory name inside a run folder
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Rgb => "rgb",
            Self::MaskedRgb => "masked_rgb",
            Self::Depth => "depth",
            Self::Semseg => "semseg",
            Self::SemsegMasked => "semseg_masked",
            Self::Lidar => "lidar",
        }
    }

    /// File name for the `sequence`-th captured tick
    pub fn file_name(self, sequence: u64) -> String {
        match self {
            Self::Rgb => format!("{sequence}.png"),
            Self::MaskedRgb => format!("{sequence}_masked.png"),
            Self::Depth => format!("{sequence}_depth.png"),
            Self::Semseg => format!("{sequence}_semseg.png"),
            Self::SemsegMasked => format!("{sequence}_semseg_masked.png"),
            Self::Lidar => format!("{sequence}.ply"),
        }
    }

    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.dir_name() == name)
    }
}

/// Derived outputs of one captured tick
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Tick-relative sequence number, used for file names
    pub sequence: u64,

    /// Simulator tick the outputs belong to
    pub tick: Tick,

    /// Simulation time (seconds)
    pub timestamp: f64,

    /// World pose of the capturing camera at this tick
    pub camera_pose: Transform,

    /// Outputs keyed by modality
    pub outputs: Vec<(Modality, SensorPayload)>,
}

impl CapturedFrame {
    pub fn output(&self, modality: Modality) -> Option<&SensorPayload> {
        self.outputs
            .iter()
            .find(|(m, _)| *m == modality)
            .map(|(_, payload)| payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        assert_eq!(Modality::Rgb.file_name(12), "12.png");
        assert_eq!(Modality::MaskedRgb.file_name(12), "12_masked.png");
        assert_eq!(Modality::SemsegMasked.file_name(3), "3_semseg_masked.png");
        assert_eq!(Modality::Lidar.file_name(0), "0.ply");
    }

    #[test]
    fn test_dir_name_round_trip() {
        for m in Modality::ALL {
            assert_eq!(Modality::from_dir_name(m.dir_name()), Some(m));
        }
        assert_eq!(Modality::from_dir_name("meta"), None);
    }
}
