//! 单帧后处理流水线
//!
//! rgb + depth + semseg 三张原始图像 → 五种输出模态。

use contracts::{ImageData, Modality, PostprocessConfig, SensorPayload};
use tracing::trace;

use crate::depth::{check_bgra, log_grayscale, DepthMap};
use crate::error::Result;
use crate::mask::{apply_mask, depth_mask_with_threshold, same_size, MaskParams};
use crate::segmentation::{apply_gate, cityscapes_palette, segmentation_gate};

/// 一帧的全部派生图像
#[derive(Debug, Clone)]
pub struct ProcessedImages {
    pub rgb: ImageData,
    pub masked_rgb: ImageData,
    /// 对数深度预览
    pub depth: ImageData,
    pub semseg: ImageData,
    pub semseg_masked: ImageData,
    /// 深度阈值，无数据时为 None
    pub threshold: Option<f32>,
    /// 深度掩码保留的像素占比
    pub foreground_ratio: f64,
}

impl ProcessedImages {
    /// 按模态展开，顺序与输出目录一致
    pub fn into_outputs(self) -> Vec<(Modality, SensorPayload)> {
        vec![
            (Modality::Rgb, SensorPayload::Image(self.rgb)),
            (Modality::MaskedRgb, SensorPayload::Image(self.masked_rgb)),
            (Modality::Depth, SensorPayload::Image(self.depth)),
            (Modality::Semseg, SensorPayload::Image(self.semseg)),
            (Modality::SemsegMasked, SensorPayload::Image(self.semseg_masked)),
        ]
    }
}

/// 后处理器
#[derive(Debug, Clone)]
pub struct FrameProcessor {
    params: MaskParams,
    depth_scale: f32,
    unlabeled_color: [u8; 3],
}

impl FrameProcessor {
    pub fn new(config: &PostprocessConfig) -> Self {
        Self {
            params: MaskParams::from(config),
            depth_scale: config.depth_scale,
            unlabeled_color: config.unlabeled_color,
        }
    }

    pub fn mask_params(&self) -> &MaskParams {
        &self.params
    }

    /// 处理同一 tick 的三张相机图像（均为 BGRA，分辨率相同）
    pub fn process(
        &self,
        rgb: &ImageData,
        depth: &ImageData,
        semseg: &ImageData,
    ) -> Result<ProcessedImages> {
        check_bgra(rgb, "rgb")?;
        let size = (rgb.width, rgb.height);
        same_size("depth", size, (depth.width, depth.height))?;
        same_size("segmentation", size, (semseg.width, semseg.height))?;

        let depth_map = DepthMap::from_bgra(depth, self.depth_scale)?;
        let masked = depth_mask_with_threshold(&depth_map, &self.params);
        let masked_rgb = apply_mask(rgb, &masked.mask)?;

        let palette = cityscapes_palette(semseg)?;
        let gate = segmentation_gate(&palette, self.unlabeled_color)?;
        let semseg_masked = apply_gate(&masked_rgb, &gate)?;

        trace!(
            threshold = ?masked.threshold,
            rounds = masked.rounds,
            kept = masked.mask.count(),
            labeled = gate.count(),
            "frame post-processed"
        );

        Ok(ProcessedImages {
            rgb: rgb.clone(),
            masked_rgb,
            depth: log_grayscale(depth)?,
            semseg: palette,
            semseg_masked,
            threshold: masked.threshold,
            foreground_ratio: masked.mask.coverage(),
        })
    }
}

impl Default for FrameProcessor {
    fn default() -> Self {
        Self::new(&PostprocessConfig::default())
    }
}
