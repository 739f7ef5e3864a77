//! # Postprocess
//!
//! 相机帧后处理：
//! - 深度解码与对数灰度预览
//! - 深度前景掩码与掩码后的 RGB
//! - cityscapes 调色板与语义门控
//! - 激光雷达点云平移、累积与镜像
//! - 相机焦距

mod camera;
mod depth;
mod error;
mod mask;
mod pointcloud;
mod processor;
mod segmentation;

pub use camera::focal_length;
pub use depth::{log_grayscale, normalized_depth, DepthMap};
pub use error::{PostprocessError, Result};
pub use mask::{
    apply_mask, depth_mask, depth_mask_with_threshold, DepthMaskResult, ForegroundMask,
    MaskParams,
};
pub use pointcloud::{mirror_y, translate, PointCloudAccumulator};
pub use processor::{FrameProcessor, ProcessedImages};
pub use segmentation::{
    apply_gate, cityscapes_palette, segmentation_gate, tag_color, CITYSCAPES_PALETTE,
    UNLABELED_COLOR,
};
