//! 语义分割调色板与门控
//!
//! CARLA 原始分割图把类别标签放在 R 通道（BGRA 的第 3 个字节）。

use bytes::Bytes;
use contracts::{ImageData, ImageFormat};

use crate::depth::{check_bgra, check_well_formed};
use crate::error::{PostprocessError, Result};
use crate::mask::{apply_mask, ForegroundMask};

/// Cityscapes colors indexed by CARLA semantic tag (RGB)
pub const CITYSCAPES_PALETTE: [[u8; 3]; 13] = [
    [0, 0, 0],       // unlabeled
    [70, 70, 70],    // building
    [190, 153, 153], // fence
    [250, 170, 160], // other
    [220, 20, 60],   // pedestrian
    [153, 153, 153], // pole
    [157, 234, 50],  // road line
    [128, 64, 128],  // road
    [244, 35, 232],  // sidewalk
    [107, 142, 35],  // vegetation
    [0, 0, 142],     // vehicle
    [102, 102, 156], // wall
    [220, 220, 0],   // traffic sign
];

/// Color of an unlabeled pixel
pub const UNLABELED_COLOR: [u8; 3] = CITYSCAPES_PALETTE[0];

/// 标签对应的颜色，未知标签按未标注处理
pub fn tag_color(tag: u8) -> [u8; 3] {
    CITYSCAPES_PALETTE
        .get(tag as usize)
        .copied()
        .unwrap_or(UNLABELED_COLOR)
}

/// 把原始分割图渲染为 cityscapes 调色板图像 (Rgb8)
pub fn cityscapes_palette(raw: &ImageData) -> Result<ImageData> {
    check_bgra(raw, "segmentation")?;
    let data: Vec<u8> = raw
        .data
        .chunks_exact(4)
        .flat_map(|px| tag_color(px[2]))
        .collect();

    Ok(ImageData {
        width: raw.width,
        height: raw.height,
        format: ImageFormat::Rgb8,
        data: Bytes::from(data),
    })
}

/// 门控：像素颜色不等于保留的 "未标注" 颜色时为 1
pub fn segmentation_gate(palette: &ImageData, reserved: [u8; 3]) -> Result<ForegroundMask> {
    check_well_formed(palette, "segmentation palette")?;
    let rgb_order = match palette.format {
        ImageFormat::Rgb8 | ImageFormat::Rgba8 => [0, 1, 2],
        ImageFormat::Bgra8 => [2, 1, 0],
        format => {
            return Err(PostprocessError::UnsupportedFormat {
                what: "segmentation palette",
                format,
            });
        }
    };

    let bits = palette
        .data
        .chunks_exact(palette.format.channels())
        .map(|px| {
            let color = [px[rgb_order[0]], px[rgb_order[1]], px[rgb_order[2]]];
            u8::from(color != reserved)
        })
        .collect();
    ForegroundMask::from_bits(palette.width, palette.height, bits)
}

/// 门控与掩码后的 RGB 相乘（门控复制到所有通道）
pub fn apply_gate(masked_rgb: &ImageData, gate: &ForegroundMask) -> Result<ImageData> {
    apply_mask(masked_rgb, gate)
}
