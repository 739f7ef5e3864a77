//! 深度解码
//!
//! CARLA 深度相机把归一化深度编码进 BGRA 的 R/G/B 三个字节：
//! `(R + G·256 + B·256²) / (256³ − 1)`。

use bytes::Bytes;
use contracts::{ImageData, ImageFormat};

use crate::error::{PostprocessError, Result};

/// 256³ − 1
const DEPTH_DENOMINATOR: f32 = 16_777_215.0;

/// Divisor of the natural log in the grayscale preview (ln(1/300) ≈ −5.70378)
const LOG_DEPTH_DIVISOR: f32 = 5.70378;

/// 单通道深度图，行优先
///
/// 非有限值（NaN、±inf）表示无数据。
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl DepthMap {
    /// 由原始值构建；长度必须等于 `width * height`
    pub fn from_values(width: u32, height: u32, values: Vec<f32>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(PostprocessError::MalformedImage {
                what: "depth values",
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// 解码 CARLA 深度图像，归一化深度乘以 `scale`
    ///
    /// 采集时 `scale = 255`，得到按比例缩放的距离。
    pub fn from_bgra(image: &ImageData, scale: f32) -> Result<Self> {
        check_bgra(image, "depth")?;
        let values = image
            .data
            .chunks_exact(4)
            .map(|px| normalized_depth(px[0], px[1], px[2]) * scale)
            .collect();
        Ok(Self {
            width: image.width,
            height: image.height,
            values,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// 单个像素的归一化深度 [0, 1]
pub fn normalized_depth(b: u8, g: u8, r: u8) -> f32 {
    let encoded = r as u32 + (g as u32) * 256 + (b as u32) * 65_536;
    encoded as f32 / DEPTH_DENOMINATOR
}

/// 对数灰度预览：`1 + ln(n) / 5.70378`，截断到 [0, 1] 后乘 255
pub fn log_grayscale(image: &ImageData) -> Result<ImageData> {
    check_bgra(image, "depth")?;
    let gray: Vec<u8> = image
        .data
        .chunks_exact(4)
        .map(|px| {
            let n = normalized_depth(px[0], px[1], px[2]);
            let v = (1.0 + n.ln() / LOG_DEPTH_DIVISOR).clamp(0.0, 1.0);
            (v * 255.0).round() as u8
        })
        .collect();

    Ok(ImageData {
        width: image.width,
        height: image.height,
        format: ImageFormat::Gray8,
        data: Bytes::from(gray),
    })
}

pub(crate) fn check_bgra(image: &ImageData, what: &'static str) -> Result<()> {
    if image.format != ImageFormat::Bgra8 {
        return Err(PostprocessError::UnsupportedFormat {
            what,
            format: image.format,
        });
    }
    check_well_formed(image, what)
}

pub(crate) fn check_well_formed(image: &ImageData, what: &'static str) -> Result<()> {
    if !image.is_well_formed() {
        return Err(PostprocessError::MalformedImage {
            what,
            expected: image.pixel_count() * image.format.channels(),
            actual: image.data.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bgra(pixels: &[[u8; 4]], width: u32, height: u32) -> ImageData {
        ImageData {
            width,
            height,
            format: ImageFormat::Bgra8,
            data: Bytes::from(pixels.iter().flatten().copied().collect::<Vec<u8>>()),
        }
    }

    #[test]
    fn test_normalized_depth_extremes() {
        assert_eq!(normalized_depth(0, 0, 0), 0.0);
        assert_eq!(normalized_depth(255, 255, 255), 1.0);
        // R carries the least significant byte
        assert!(normalized_depth(0, 0, 1) < normalized_depth(0, 1, 0));
        assert!(normalized_depth(0, 1, 0) < normalized_depth(1, 0, 0));
    }

    #[test]
    fn test_from_bgra_scales() {
        let image = bgra(&[[255, 255, 255, 255], [0, 0, 0, 255]], 2, 1);
        let depth = DepthMap::from_bgra(&image, 255.0).unwrap();
        assert_eq!(depth.values(), &[255.0, 0.0]);
        assert_eq!(depth.get(0, 0), Some(255.0));
        assert_eq!(depth.get(2, 0), None);
    }

    #[test]
    fn test_from_bgra_rejects_other_formats() {
        let image = ImageData {
            width: 1,
            height: 1,
            format: ImageFormat::Rgb8,
            data: Bytes::from_static(&[0, 0, 0]),
        };
        assert!(matches!(
            DepthMap::from_bgra(&image, 1.0),
            Err(PostprocessError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_from_bgra_rejects_truncated_buffer() {
        let image = ImageData {
            width: 2,
            height: 2,
            format: ImageFormat::Bgra8,
            data: Bytes::from_static(&[0; 12]),
        };
        assert!(matches!(
            DepthMap::from_bgra(&image, 1.0),
            Err(PostprocessError::MalformedImage {
                expected: 16,
                actual: 12,
                ..
            })
        ));
    }

    #[test]
    fn test_log_grayscale() {
        // far plane → white, zero depth → black
        let image = bgra(&[[255, 255, 255, 255], [0, 0, 0, 255]], 2, 1);
        let gray = log_grayscale(&image).unwrap();
        assert_eq!(gray.format, ImageFormat::Gray8);
        assert_eq!(gray.data.as_ref(), &[255, 0]);
    }

    #[test]
    fn test_from_values_checks_length() {
        assert!(DepthMap::from_values(2, 2, vec![1.0; 3]).is_err());
        assert_eq!(DepthMap::from_values(2, 2, vec![1.0; 4]).unwrap().len(), 4);
    }
}
