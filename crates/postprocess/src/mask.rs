//! 深度前景掩码
//!
//! 反复剔除距离最大值一个单位以内的像素，去掉天空和远景；
//! 剩余最大值作为阈值，原始深度超过阈值的像素被遮住。

use bytes::Bytes;
use contracts::{ImageData, PostprocessConfig};
use tracing::{debug, trace};

use crate::depth::{check_well_formed, DepthMap};
use crate::error::{PostprocessError, Result};

/// 掩码参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskParams {
    /// 最多剔除轮数
    pub clip_rounds: usize,
    /// 全部剔除时回退的轮数
    pub lookback: usize,
    /// 低于该值的近处像素不参与阈值计算
    pub min_depth: f32,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            clip_rounds: 20,
            lookback: 5,
            min_depth: 3.0,
        }
    }
}

impl From<&PostprocessConfig> for MaskParams {
    fn from(config: &PostprocessConfig) -> Self {
        Self {
            clip_rounds: config.clip_rounds,
            lookback: config.lookback,
            min_depth: config.min_depth,
        }
    }
}

/// 二值掩码：1 保留，0 遮住
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundMask {
    width: u32,
    height: u32,
    bits: Vec<u8>,
}

impl ForegroundMask {
    pub fn from_bits(width: u32, height: u32, bits: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if bits.len() != expected {
            return Err(PostprocessError::MalformedImage {
                what: "mask",
                expected,
                actual: bits.len(),
            });
        }
        Ok(Self {
            width,
            height,
            bits: bits.into_iter().map(|b| u8::from(b != 0)).collect(),
        })
    }

    pub fn filled(width: u32, height: u32, value: bool) -> Self {
        Self {
            width,
            height,
            bits: vec![u8::from(value); width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    pub fn is_set(&self, x: u32, y: u32) -> bool {
        x < self.width
            && y < self.height
            && self.bits[y as usize * self.width as usize + x as usize] == 1
    }

    /// 保留像素数
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b == 1).count()
    }

    /// 保留像素占比，空掩码为 0
    pub fn coverage(&self) -> f64 {
        if self.bits.is_empty() {
            0.0
        } else {
            self.count() as f64 / self.bits.len() as f64
        }
    }

    /// 逐像素与
    pub fn and(&self, other: &ForegroundMask) -> Result<ForegroundMask> {
        same_size("mask", (self.width, self.height), (other.width, other.height))?;
        Ok(Self {
            width: self.width,
            height: self.height,
            bits: self
                .bits
                .iter()
                .zip(&other.bits)
                .map(|(a, b)| a & b)
                .collect(),
        })
    }
}

/// 深度掩码及其阈值
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMaskResult {
    pub mask: ForegroundMask,
    /// 全部无数据时为 None
    pub threshold: Option<f32>,
    /// 实际生效的剔除轮数（回退之后）
    pub rounds: usize,
}

/// 由深度图计算前景掩码
pub fn depth_mask(depth: &DepthMap, params: &MaskParams) -> ForegroundMask {
    depth_mask_with_threshold(depth, params).mask
}

/// 同 [`depth_mask`]，另外返回阈值和生效轮数
pub fn depth_mask_with_threshold(depth: &DepthMap, params: &MaskParams) -> DepthMaskResult {
    let values = depth.values();
    let initial: Vec<bool> = values.iter().map(|v| v.is_finite()).collect();

    if !initial.iter().any(|&keep| keep) {
        debug!("depth map holds no data; mask is empty");
        return DepthMaskResult {
            mask: ForegroundMask::filled(depth.width(), depth.height(), false),
            threshold: None,
            rounds: 0,
        };
    }

    // history[k] = included set after k rounds
    let mut history = vec![initial];
    for round in 1..=params.clip_rounds {
        let current = &history[history.len() - 1];
        let Some(max) = masked_max(values, current) else {
            break;
        };
        let cut = (max - 1.0).floor();
        let next: Vec<bool> = current
            .iter()
            .zip(values)
            .map(|(&keep, &v)| keep && v <= cut)
            .collect();

        if !next.iter().any(|&keep| keep) {
            // `lookback` rounds back from the failing round `completed + 1`
            let completed = history.len() - 1;
            let rollback = if completed + 1 >= params.lookback {
                completed + 1 - params.lookback
            } else {
                completed
            };
            trace!(round, completed, rollback, "clipping would empty the map");
            history.truncate(rollback + 1);
            break;
        }
        history.push(next);
    }

    let rounds = history.len() - 1;
    let mut included = history.pop().unwrap_or_default();

    let near_clipped: Vec<bool> = included
        .iter()
        .zip(values)
        .map(|(&keep, &v)| keep && v >= params.min_depth)
        .collect();
    if near_clipped.iter().any(|&keep| keep) {
        included = near_clipped;
    } else {
        debug!(
            min_depth = params.min_depth,
            "near-depth exclusion skipped, it would remove every pixel"
        );
    }

    let threshold = masked_max(values, &included);
    let bits = match threshold {
        Some(t) => values
            .iter()
            .map(|&v| u8::from(v.is_finite() && v <= t))
            .collect(),
        None => vec![0; values.len()],
    };

    DepthMaskResult {
        mask: ForegroundMask {
            width: depth.width(),
            height: depth.height(),
            bits,
        },
        threshold,
        rounds,
    }
}

fn masked_max(values: &[f32], included: &[bool]) -> Option<f32> {
    values
        .iter()
        .zip(included)
        .filter(|&(_, &keep)| keep)
        .map(|(&v, _)| v)
        .reduce(f32::max)
}

/// 按掩码保留像素：掩码为 0 的像素所有通道置零
pub fn apply_mask(image: &ImageData, mask: &ForegroundMask) -> Result<ImageData> {
    check_well_formed(image, "image")?;
    same_size("mask", (image.width, image.height), (mask.width, mask.height))?;

    let channels = image.format.channels();
    let mut data = image.data.to_vec();
    for (pixel, &bit) in data.chunks_exact_mut(channels).zip(&mask.bits) {
        if bit == 0 {
            pixel.fill(0);
        }
    }

    Ok(ImageData {
        width: image.width,
        height: image.height,
        format: image.format,
        data: Bytes::from(data),
    })
}

pub(crate) fn same_size(what: &'static str, expected: (u32, u32), actual: (u32, u32)) -> Result<()> {
    if expected != actual {
        return Err(PostprocessError::DimensionMismatch {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use contracts::ImageFormat;

    use super::*;

    fn map(width: u32, height: u32, values: &[f32]) -> DepthMap {
        DepthMap::from_values(width, height, values.to_vec()).unwrap()
    }

    #[test]
    fn test_outlier_removed_in_first_round() {
        #[rustfmt::skip]
        let depth = map(4, 4, &[
            1.0, 1.0, 1.0, 1.0,
            1.0, 1.0, 1.0, 50.0,
            1.0, 1.0, 1.0, 1.0,
            1.0, 1.0, 1.0, 1.0,
        ]);
        let result = depth_mask_with_threshold(&depth, &MaskParams::default());

        assert_eq!(result.threshold, Some(1.0));
        assert_eq!(result.rounds, 1);
        assert!(!result.mask.is_set(3, 1));
        assert_eq!(result.mask.count(), 15);
    }

    #[test]
    fn test_mask_is_idempotent_on_thresholded_input() {
        #[rustfmt::skip]
        let depth = map(4, 4, &[
            1.0, 1.0, 1.0, 1.0,
            1.0, 1.0, 1.0, 50.0,
            1.0, 1.0, 1.0, 1.0,
            1.0, 1.0, 1.0, 1.0,
        ]);
        let params = MaskParams::default();
        let first = depth_mask(&depth, &params);

        let thresholded: Vec<f32> = depth
            .values()
            .iter()
            .zip(first.bits())
            .map(|(&v, &b)| if b == 1 { v } else { f32::NAN })
            .collect();
        let second = depth_mask(&map(4, 4, &thresholded), &params);
        assert_eq!(first, second);
    }

    #[test]
    fn test_all_no_data_yields_empty_mask() {
        let depth = map(2, 2, &[f32::NAN, f32::INFINITY, f32::NAN, f32::NEG_INFINITY]);
        let result = depth_mask_with_threshold(&depth, &MaskParams::default());
        assert_eq!(result.threshold, None);
        assert_eq!(result.mask.count(), 0);
    }

    #[test]
    fn test_no_data_pixels_are_masked() {
        let depth = map(3, 1, &[5.0, f32::NAN, 5.0]);
        let mask = depth_mask(&depth, &MaskParams::default());
        assert_eq!(mask.bits(), &[1, 0, 1]);
    }

    #[test]
    fn test_sky_and_far_background_removed() {
        // sky at 255, a wall at 40, road between 4 and 9, obstacle at 3.5
        let mut values = vec![255.0; 4];
        values.extend([40.0; 4]);
        values.extend([4.0, 5.0, 6.0, 9.0]);
        values.extend([3.5, 3.5, 8.0, 8.0]);
        let depth = map(4, 4, &values);

        let result = depth_mask_with_threshold(&depth, &MaskParams::default());
        let t = result.threshold.unwrap();
        assert!(t < 40.0, "threshold {t} should drop the wall");
        assert!(t >= 3.5);
        for x in 0..4 {
            assert!(!result.mask.is_set(x, 0));
            assert!(!result.mask.is_set(x, 1));
        }
        assert!(result.mask.is_set(0, 3));
    }

    /// Mask of levels `1..=n` with min depth off: (rounds, threshold, kept)
    fn staircase(n: u8) -> (usize, Option<f32>, usize) {
        let values: Vec<f32> = (1..=n).map(f32::from).collect();
        let depth = map(u32::from(n), 1, &values);
        let params = MaskParams {
            clip_rounds: 20,
            lookback: 5,
            min_depth: 0.0,
        };
        let result = depth_mask_with_threshold(&depth, &params);
        (result.rounds, result.threshold, result.mask.count())
    }

    #[test]
    fn test_rollback_falls_back_to_prior_round() {
        // 3 rounds succeed, the 4th would empty: keep round 3
        assert_eq!(staircase(4), (3, Some(1.0), 1));
    }

    #[test]
    fn test_rollback_counts_from_failing_round() {
        // n levels: n - 1 rounds succeed, round n would empty,
        // so the kept state is round n - 5
        assert_eq!(staircase(5), (0, Some(5.0), 5));
        assert_eq!(staircase(6), (1, Some(5.0), 5));
        assert_eq!(staircase(7), (2, Some(5.0), 5));
        assert_eq!(staircase(8), (3, Some(5.0), 5));
    }

    #[test]
    fn test_rollback_keeps_near_levels_only() {
        let values: Vec<f32> = (1..=8).map(|v| v as f32).collect();
        let depth = map(8, 1, &values);
        let params = MaskParams {
            clip_rounds: 20,
            lookback: 5,
            min_depth: 0.0,
        };
        let result = depth_mask_with_threshold(&depth, &params);
        assert_eq!(result.mask.bits(), &[1, 1, 1, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn test_min_depth_exclusion_skipped_when_everything_is_near() {
        let depth = map(2, 1, &[1.0, 2.0]);
        let result = depth_mask_with_threshold(&depth, &MaskParams::default());
        // one round drops 2.0, the next would empty; min depth 3 would also empty
        assert_eq!(result.threshold, Some(1.0));
        assert_eq!(result.mask.bits(), &[1, 0]);
    }

    #[test]
    fn test_apply_mask_identity_and_zero() {
        let image = ImageData {
            width: 2,
            height: 1,
            format: ImageFormat::Bgra8,
            data: Bytes::from_static(&[10, 20, 30, 255, 40, 50, 60, 255]),
        };

        let ones = ForegroundMask::filled(2, 1, true);
        assert_eq!(apply_mask(&image, &ones).unwrap(), image);

        let zeros = ForegroundMask::filled(2, 1, false);
        let masked = apply_mask(&image, &zeros).unwrap();
        assert!(masked.data.iter().all(|&b| b == 0));

        let half = ForegroundMask::from_bits(2, 1, vec![0, 1]).unwrap();
        let masked = apply_mask(&image, &half).unwrap();
        assert_eq!(masked.data.as_ref(), &[0, 0, 0, 0, 40, 50, 60, 255]);
    }

    #[test]
    fn test_apply_mask_size_mismatch() {
        let image = ImageData {
            width: 1,
            height: 1,
            format: ImageFormat::Rgb8,
            data: Bytes::from_static(&[1, 2, 3]),
        };
        let mask = ForegroundMask::filled(2, 1, true);
        assert!(matches!(
            apply_mask(&image, &mask),
            Err(PostprocessError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_params_from_config() {
        let config = PostprocessConfig::default();
        assert_eq!(MaskParams::from(&config), MaskParams::default());
    }
}
