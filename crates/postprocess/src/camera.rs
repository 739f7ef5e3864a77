//! Pinhole intrinsics

/// Focal length in pixels of a camera `width` pixels wide with horizontal `fov_deg`
pub fn focal_length(width: u32, fov_deg: f64) -> f64 {
    width as f64 / (2.0 * (fov_deg * std::f64::consts::PI / 360.0).tan())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focal_length_90_degrees() {
        // tan(45°) = 1
        assert!((focal_length(1280, 90.0) - 640.0).abs() < 1e-9);
    }

    #[test]
    fn test_focal_length_default_camera() {
        // 1280 / (2·tan(60°)) = 369.504...
        let f = focal_length(1280, 120.0);
        assert!((f - 369.504_172_281_519_4).abs() < 1e-6);
    }
}
