//! Point cloud helpers for the lidar sweep

use contracts::{LidarPoint, Location};

/// Shift every point by `offset`
pub fn translate(points: &[LidarPoint], offset: Location) -> Vec<LidarPoint> {
    points
        .iter()
        .map(|p| LidarPoint {
            x: p.x + offset.x as f32,
            y: p.y + offset.y as f32,
            z: p.z + offset.z as f32,
            intensity: p.intensity,
        })
        .collect()
}

/// Negate the y axis (CARLA is left-handed, most viewers are right-handed)
pub fn mirror_y(points: &[LidarPoint]) -> Vec<LidarPoint> {
    points
        .iter()
        .map(|p| LidarPoint { y: -p.y, ..*p })
        .collect()
}

/// Collects clouds from successive ticks into one
#[derive(Debug, Clone, Default)]
pub struct PointCloudAccumulator {
    points: Vec<LidarPoint>,
    clouds: usize,
}

impl PointCloudAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, points: &[LidarPoint]) {
        self.points.extend_from_slice(points);
        self.clouds += 1;
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of clouds added
    pub fn clouds(&self) -> usize {
        self.clouds
    }

    pub fn points(&self) -> &[LidarPoint] {
        &self.points
    }

    /// The accumulated cloud with y mirrored, ready for export
    pub fn mirrored(&self) -> Vec<LidarPoint> {
        mirror_y(&self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: f32, y: f32, z: f32) -> LidarPoint {
        LidarPoint {
            x,
            y,
            z,
            intensity: 0.5,
        }
    }

    #[test]
    fn test_translate_by_negated_location() {
        let spectator = Location::new(20.0, 0.0, 5.0);
        let moved = translate(&[point(21.0, 1.0, 5.0)], spectator.negated());
        assert_eq!(moved, vec![point(1.0, 1.0, 0.0)]);
    }

    #[test]
    fn test_accumulate_and_mirror() {
        let mut acc = PointCloudAccumulator::new();
        acc.extend(&[point(1.0, 2.0, 3.0)]);
        acc.extend(&[point(4.0, -5.0, 6.0), point(0.0, 0.0, 0.0)]);
        assert_eq!(acc.len(), 3);
        assert_eq!(acc.clouds(), 2);

        let mirrored = acc.mirrored();
        assert_eq!(mirrored[0].y, -2.0);
        assert_eq!(mirrored[1].y, 5.0);
        assert_eq!(mirrored[1].x, 4.0);
        // source untouched
        assert_eq!(acc.points()[0].y, 2.0);
    }
}
