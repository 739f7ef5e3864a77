//! World-level value types: settings, poses, weather.

use serde::{Deserialize, Serialize};

/// World settings relevant to stepping
///
/// Saved before entering synchronous mode and re-applied on exit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSettings {
    /// Time only advances on explicit tick requests
    pub synchronous_mode: bool,

    /// Skip rendering (cameras produce nothing)
    pub no_rendering_mode: bool,

    /// Fixed step size in seconds; `None` means variable time step
    pub fixed_delta_seconds: Option<f64>,
}

impl WorldSettings {
    /// Synchronous, fixed-step settings with rendering enabled.
    pub fn synchronous(delta_seconds: f64) -> Self {
        Self {
            synchronous_mode: true,
            no_rendering_mode: false,
            fixed_delta_seconds: Some(delta_seconds),
        }
    }
}

/// 3D 变换：位置 + 旋转
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// 位置 (x, y, z) 单位：米
    pub location: Location,

    /// 旋转 (pitch, yaw, roll) 单位：度
    #[serde(default)]
    pub rotation: Rotation,
}

impl Transform {
    pub fn new(location: Location, rotation: Rotation) -> Self {
        Self { location, rotation }
    }

    pub fn from_location(x: f64, y: f64, z: f64) -> Self {
        Self {
            location: Location { x, y, z },
            rotation: Rotation::default(),
        }
    }

    /// Pose row `[x, y, z, roll, yaw, pitch]` as written to the camera table.
    pub fn pose_row(&self) -> [f64; 6] {
        [
            self.location.x,
            self.location.y,
            self.location.z,
            self.rotation.roll,
            self.rotation.yaw,
            self.rotation.pitch,
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn negated(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

/// Full weather parameter set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherParameters {
    pub cloudiness: f32,
    pub precipitation: f32,
    pub precipitation_deposits: f32,
    pub wind_intensity: f32,
    pub fog_density: f32,
    pub fog_distance: f32,
    pub fog_falloff: f32,
    pub wetness: f32,
    pub scattering_intensity: f32,
    pub mie_scattering_scale: f32,
    pub rayleigh_scattering_scale: f32,
    pub sun_altitude_angle: f32,
    pub sun_azimuth_angle: f32,
}

impl WeatherParameters {
    /// Clear sky, sun at 45° altitude facing north.
    pub fn clear_noon() -> Self {
        Self {
            cloudiness: 10.0,
            precipitation: 0.0,
            precipitation_deposits: 0.0,
            wind_intensity: 5.0,
            fog_density: 0.0,
            fog_distance: 0.0,
            fog_falloff: 0.2,
            wetness: 0.0,
            scattering_intensity: 0.0,
            mie_scattering_scale: 0.0,
            rayleigh_scattering_scale: 0.0331,
            sun_altitude_angle: 45.0,
            sun_azimuth_angle: 0.0,
        }
    }
}

impl Default for WeatherParameters {
    fn default() -> Self {
        Self::clear_noon()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_row_order() {
        let t = Transform::new(
            Location::new(1.0, 2.0, 3.0),
            Rotation {
                pitch: 4.0,
                yaw: 5.0,
                roll: 6.0,
            },
        );
        assert_eq!(t.pose_row(), [1.0, 2.0, 3.0, 6.0, 5.0, 4.0]);
    }

    #[test]
    fn test_synchronous_settings() {
        let s = WorldSettings::synchronous(1.0 / 30.0);
        assert!(s.synchronous_mode);
        assert!(!s.no_rendering_mode);
        assert_ne!(s, WorldSettings::default());
    }
}
