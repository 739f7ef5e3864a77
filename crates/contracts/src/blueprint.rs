//! CaptureBlueprint - Config Loader 输出
//!
//! 描述一次采集会话的完整配置：世界、车辆、相机、同步、运行次数、
//! 后处理参数、输出目录、激光雷达扫描与打包。
//!
//! 所有字段都有默认值，空配置文件即可复现原始采集流程
//! (Town03, 1280x720, fov 120, 30 fps, 4 个出生点 x 4 次运行)。

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{Location, Modality, Rotation, Transform, WeatherParameters};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的采集配置蓝图
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CaptureBlueprint {
    /// 配置版本
    pub version: ConfigVersion,

    /// 世界设置
    #[validate(nested)]
    pub world: WorldConfig,

    /// 自车
    #[validate(nested)]
    pub vehicle: VehicleConfig,

    /// 相机组 (RGB / 深度 / 语义分割，共用同一挂载位姿)
    #[validate(nested)]
    pub camera: CameraConfig,

    /// 同步策略
    #[validate(nested)]
    pub sync: SyncConfig,

    /// 运行次数与长度
    #[validate(nested)]
    pub run: RunConfig,

    /// 后处理参数
    #[validate(nested)]
    pub postprocess: PostprocessConfig,

    /// 输出目录
    #[validate(nested)]
    pub output: OutputConfig,

    /// 激光雷达扫描模式
    #[validate(nested)]
    pub lidar: LidarConfig,

    /// 打包配置
    #[validate(nested)]
    pub archive: ArchiveConfig,
}

/// 世界配置：地图、天气、服务器地址
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WorldConfig {
    /// 地图名称 (e.g., "Town03")
    #[validate(length(min = 1))]
    pub map: String,

    /// 天气预设
    pub weather: WeatherPreset,

    /// CARLA 服务器地址
    #[validate(length(min = 1))]
    pub carla_host: String,

    /// CARLA 服务器端口
    #[validate(range(min = 1))]
    pub carla_port: u16,

    /// 客户端 RPC 超时 (秒)
    #[validate(range(exclusive_min = 0.0))]
    pub timeout_sec: f64,

    /// 运行前将所有红绿灯设为绿灯
    pub traffic_lights_green: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            map: "Town03".to_string(),
            weather: WeatherPreset::ClearNoon,
            carla_host: "localhost".to_string(),
            carla_port: 2000,
            timeout_sec: 20.0,
            traffic_lights_green: true,
        }
    }
}

/// 天气预设
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherPreset {
    #[default]
    ClearNoon,
    Custom(WeatherParameters),
}

impl WeatherPreset {
    pub fn parameters(&self) -> WeatherParameters {
        match self {
            Self::ClearNoon => WeatherParameters::clear_noon(),
            Self::Custom(params) => *params,
        }
    }
}

/// 车辆配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct VehicleConfig {
    /// 蓝图名称 (e.g., "vehicle.tesla.model3")
    #[validate(length(min = 1))]
    pub blueprint: String,

    /// 从推荐颜色中随机选取车身颜色
    pub random_color: bool,

    /// 开启自动驾驶
    pub autopilot: bool,

    /// 地图出生点索引，每个索引重复 `run.runs_per_spawn` 次
    #[validate(length(min = 1))]
    pub spawn_points: Vec<usize>,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            blueprint: "vehicle.tesla.model3".to_string(),
            random_color: true,
            autopilot: true,
            spawn_points: vec![221, 220, 239, 240],
        }
    }
}

/// 相机组配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CameraConfig {
    #[validate(range(min = 1, max = 8192))]
    pub width: u32,

    #[validate(range(min = 1, max = 8192))]
    pub height: u32,

    /// 水平视场角 (度)
    #[validate(range(exclusive_min = 0.0, exclusive_max = 180.0))]
    pub fov: f64,

    /// 相对车辆的基准挂载位置 (x 前, y 右, z 上)
    pub mount: Location,

    /// y 方向随机偏移幅度，实际偏移取 [-y_jitter, y_jitter]
    #[validate(range(min = 0.0))]
    pub y_jitter: f64,

    /// z 方向随机偏移幅度
    #[validate(range(min = 0.0))]
    pub z_jitter: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fov: 120.0,
            mount: Location::new(1.5, 0.0, 2.4),
            y_jitter: 2.0,
            z_jitter: 1.0,
        }
    }
}

impl CameraConfig {
    /// Mount transform for the given jitter offsets.
    pub fn mount_transform(&self, dy: f64, dz: f64) -> Transform {
        Transform::new(
            Location::new(self.mount.x, self.mount.y + dy, self.mount.z + dz),
            Rotation::default(),
        )
    }
}

/// 超时处理策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// 记录并跳过该 tick
    #[default]
    Skip,
    /// 终止本次运行
    Abort,
}

/// 同步策略配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SyncConfig {
    /// 每秒 tick 数，fixed_delta_seconds = 1 / fps
    #[validate(range(exclusive_min = 0.0, max = 1000.0))]
    pub fps: f64,

    /// 单次 advance 中每个队列的等待上限 (秒)
    #[validate(range(exclusive_min = 0.0))]
    pub timeout_sec: f64,

    /// 超时策略
    pub on_timeout: TimeoutPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            timeout_sec: 2.0,
            on_timeout: TimeoutPolicy::Skip,
        }
    }
}

impl SyncConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.timeout_sec)
    }
}

/// 运行配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RunConfig {
    /// 每个出生点的运行次数
    #[validate(range(min = 1))]
    pub runs_per_spawn: u32,

    /// 每次运行计数的 tick 数 (含预热)
    #[validate(range(min = 1))]
    pub frames_per_run: u64,

    /// 预热 tick 数，期间不输出
    pub warmup_ticks: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            runs_per_spawn: 4,
            frames_per_run: 110,
            warmup_ticks: 10,
        }
    }
}

impl RunConfig {
    /// Number of ticks that produce outputs
    pub fn recorded_frames(&self) -> u64 {
        self.frames_per_run.saturating_sub(self.warmup_ticks)
    }
}

/// 后处理参数
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PostprocessConfig {
    /// 深度归一化后的缩放系数
    #[validate(range(exclusive_min = 0.0))]
    pub depth_scale: f32,

    /// 最远值剔除的最大迭代次数
    #[validate(range(min = 1, max = 1000))]
    pub clip_rounds: usize,

    /// 剔除过头时回退的迭代数
    pub lookback: usize,

    /// 近处剔除阈值
    #[validate(range(min = 0.0))]
    pub min_depth: f32,

    /// 语义分割中代表 "未标注" 的颜色
    pub unlabeled_color: [u8; 3],
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            depth_scale: 255.0,
            clip_rounds: 20,
            lookback: 5,
            min_depth: 3.0,
            unlabeled_color: [0, 0, 0],
        }
    }
}

/// 输出配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct OutputConfig {
    /// 会话目录的父目录
    #[validate(length(min = 1))]
    pub base_dir: String,

    /// 每次运行写 run.json
    pub write_run_metadata: bool,

    /// 同时以日志形式输出每帧摘要
    pub log_frames: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: "_out/sequences".to_string(),
            write_run_metadata: true,
            log_frames: false,
        }
    }
}

/// 激光雷达扫描配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LidarConfig {
    /// 观察者位姿 (雷达挂载在观察者上)
    pub spectator: Transform,

    /// 采集的 tick 数
    #[validate(range(min = 1))]
    pub records: u32,

    #[validate(range(exclusive_min = 0.0))]
    pub range: f64,

    pub upper_fov: f64,

    pub lower_fov: f64,

    #[validate(range(exclusive_min = 0.0))]
    pub rotation_frequency: f64,

    #[validate(range(min = 1))]
    pub channels: u32,

    #[validate(range(min = 1))]
    pub points_per_second: u32,

    /// 单帧 PLY 与汇总 PCD 的输出目录
    #[validate(length(min = 1))]
    pub output_dir: String,

    /// 每次 tick 前的等待 (毫秒)
    pub pace_ms: u64,
}

impl Default for LidarConfig {
    fn default() -> Self {
        Self {
            spectator: Transform::new(
                Location::new(20.0, 0.0, 5.0),
                Rotation {
                    pitch: 0.0,
                    yaw: 180.0,
                    roll: 0.0,
                },
            ),
            records: 170,
            range: 50.0,
            upper_fov: 20.0,
            lower_fov: -30.0,
            rotation_frequency: 30.0,
            channels: 64,
            points_per_second: 1_000_000,
            output_dir: "_out".to_string(),
            pace_ms: 100,
        }
    }
}

impl LidarConfig {
    /// Blueprint attributes for `sensor.lidar.ray_cast`
    pub fn attributes(&self) -> Vec<(String, String)> {
        vec![
            ("range".to_string(), format!("{:.1}", self.range)),
            ("upper_fov".to_string(), format!("{:.1}", self.upper_fov)),
            ("lower_fov".to_string(), format!("{:.1}", self.lower_fov)),
            (
                "rotation_frequency".to_string(),
                format!("{}", self.rotation_frequency),
            ),
            ("channels".to_string(), self.channels.to_string()),
            (
                "points_per_second".to_string(),
                self.points_per_second.to_string(),
            ),
        ]
    }
}

/// 打包配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ArchiveConfig {
    /// 打包的模态子目录
    #[validate(length(min = 1))]
    pub modalities: Vec<Modality>,

    /// 输出 zip 文件路径
    #[validate(length(min = 1))]
    pub output: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            modalities: vec![Modality::Rgb, Modality::Semseg],
            output: "dataset.zip".to_string(),
        }
    }
}

impl CaptureBlueprint {
    /// Attributes shared by the three cameras of the rig.
    pub fn camera_attributes(&self) -> Vec<(String, String)> {
        vec![
            ("fov".to_string(), format!("{}", self.camera.fov)),
            ("image_size_x".to_string(), self.camera.width.to_string()),
            ("image_size_y".to_string(), self.camera.height.to_string()),
        ]
    }

    /// Total number of runs in a session
    pub fn total_runs(&self) -> usize {
        self.vehicle.spawn_points.len() * self.run.runs_per_spawn as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_capture_script() {
        let bp = CaptureBlueprint::default();
        assert_eq!(bp.world.map, "Town03");
        assert_eq!(bp.camera.width, 1280);
        assert_eq!(bp.camera.height, 720);
        assert_eq!(bp.sync.fps, 30.0);
        assert_eq!(bp.run.recorded_frames(), 100);
        assert_eq!(bp.total_runs(), 16);
        assert!(bp.validate().is_ok());
    }

    #[test]
    fn test_range_rules_reject_zero_fps() {
        let mut bp = CaptureBlueprint::default();
        bp.sync.fps = 0.0;
        assert!(bp.validate().is_err());
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let bp: CaptureBlueprint = serde_json::from_str("{}").unwrap();
        assert_eq!(bp.vehicle.spawn_points, vec![221, 220, 239, 240]);
        assert_eq!(bp.world.weather, WeatherPreset::ClearNoon);
        assert_eq!(bp.archive.modalities, vec![Modality::Rgb, Modality::Semseg]);
    }

    #[test]
    fn test_mount_transform_applies_jitter() {
        let camera = CameraConfig::default();
        let t = camera.mount_transform(-1.0, 0.5);
        assert_eq!(t.location, Location::new(1.5, -1.0, 2.9));
    }

    #[test]
    fn test_lidar_attributes() {
        let attrs = LidarConfig::default().attributes();
        assert!(attrs.contains(&("range".to_string(), "50.0".to_string())));
        assert!(attrs.contains(&("channels".to_string(), "64".to_string())));
    }
}
