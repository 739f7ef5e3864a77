//! SensorRecord - Ingestion 输出
//!
//! 单个传感器在某一 tick 产生的原始数据记录。

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::Tick;

/// 传感器数据记录
///
/// 同步模式下，每个传感器每个 tick 产生一条记录。
/// 记录被消费前由所在队列独占持有，消费后即丢弃。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorRecord {
    /// 传感器 ID (世界 tick 通知使用 [`WORLD_TICK_SENSOR_ID`])
    pub sensor_id: String,

    /// 传感器类型
    pub kind: SensorKind,

    /// 产生该记录的 tick - 主时钟
    pub tick: Tick,

    /// 仿真时间戳 (seconds)，仅用于诊断
    pub timestamp: f64,

    /// 数据载荷 (零拷贝)
    pub payload: SensorPayload,
}

/// 世界 tick 通知对应的伪传感器 ID
pub const WORLD_TICK_SENSOR_ID: &str = "world";

/// 传感器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// RGB 相机
    RgbCamera,
    /// 深度相机 (BGRA 编码的归一化深度)
    DepthCamera,
    /// 语义分割相机 (标签位于 R 通道)
    SemanticCamera,
    /// 光线投射激光雷达
    Lidar,
    /// 世界自身的 tick 通知
    WorldTick,
}

impl SensorKind {
    /// CARLA 蓝图名称；世界 tick 没有对应蓝图
    pub fn blueprint(self) -> Option<&'static str> {
        match self {
            Self::RgbCamera => Some("sensor.camera.rgb"),
            Self::DepthCamera => Some("sensor.camera.depth"),
            Self::SemanticCamera => Some("sensor.camera.semantic_segmentation"),
            Self::Lidar => Some("sensor.lidar.ray_cast"),
            Self::WorldTick => None,
        }
    }

    /// 是否为相机类传感器
    pub fn is_camera(self) -> bool {
        matches!(
            self,
            Self::RgbCamera | Self::DepthCamera | Self::SemanticCamera
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RgbCamera => "rgb_camera",
            Self::DepthCamera => "depth_camera",
            Self::SemanticCamera => "semantic_camera",
            Self::Lidar => "lidar",
            Self::WorldTick => "world_tick",
        }
    }
}

/// 传感器数据载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SensorPayload {
    /// 图像数据 (RGB/Depth/SemanticSeg)
    Image(ImageData),

    /// LiDAR 点云
    PointCloud(PointCloudData),

    /// 世界快照 (tick 通知)
    WorldTick(WorldSnapshot),

    /// 原始字节 (fallback)
    Raw(Bytes),
}

impl SensorPayload {
    pub fn as_image(&self) -> Option<&ImageData> {
        match self {
            Self::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_point_cloud(&self) -> Option<&PointCloudData> {
        match self {
            Self::PointCloud(cloud) => Some(cloud),
            _ => None,
        }
    }
}

/// 图像数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    /// 图像宽度
    pub width: u32,

    /// 图像高度
    pub height: u32,

    /// 像素格式
    pub format: ImageFormat,

    /// 原始像素数据 (行优先，紧密排列)
    pub data: Bytes,
}

impl ImageData {
    /// 像素数量
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// 数据长度是否与尺寸、格式一致
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.pixel_count() * self.format.channels()
    }
}

/// 图像格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    /// CARLA 相机原生格式
    Bgra8,
    Rgba8,
    Rgb8,
    Gray8,
}

impl ImageFormat {
    /// 每像素通道数 (每通道 1 字节)
    pub fn channels(self) -> usize {
        match self {
            Self::Bgra8 | Self::Rgba8 => 4,
            Self::Rgb8 => 3,
            Self::Gray8 => 1,
        }
    }
}

/// LiDAR 点云数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloudData {
    /// 点数量
    pub num_points: u32,

    /// 每点字节数 (通常 16: x,y,z,intensity)
    pub point_stride: u32,

    /// 点云数据 (little-endian f32)
    pub data: Bytes,
}

impl PointCloudData {
    /// 由点列表构建 16 字节步长的点云
    pub fn from_points(points: &[LidarPoint]) -> Self {
        let mut data = Vec::with_capacity(points.len() * 16);
        for p in points {
            for v in [p.x, p.y, p.z, p.intensity] {
                data.extend_from_slice(&v.to_le_bytes());
            }
        }
        Self {
            num_points: points.len() as u32,
            point_stride: 16,
            data: Bytes::from(data),
        }
    }

    /// 解码点列表；步长小于 12 字节或数据截断时返回 None
    pub fn points(&self) -> Option<Vec<LidarPoint>> {
        let stride = self.point_stride as usize;
        let count = self.num_points as usize;
        if stride < 12 || self.data.len() < stride * count {
            return None;
        }

        let read = |chunk: &[u8], offset: usize| {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(&chunk[offset..offset + 4]);
            f32::from_le_bytes(raw)
        };

        let points = self.data[..stride * count]
            .chunks_exact(stride)
            .map(|chunk| LidarPoint {
                x: read(chunk, 0),
                y: read(chunk, 4),
                z: read(chunk, 8),
                intensity: if stride >= 16 { read(chunk, 12) } else { 0.0 },
            })
            .collect();
        Some(points)
    }
}

/// 单个激光雷达点
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LidarPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
}

/// 世界快照 (tick 通知载荷)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// 自世界启动以来的仿真时间 (秒)
    pub elapsed_seconds: f64,

    /// 本 tick 的仿真步长 (秒)
    pub delta_seconds: f64,
}
