//! CARLA 传感器数据转换
//!
//! 将 CARLA 原生传感器数据转换为 `SensorRecord`。
//! 仅在 `real-carla` feature 启用时编译。

use bytes::Bytes;
use carla::sensor::data::{Image, LidarMeasurement};
use carla::sensor::{SensorData, SensorDataBase};
use contracts::{
    ImageData, ImageFormat, LidarPoint, PointCloudData, SensorKind, SensorPayload, SensorRecord,
    Tick,
};

/// 将 CARLA Image 转换为 SensorPayload (BGRA 原样保留)
fn image_to_payload(image: &Image) -> SensorPayload {
    let data = Bytes::copy_from_slice(image.as_raw_bytes());
    SensorPayload::Image(ImageData {
        width: image.width() as u32,
        height: image.height() as u32,
        format: ImageFormat::Bgra8,
        data,
    })
}

/// 将 CARLA LidarMeasurement 转换为 SensorPayload
fn lidar_to_payload(lidar: &LidarMeasurement) -> SensorPayload {
    let points: Vec<LidarPoint> = lidar
        .as_slice()
        .iter()
        .map(|d| LidarPoint {
            x: d.point.x,
            y: d.point.y,
            z: d.point.z,
            intensity: d.intensity,
        })
        .collect();
    SensorPayload::PointCloud(PointCloudData::from_points(&points))
}

/// 将 CARLA 传感器数据转换为 SensorRecord
///
/// 如果数据类型与传感器类型不匹配，返回 None。
pub fn convert_sensor_data(
    sensor_id: &str,
    kind: SensorKind,
    data: &SensorData,
) -> Option<SensorRecord> {
    let timestamp = data.timestamp();
    let tick = Tick::new(data.frame() as u64);

    let payload = match kind {
        SensorKind::RgbCamera | SensorKind::DepthCamera | SensorKind::SemanticCamera => {
            let image = Image::try_from(data.clone()).ok()?;
            image_to_payload(&image)
        }
        SensorKind::Lidar => {
            let lidar = LidarMeasurement::try_from(data.clone()).ok()?;
            lidar_to_payload(&lidar)
        }
        SensorKind::WorldTick => return None,
    };

    Some(SensorRecord {
        sensor_id: sensor_id.to_string(),
        kind,
        tick,
        timestamp,
        payload,
    })
}
