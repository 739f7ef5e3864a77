//! # CARLA Capture
//!
//! 采集会话库，供 `carla-capture` 二进制与集成测试共用。
//!
//! 提供：
//! - 相机采集会话 (`SessionDriver`)
//! - 激光雷达扫描 (`lidar_sweep`)
//! - 出生点定位 (`locate_closest`)

pub mod error;
pub mod session;

pub use error::{Result, SessionError};
pub use session::{
    lidar_sweep, locate_closest, LidarReport, RunReport, SessionDriver, SessionReport, Shutdown,
    ShutdownTrigger, SpawnPointMatch, CAMERA_MODALITIES, OUTCOME_COMPLETED, OUTCOME_INTERRUPTED,
    POINTCLOUD_FILE,
};
