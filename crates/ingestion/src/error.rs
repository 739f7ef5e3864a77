//! Ingestion 错误类型

use std::time::Duration;

use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 等待超时，队列中没有记录
    #[error("no record from sensor {sensor_id} within {waited:?}")]
    Timeout {
        /// 传感器 ID
        sensor_id: String,
        /// 实际等待时长
        waited: Duration,
    },

    /// 生产端已撤销且队列已空
    #[error("queue closed for sensor {sensor_id}")]
    Closed {
        /// 传感器 ID
        sensor_id: String,
    },
}

impl IngestionError {
    pub fn sensor_id(&self) -> &str {
        match self {
            Self::Timeout { sensor_id, .. } | Self::Closed { sensor_id } => sensor_id,
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
