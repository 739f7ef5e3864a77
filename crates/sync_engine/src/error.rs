//! Tick 同步错误

use std::time::Duration;

use actor_factory::ActorFactoryError;
use contracts::Tick;
use thiserror::Error;

/// Tick 同步错误
#[derive(Debug, Error)]
pub enum SyncError {
    /// 某个传感器在截止时间内没有交付该 tick 的记录（可恢复）
    #[error("sensor {sensor_id} delivered nothing for tick {tick} within {waited:?}")]
    Timeout {
        sensor_id: String,
        tick: Tick,
        waited: Duration,
    },

    /// 记录的 tick 与本次步进的 tick 不一致（致命，会话被标记为 poisoned）
    #[error("sync violation on sensor {sensor_id}: expected tick {expected}, got {actual}")]
    SyncViolation {
        expected: Tick,
        actual: Tick,
        sensor_id: String,
    },

    /// 之前发生过 SyncViolation，会话不可再推进
    #[error("synchronization session is poisoned by an earlier violation")]
    Poisoned,

    /// ticks_per_second 必须为有限正数
    #[error("invalid tick rate {0}: must be finite and > 0")]
    InvalidRate(f64),

    /// 会话未开始或已结束
    #[error("synchronization session is not active")]
    NotActive,

    /// 传感器队列在会话中途被关闭
    #[error("queue for sensor {sensor_id} closed during synchronization")]
    QueueClosed { sensor_id: String },

    /// 仿真器调用失败
    #[error("simulator error: {0}")]
    Simulator(#[from] ActorFactoryError),
}

impl SyncError {
    /// 仅超时可恢复：调用方可以继续下一次 `advance`
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_violation(&self) -> bool {
        matches!(self, Self::SyncViolation { .. } | Self::Poisoned)
    }
}

/// Sync engine Result 类型别名
pub type Result<T> = std::result::Result<T, SyncError>;
