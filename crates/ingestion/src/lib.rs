//! # Ingestion
//!
//! 把回调式的传感器（push）桥接为可按截止时间拉取的 FIFO 队列（pull）。
//!
//! Responsibilities:
//! - 注册 `SensorSource`，回调线程中把记录推入无界队列
//! - `pop(timeout)` 按到达顺序取出一条记录，超时返回 `IngestionError::Timeout`
//! - `close()` 撤销回调注册并关闭队列
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::FrameQueue;
//!
//! let source = client.get_sensor_source(actor_id, "rgb", SensorKind::RgbCamera)?;
//! let queue = FrameQueue::register(source);
//! client.tick().await?;
//! let record = queue.pop(Duration::from_secs(2)).await?;
//! ```

mod error;
mod stats;
mod queue;

pub use error::{IngestionError, Result};
pub use stats::{QueueMetrics, QueueMetricsSnapshot};
pub use queue::FrameQueue;
