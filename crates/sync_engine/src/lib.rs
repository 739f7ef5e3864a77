//! # Sync Engine
//!
//! Tick 同步器：让仿真器一次只前进一个固定步长，并等待每个传感器
//! 交付且仅交付该步的一条记录。
//!
//! 负责：
//! - 保存并切换世界设置为同步模式，结束时恢复
//! - 为世界 tick 通知和每个传感器建立 `FrameQueue`
//! - 每次 `advance` 步进一次并校验所有记录的 tick 一致
//! - 超时可恢复，tick 不一致时会话进入 poisoned 状态
//!
//! ## 使用示例
//!
//! ```ignore
//! use sync_engine::TickSynchronizer;
//!
//! let mut sync = TickSynchronizer::begin(&client, sources, 30.0).await?;
//! let result = async {
//!     for _ in 0..frames {
//!         let synced = sync.advance(Duration::from_secs(2)).await?;
//!         handle(synced);
//!     }
//!     Ok::<_, SyncError>(())
//! }
//! .await;
//! sync.end().await?;
//! result?;
//! ```

mod error;
mod synchronizer;

pub use error::{Result, SyncError};
pub use synchronizer::{SyncStats, SyncedTick, TickSynchronizer};
