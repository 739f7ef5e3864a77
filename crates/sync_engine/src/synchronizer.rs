//! TickSynchronizer - 锁步推进与逐 tick 收集

use std::time::{Duration, Instant};

use actor_factory::{ActorFactoryError, SimulatorClient};
use contracts::{SensorRecord, SensorSource, Tick, WorldSettings};
use ingestion::{FrameQueue, IngestionError};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Result, SyncError};

/// 一次 `advance` 的结果
///
/// `records[0]` 是世界 tick 通知，`records[i]` (i ≥ 1) 对应第 i 个注册的传感器。
#[derive(Debug, Clone)]
pub struct SyncedTick {
    pub tick: Tick,
    pub records: Vec<SensorRecord>,
}

impl SyncedTick {
    /// 世界 tick 通知
    pub fn world(&self) -> Option<&SensorRecord> {
        self.records.first()
    }

    /// 传感器记录（不含世界通知），按注册顺序
    pub fn sensors(&self) -> &[SensorRecord] {
        self.records.get(1..).unwrap_or_default()
    }

    pub fn record(&self, sensor_id: &str) -> Option<&SensorRecord> {
        self.records.iter().find(|r| r.sensor_id == sensor_id)
    }

    /// 世界通知给出的仿真时间
    pub fn elapsed_seconds(&self) -> Option<f64> {
        self.world().map(|r| r.timestamp)
    }
}

/// 会话统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// 成功完成的 advance 次数
    pub ticks: u64,
    pub timeouts: u64,
    /// 属于已放弃 tick 的迟到记录
    pub late_discarded: u64,
    pub violations: u64,
}

/// 同步会话
///
/// 由 `begin` 创建，`end` 结束。`end` 必须在所有退出路径上调用；
/// 在活动状态下被 drop 只会记录警告，无法异步恢复世界设置。
pub struct TickSynchronizer<'c, C: SimulatorClient> {
    client: &'c C,
    delta_seconds: f64,
    saved_settings: WorldSettings,
    /// 世界通知在前，其后为传感器（注册顺序）
    queues: Vec<FrameQueue>,
    last_tick: Tick,
    /// 最近一次超时放弃的 tick
    abandoned: Option<Tick>,
    poisoned: bool,
    active: bool,
    stats: SyncStats,
}

impl<'c, C: SimulatorClient> TickSynchronizer<'c, C> {
    /// 切换到同步模式并为每个传感器建立队列
    #[instrument(
        name = "tick_sync_begin",
        skip(client, sensors),
        fields(sensors = sensors.len())
    )]
    pub async fn begin(
        client: &'c C,
        sensors: Vec<Box<dyn SensorSource>>,
        ticks_per_second: f64,
    ) -> Result<Self> {
        if !ticks_per_second.is_finite() || ticks_per_second <= 0.0 {
            return Err(SyncError::InvalidRate(ticks_per_second));
        }
        let delta_seconds = 1.0 / ticks_per_second;

        let world_source = client.world_tick_source().ok_or_else(|| {
            SyncError::Simulator(ActorFactoryError::simulator(
                "world tick notification unavailable",
            ))
        })?;

        let saved_settings = client.world_settings().await?;
        let last_tick = client
            .apply_settings(WorldSettings::synchronous(delta_seconds))
            .await?;

        let mut queues = Vec::with_capacity(sensors.len() + 1);
        queues.push(FrameQueue::register(world_source));
        queues.extend(sensors.into_iter().map(FrameQueue::register));

        info!(
            delta_seconds,
            queues = queues.len(),
            start_tick = %last_tick,
            "synchronous mode enabled"
        );

        Ok(Self {
            client,
            delta_seconds,
            saved_settings,
            queues,
            last_tick,
            abandoned: None,
            poisoned: false,
            active: true,
            stats: SyncStats::default(),
        })
    }

    /// 请求一次步进并收集该 tick 的全部记录
    #[instrument(name = "tick_sync_advance", skip(self), fields(tick = tracing::field::Empty))]
    pub async fn advance(&mut self, timeout: Duration) -> Result<SyncedTick> {
        if !self.active {
            return Err(SyncError::NotActive);
        }
        if self.poisoned {
            return Err(SyncError::Poisoned);
        }

        let started = Instant::now();
        let tick = self.client.tick().await?;
        tracing::Span::current().record("tick", tick.get());
        if tick <= self.last_tick {
            warn!(%tick, last = %self.last_tick, "simulator returned a non-increasing tick");
        }
        self.last_tick = tick;

        let mut records = Vec::with_capacity(self.queues.len());
        for idx in 0..self.queues.len() {
            match self.pop_matching(idx, tick, timeout).await {
                Ok(record) => records.push(record),
                Err(err) => {
                    self.on_failure(tick, &err);
                    return Err(err);
                }
            }
        }

        self.stats.ticks += 1;
        metrics::counter!("carla_capture_sync_ticks_total").increment(1);
        metrics::histogram!("carla_capture_sync_advance_seconds")
            .record(started.elapsed().as_secs_f64());

        Ok(SyncedTick { tick, records })
    }

    /// 从第 `idx` 个队列取出属于 `tick` 的记录
    ///
    /// 属于已放弃 tick 的迟到记录被丢弃；其它不一致即为违规。
    async fn pop_matching(&mut self, idx: usize, tick: Tick, timeout: Duration) -> Result<SensorRecord> {
        let deadline = Instant::now() + timeout;
        loop {
            let queue = &self.queues[idx];
            let remaining = deadline.saturating_duration_since(Instant::now());
            let record = queue.pop(remaining).await.map_err(|err| match err {
                IngestionError::Timeout { sensor_id, .. } => SyncError::Timeout {
                    sensor_id,
                    tick,
                    waited: timeout,
                },
                IngestionError::Closed { sensor_id } => SyncError::QueueClosed { sensor_id },
            })?;

            if record.tick == tick {
                return Ok(record);
            }

            match self.abandoned {
                Some(abandoned) if record.tick <= abandoned => {
                    debug!(
                        sensor_id = %record.sensor_id,
                        record_tick = %record.tick,
                        abandoned = %abandoned,
                        "discarding late record of an abandoned tick"
                    );
                    self.stats.late_discarded += 1;
                }
                _ => {
                    return Err(SyncError::SyncViolation {
                        expected: tick,
                        actual: record.tick,
                        sensor_id: record.sensor_id,
                    });
                }
            }
        }
    }

    fn on_failure(&mut self, tick: Tick, err: &SyncError) {
        match err {
            SyncError::Timeout {
                sensor_id, waited, ..
            } => {
                self.stats.timeouts += 1;
                self.abandoned = Some(self.abandoned.map_or(tick, |t| t.max(tick)));
                metrics::counter!(
                    "carla_capture_sync_timeouts_total",
                    "sensor_id" => sensor_id.clone()
                )
                .increment(1);
                warn!(sensor_id = %sensor_id, %tick, ?waited, "tick abandoned after timeout");
            }
            SyncError::SyncViolation { sensor_id, .. } => {
                self.stats.violations += 1;
                self.poisoned = true;
                metrics::counter!(
                    "carla_capture_sync_violations_total",
                    "sensor_id" => sensor_id.clone()
                )
                .increment(1);
                error!(error = %err, "session poisoned");
            }
            _ => {}
        }
    }

    /// 恢复原世界设置并丢弃所有队列
    ///
    /// 可重复调用；第二次及之后不做任何事。
    #[instrument(name = "tick_sync_end", skip(self))]
    pub async fn end(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        for queue in self.queues.drain(..) {
            queue.close();
        }

        self.client.apply_settings(self.saved_settings).await?;
        info!(
            ticks = self.stats.ticks,
            timeouts = self.stats.timeouts,
            late_discarded = self.stats.late_discarded,
            "world settings restored"
        );
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn delta_seconds(&self) -> f64 {
        self.delta_seconds
    }

    pub fn last_tick(&self) -> Tick {
        self.last_tick
    }

    /// 进入同步模式前的世界设置
    pub fn saved_settings(&self) -> WorldSettings {
        self.saved_settings
    }

    /// 队列对应的传感器 ID，世界通知在前
    pub fn sensor_ids(&self) -> Vec<&str> {
        self.queues.iter().map(FrameQueue::sensor_id).collect()
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }
}

impl<C: SimulatorClient> Drop for TickSynchronizer<'_, C> {
    fn drop(&mut self) {
        if self.active {
            warn!(
                saved = ?self.saved_settings,
                "synchronizer dropped while active; world left in synchronous mode"
            );
        }
    }
}
