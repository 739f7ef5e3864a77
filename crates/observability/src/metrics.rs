//! 采集指标
//!
//! 全局 `metrics` 指标记录 + 内存内聚合（用于运行结束时打印摘要）。

use std::collections::HashMap;

use metrics::{counter, gauge, histogram};

/// 记录一帧已写盘
pub fn record_frame_captured(run: &str, foreground_ratio: f64) {
    counter!("carla_capture_frames_total", "run" => run.to_string()).increment(1);
    histogram!("carla_capture_foreground_ratio").record(foreground_ratio);
}

/// 记录预热阶段跳过的 tick
pub fn record_warmup_tick() {
    counter!("carla_capture_warmup_ticks_total").increment(1);
}

/// 记录一次 advance 超时
pub fn record_timeout(sensor_id: &str) {
    counter!(
        "carla_capture_timeouts_total",
        "sensor_id" => sensor_id.to_string()
    )
    .increment(1);
}

/// 记录单帧后处理耗时
pub fn record_postprocess_ms(ms: f64) {
    histogram!("carla_capture_postprocess_ms").record(ms);
}

/// 记录 sink 写入结果
pub fn record_frame_written(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "carla_capture_frames_written_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录一次运行结束
pub fn record_run_finished(outcome: &str) {
    counter!(
        "carla_capture_runs_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
    gauge!("carla_capture_last_run_timestamp").set(now_secs());
}

fn now_secs() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// 采集统计聚合器
///
/// 一个会话内所有运行共享一个聚合器。
#[derive(Debug, Clone, Default)]
pub struct CaptureStatsAggregator {
    /// 写盘帧数
    pub total_frames: u64,

    /// 预热跳过的 tick 数
    pub warmup_ticks: u64,

    /// 超时总数
    pub total_timeouts: u64,

    /// 完成的运行数
    pub runs_completed: u64,

    /// 失败的运行数
    pub runs_failed: u64,

    /// 前景占比统计
    pub foreground_stats: RunningStats,

    /// 后处理耗时统计 (ms)
    pub postprocess_stats: RunningStats,

    /// 各传感器超时次数
    pub timeout_counts: HashMap<String, u64>,
}

impl CaptureStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一帧
    pub fn record_frame(&mut self, foreground_ratio: f64, postprocess_ms: f64) {
        self.total_frames += 1;
        self.foreground_stats.push(foreground_ratio);
        self.postprocess_stats.push(postprocess_ms);
    }

    pub fn record_warmup(&mut self) {
        self.warmup_ticks += 1;
    }

    pub fn record_timeout(&mut self, sensor_id: &str) {
        self.total_timeouts += 1;
        *self.timeout_counts.entry(sensor_id.to_string()).or_insert(0) += 1;
    }

    pub fn record_run(&mut self, success: bool) {
        if success {
            self.runs_completed += 1;
        } else {
            self.runs_failed += 1;
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> CaptureSummary {
        let ticks = self.total_frames + self.total_timeouts;
        CaptureSummary {
            total_frames: self.total_frames,
            warmup_ticks: self.warmup_ticks,
            total_timeouts: self.total_timeouts,
            runs_completed: self.runs_completed,
            runs_failed: self.runs_failed,
            timeout_rate: if ticks > 0 {
                self.total_timeouts as f64 / ticks as f64 * 100.0
            } else {
                0.0
            },
            foreground_ratio: StatsSummary::from(&self.foreground_stats),
            postprocess_ms: StatsSummary::from(&self.postprocess_stats),
            sensor_timeout_counts: self.timeout_counts.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct CaptureSummary {
    pub total_frames: u64,
    pub warmup_ticks: u64,
    pub total_timeouts: u64,
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub timeout_rate: f64,
    pub foreground_ratio: StatsSummary,
    pub postprocess_ms: StatsSummary,
    pub sensor_timeout_counts: HashMap<String, u64>,
}

impl std::fmt::Display for CaptureSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Capture Summary ===")?;
        writeln!(
            f,
            "Runs: {} completed, {} failed",
            self.runs_completed, self.runs_failed
        )?;
        writeln!(f, "Frames captured: {}", self.total_frames)?;
        writeln!(f, "Warm-up ticks: {}", self.warmup_ticks)?;
        writeln!(
            f,
            "Timeouts: {} ({:.2}%)",
            self.total_timeouts, self.timeout_rate
        )?;
        writeln!(f, "Foreground ratio: {}", self.foreground_ratio)?;
        writeln!(f, "Post-process (ms): {}", self.postprocess_ms)?;

        if !self.sensor_timeout_counts.is_empty() {
            let mut sensors: Vec<_> = self.sensor_timeout_counts.iter().collect();
            sensors.sort();
            writeln!(f, "Timeouts by sensor:")?;
            for (sensor, count) in sensors {
                writeln!(f, "  {}: {}", sensor, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
