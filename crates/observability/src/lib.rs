//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式，`-v` / `-q` 对应的默认级别)
//! - Prometheus 指标导出（可选）
//! - 采集统计聚合与摘要
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{init_with_config, CaptureStatsAggregator, ObservabilityConfig};
//!
//! init_with_config(&ObservabilityConfig::from_verbosity(1, false))?;
//!
//! let mut stats = CaptureStatsAggregator::new();
//! stats.record_frame(processed.foreground_ratio, elapsed_ms);
//! observability::metrics::record_frame_captured("1_1", processed.foreground_ratio);
//! println!("{}", stats.summary());
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_frame_captured, record_frame_written, record_postprocess_ms, record_run_finished,
    record_timeout, record_warmup_tick, CaptureStatsAggregator, CaptureSummary, RunningStats,
    StatsSummary,
};

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// 未设置 RUST_LOG 时的过滤规则
    pub default_log_level: String,
    /// 忽略 RUST_LOG，只输出警告与错误
    pub quiet: bool,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            default_log_level: "info".to_string(),
            quiet: false,
            metrics_port: None,
        }
    }
}

impl ObservabilityConfig {
    /// `-v` 次数与 `-q` 对应的配置：0 → info, 1 → debug, 2+ → trace
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        let level = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        Self {
            default_log_level: level.to_string(),
            quiet,
            ..Default::default()
        }
    }

    fn filter(&self) -> EnvFilter {
        if self.quiet {
            EnvFilter::new("warn")
        } else {
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&self.default_log_level))
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    Json,
    /// 人类可读格式
    #[default]
    Pretty,
    /// 紧凑单行格式
    Compact,
}

/// 初始化 tracing 订阅者，按需启动 Prometheus 导出
pub fn init_with_config(config: &ObservabilityConfig) -> Result<()> {
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(config.filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );
    Ok(())
}

/// 仅启动 Prometheus 导出（tracing 已初始化时使用）
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus recorder on port {port}"))?;

    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}
