//! # CARLA Capture CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 相机采集、激光雷达扫描、打包、清理与定位命令
//! - 优雅关闭处理

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands};
use commands::{
    run_archive, run_capture, run_cleanup, run_info, run_lidar, run_locate, run_validate,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "CARLA Capture CLI starting"
    );

    let result = match &cli.command {
        Commands::Run(args) => run_capture(args).await,
        Commands::Lidar(args) => run_lidar(args).await,
        Commands::Archive(args) => run_archive(args),
        Commands::Cleanup(args) => run_cleanup(args).await,
        Commands::Locate(args) => run_locate(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    let config = observability::ObservabilityConfig {
        log_format: cli.log_format.into(),
        ..observability::ObservabilityConfig::from_verbosity(cli.verbose, cli.quiet)
    };
    observability::init_with_config(&config)
}
