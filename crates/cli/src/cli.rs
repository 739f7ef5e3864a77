//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use contracts::Modality;
use std::path::PathBuf;

/// CARLA Capture - synchronized multi-sensor dataset recording for the CARLA simulator
#[derive(Parser, Debug)]
#[command(
    name = "carla-capture",
    author,
    version,
    about = "Synchronized multi-sensor dataset capture for CARLA",
    long_about = "Records lock-step RGB / depth / segmentation sequences from the CARLA simulator.\n\n\
                  Puts the world into synchronous mode, advances one tick at a time, waits for \n\
                  every sensor to deliver that tick, masks the images and writes them to disk."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CARLA_CAPTURE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "CARLA_CAPTURE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record camera sequences at every configured spawn point
    Run(RunArgs),

    /// Record point clouds from a lidar attached to the spectator
    Lidar(LidarArgs),

    /// Package selected modalities of a session into a zip archive
    Archive(ArchiveArgs),

    /// Destroy every actor of a blueprint type
    Cleanup(CleanupArgs),

    /// Report the spawn point closest to the spectator
    Locate(LocateArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Configuration file and server overrides shared by simulator commands
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "CARLA_CAPTURE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override CARLA server host from configuration
    #[arg(long, env = "CARLA_HOST")]
    pub host: Option<String>,

    /// Override CARLA server port from configuration
    #[arg(long, env = "CARLA_PORT")]
    pub port: Option<u16>,
}

/// Arguments for the `run` command
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Override the parent directory of the session folder
    #[arg(short, long, env = "CARLA_CAPTURE_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Override spawn point indices (repeatable)
    #[arg(long = "spawn", value_name = "INDEX")]
    pub spawn_points: Vec<usize>,

    /// Override runs per spawn point
    #[arg(long)]
    pub runs: Option<u32>,

    /// Override ticks per run (warm-up included)
    #[arg(long)]
    pub frames: Option<u64>,

    /// Validate configuration and exit without connecting
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CARLA_CAPTURE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `lidar` command
#[derive(Args, Debug, Clone)]
pub struct LidarArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Override the number of ticks to record
    #[arg(long)]
    pub records: Option<u32>,

    /// Override the output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `archive` command
#[derive(Args, Debug, Clone)]
pub struct ArchiveArgs {
    /// Session folder containing the run folders
    pub base_dir: PathBuf,

    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, env = "CARLA_CAPTURE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the zip file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the modalities to include (repeatable, e.g. rgb, semseg)
    #[arg(long = "modality", value_name = "DIR", value_parser = parse_modality)]
    pub modalities: Vec<Modality>,
}

/// Arguments for the `cleanup` command
#[derive(Args, Debug, Clone)]
pub struct CleanupArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Actor type id to destroy
    #[arg(long = "type", default_value = "vehicle.tesla.model3")]
    pub type_id: String,
}

/// Arguments for the `locate` command
#[derive(Args, Debug, Clone)]
pub struct LocateArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Polling interval in milliseconds
    #[arg(long, default_value = "1000")]
    pub interval_ms: u64,

    /// Number of polls (0 = until interrupted)
    #[arg(long, default_value = "0")]
    pub count: u64,

    /// Output each result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Path to configuration file; built-in defaults when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

fn parse_modality(s: &str) -> Result<Modality, String> {
    Modality::from_dir_name(s).ok_or_else(|| {
        let known: Vec<&str> = Modality::ALL.iter().map(|m| m.dir_name()).collect();
        format!("unknown modality '{s}' (expected one of: {})", known.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::parse_from([
            "carla-capture",
            "run",
            "--spawn",
            "3",
            "--spawn",
            "7",
            "--frames",
            "20",
            "--host",
            "sim",
        ]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.spawn_points, vec![3, 7]);
                assert_eq!(args.frames, Some(20));
                assert_eq!(args.connection.host.as_deref(), Some("sim"));
                assert_eq!(args.metrics_port, 0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_archive_modalities() {
        let cli = Cli::parse_from([
            "carla-capture",
            "archive",
            "_out/sequences/08_24_13_30_13",
            "--modality",
            "rgb",
            "--modality",
            "semseg_masked",
        ]);
        match cli.command {
            Commands::Archive(args) => {
                assert_eq!(args.modalities, vec![Modality::Rgb, Modality::SemsegMasked]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_modality_rejected() {
        let parsed = Cli::try_parse_from(["carla-capture", "archive", "x", "--modality", "meta"]);
        assert!(parsed.is_err());
        assert!(parse_modality("meta").unwrap_err().contains("semseg"));
    }
}
