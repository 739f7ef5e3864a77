//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{CaptureBlueprint, TimeoutPolicy};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    map: String,
    spawn_points: usize,
    total_runs: usize,
    recorded_frames_per_run: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    map: blueprint.world.map.clone(),
                    spawn_points: blueprint.vehicle.spawn_points.len(),
                    total_runs: blueprint.total_runs(),
                    recorded_frames_per_run: blueprint.run.recorded_frames(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &CaptureBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    let mut seen = std::collections::HashSet::new();
    for index in &blueprint.vehicle.spawn_points {
        if !seen.insert(index) {
            warnings.push(format!(
                "Spawn point {index} listed more than once - its run folders will collide"
            ));
        }
    }

    if !blueprint.vehicle.autopilot {
        warnings.push("Autopilot disabled - the vehicle will stay in place".to_string());
    }

    if blueprint.sync.on_timeout == TimeoutPolicy::Skip && blueprint.sync.timeout_sec < 0.1 {
        warnings.push(format!(
            "sync.timeout_sec = {} is very short - most ticks may be skipped",
            blueprint.sync.timeout_sec
        ));
    }

    if !blueprint.output.write_run_metadata {
        warnings.push("output.write_run_metadata is off - run.json will not be written".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Map: {}", summary.map);
            println!("  Spawn points: {}", summary.spawn_points);
            println!("  Runs: {}", summary.total_runs);
            println!("  Frames per run: {}", summary.recorded_frames_per_run);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
