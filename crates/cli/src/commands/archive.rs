//! `archive` command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use contracts::Modality;
use exporter::package_archive;
use tracing::info;

use crate::cli::ArchiveArgs;

/// Execute the `archive` command
pub fn run_archive(args: &ArchiveArgs) -> Result<()> {
    if !args.base_dir.is_dir() {
        anyhow::bail!("Session folder not found: {}", args.base_dir.display());
    }

    let blueprint = config_loader::ConfigLoader::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    let modalities: Vec<Modality> = if args.modalities.is_empty() {
        blueprint.archive.modalities.clone()
    } else {
        args.modalities.clone()
    };
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&blueprint.archive.output));

    info!(
        base_dir = %args.base_dir.display(),
        modalities = ?modalities,
        output = %output.display(),
        "Packaging session"
    );
    let summary = package_archive(&args.base_dir, &modalities, &output)
        .context("Failed to package archive")?;

    println!(
        "Archived {} file(s) from {} run folder(s) into {}",
        summary.entries,
        summary.folders,
        summary.output.display()
    );
    Ok(())
}
