//! 数据集打包
//!
//! 把会话目录下每个运行目录的选定模态子目录打成一个 zip；
//! `camera.txt` / `focal.txt` 只取第一个运行目录（按名称排序）。

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contracts::Modality;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{ExportError, Result};
use crate::layout::{CAMERA_FILE, FOCAL_FILE};

/// Result of a packaging pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub output: PathBuf,
    /// Run folders visited
    pub folders: usize,
    /// Files written into the archive
    pub entries: usize,
}

/// Sorted names of the run folders directly under `base_dir`
pub fn run_folders(base_dir: &Path) -> Result<Vec<String>> {
    if !base_dir.is_dir() {
        return Err(ExportError::NotADirectory(base_dir.to_path_buf()));
    }
    let mut folders = Vec::new();
    for entry in WalkDir::new(base_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_dir() {
            folders.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(folders)
}

/// Archive entry names relative to `base_dir`, in insertion order
///
/// Modality-major: every folder's `rgb/` first, then every folder's
/// `semseg/`, and so on. Each name appears once.
pub fn collect_entries(base_dir: &Path, modalities: &[Modality]) -> Result<Vec<String>> {
    let folders = run_folders(base_dir)?;
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    let mut push = |name: String| {
        if seen.insert(name.clone()) {
            entries.push(name);
        }
    };

    for modality in modalities {
        for (i, folder) in folders.iter().enumerate() {
            let dir = base_dir.join(folder).join(modality.dir_name());
            if dir.is_dir() {
                for entry in WalkDir::new(&dir)
                    .min_depth(1)
                    .max_depth(1)
                    .sort_by_file_name()
                {
                    let entry = entry?;
                    if entry.file_type().is_file() {
                        push(format!(
                            "{folder}/{}/{}",
                            modality.dir_name(),
                            entry.file_name().to_string_lossy()
                        ));
                    }
                }
            } else {
                warn!(dir = %dir.display(), "modality folder missing, skipped");
            }

            if i == 0 {
                for file in [CAMERA_FILE, FOCAL_FILE] {
                    if base_dir.join(folder).join(file).is_file() {
                        push(format!("{folder}/{file}"));
                    } else {
                        warn!(folder = %folder, file, "run file missing, skipped");
                    }
                }
            }
        }
    }
    Ok(entries)
}

/// Package `base_dir` into a zip at `output`
#[instrument(
    name = "archive_package",
    skip_all,
    fields(base_dir = %base_dir.display(), output = %output.display())
)]
pub fn package_archive(
    base_dir: &Path,
    modalities: &[Modality],
    output: &Path,
) -> Result<ArchiveSummary> {
    let folders = run_folders(base_dir)?.len();
    let entries = collect_entries(base_dir, modalities)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ExportError::io(parent, e))?;
    }
    let file = File::create(output).map_err(|e| ExportError::io(output, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for name in &entries {
        let source = base_dir.join(name);
        let bytes = fs::read(&source).map_err(|e| ExportError::io(&source, e))?;
        zip.start_file(name.as_str(), options)?;
        zip.write_all(&bytes)
            .map_err(|e| ExportError::io(output, e))?;
        debug!(entry = %name, size = bytes.len(), "archived");
    }

    let mut inner = zip.finish()?;
    inner.flush().map_err(|e| ExportError::io(output, e))?;

    info!(folders, entries = entries.len(), "archive written");
    Ok(ArchiveSummary {
        output: output.to_path_buf(),
        folders,
        entries: entries.len(),
    })
}
