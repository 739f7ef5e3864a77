//! Sinks of one run

use std::path::Path;

use contracts::{CapturedFrame, FrameSink, Modality};
use exporter::{FileSink, LogSink, RunWriter};
use observability::record_frame_written;
use tracing::warn;

use crate::error::Result;

/// Camera modalities written for every captured tick
pub const CAMERA_MODALITIES: [Modality; 5] = [
    Modality::Rgb,
    Modality::MaskedRgb,
    Modality::Depth,
    Modality::Semseg,
    Modality::SemsegMasked,
];

/// The run folder writer plus an optional log sink
pub(crate) struct RunSinks {
    file: FileSink,
    log: Option<LogSink>,
}

impl RunSinks {
    pub(crate) fn create(dir: &Path, log_frames: bool) -> Result<Self> {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "run".to_string());
        Ok(Self {
            file: FileSink::create(format!("file:{name}"), dir, &CAMERA_MODALITIES)?,
            log: log_frames.then(|| LogSink::new(format!("log:{name}"))),
        })
    }

    pub(crate) fn writer(&self) -> &RunWriter {
        self.file.writer()
    }

    pub(crate) async fn write(&mut self, frame: &CapturedFrame) -> Result<()> {
        let result = self.file.write(frame).await;
        record_frame_written(self.file.name(), result.is_ok());
        result?;

        if let Some(log) = self.log.as_mut() {
            let result = log.write(frame).await;
            record_frame_written(log.name(), result.is_ok());
            result?;
        }
        Ok(())
    }

    /// Close every sink; the first error is returned after all were closed
    pub(crate) async fn close(&mut self) -> Result<()> {
        let file = self.file.close().await;
        if let Some(log) = self.log.as_mut() {
            if let Err(e) = log.close().await {
                warn!(sink = log.name(), error = %e, "failed to close sink");
            }
        }
        file?;
        Ok(())
    }
}
