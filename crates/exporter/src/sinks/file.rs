//! FileSink - writes captured frames into a run folder

use std::path::PathBuf;

use contracts::{CapturedFrame, ContractError, FrameSink, Modality};
use tracing::{debug, error, instrument};

use crate::error::ExportError;
use crate::run::RunWriter;

/// Sink that persists frame outputs and writes the pose table on close
pub struct FileSink {
    name: String,
    writer: RunWriter,
    closed: bool,
}

impl FileSink {
    /// Create the run folder at `dir` with one subfolder per modality
    pub fn create(
        name: impl Into<String>,
        dir: impl Into<PathBuf>,
        modalities: &[Modality],
    ) -> Result<Self, ExportError> {
        Ok(Self {
            name: name.into(),
            writer: RunWriter::create(dir, modalities)?,
            closed: false,
        })
    }

    pub fn writer(&self) -> &RunWriter {
        &self.writer
    }

    fn sink_error(&self, e: ExportError) -> ContractError {
        error!(sink = %self.name, error = %e, "write failed");
        ContractError::sink_write(&self.name, e.to_string())
    }
}

impl FrameSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, frame),
        fields(sink = %self.name, sequence = frame.sequence)
    )]
    async fn write(&mut self, frame: &CapturedFrame) -> Result<(), ContractError> {
        if let Err(e) = self.writer.write_frame(frame) {
            return Err(self.sink_error(e));
        }
        Ok(())
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    /// Writes the pose table once; later calls are no-ops
    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Err(e) = self.writer.write_pose_table() {
            return Err(self.sink_error(e));
        }
        debug!(
            sink = %self.name,
            frames = self.writer.frames_written(),
            "FileSink closed"
        );
        Ok(())
    }
}
