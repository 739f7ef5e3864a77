//! LogSink - logs frame summary via tracing

use contracts::{CapturedFrame, ContractError, FrameSink};
use tracing::{info, instrument};

/// Sink that logs frame summaries for debugging
pub struct LogSink {
    name: String,
    frames: u64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frames: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn log_frame_summary(&self, frame: &CapturedFrame) {
        let modalities: Vec<&str> = frame.outputs.iter().map(|(m, _)| m.dir_name()).collect();
        let pose = frame.camera_pose.location;

        info!(
            sink = %self.name,
            sequence = frame.sequence,
            tick = %frame.tick,
            timestamp = frame.timestamp,
            x = pose.x,
            y = pose.y,
            z = pose.z,
            outputs = ?modalities,
            "frame captured"
        );
    }
}

impl FrameSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, frame),
        fields(sink = %self.name, sequence = frame.sequence)
    )]
    async fn write(&mut self, frame: &CapturedFrame) -> Result<(), ContractError> {
        self.log_frame_summary(frame);
        self.frames += 1;
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, frames = self.frames, "LogSink closed");
        Ok(())
    }
}
