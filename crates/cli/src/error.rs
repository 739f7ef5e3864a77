//! Error types for capture sessions.

use actor_factory::ActorFactoryError;
use contracts::{ContractError, Tick};
use exporter::ExportError;
use postprocess::PostprocessError;
use sync_engine::SyncError;
use thiserror::Error;

/// Session driver error types
#[derive(Error, Debug)]
pub enum SessionError {
    /// Scene setup, spawning or pose query failed
    #[error("simulator error: {0}")]
    Simulator(#[from] ActorFactoryError),

    /// Tick synchronization failed (timeout under `abort`, violation, ...)
    #[error("synchronization failed: {0}")]
    Sync(#[from] SyncError),

    /// Post-processing of one tick failed
    #[error("post-processing failed at tick {tick}: {source}")]
    Postprocess {
        tick: Tick,
        #[source]
        source: PostprocessError,
    },

    /// Writing outputs failed
    #[error("export failed: {0}")]
    Export(#[from] ExportError),

    /// A frame sink rejected a frame
    #[error("sink error: {0}")]
    Sink(#[from] ContractError),

    /// A synced tick lacked the record of an expected sensor
    #[error("tick {tick} has no record from sensor '{sensor_id}'")]
    MissingRecord { sensor_id: String, tick: Tick },

    /// A sensor delivered a payload of the wrong type
    #[error("sensor '{sensor_id}' delivered an unexpected {found} payload")]
    UnexpectedPayload {
        sensor_id: String,
        found: &'static str,
    },
}

impl SessionError {
    pub fn missing_record(sensor_id: impl Into<String>, tick: Tick) -> Self {
        Self::MissingRecord {
            sensor_id: sensor_id.into(),
            tick,
        }
    }

    pub fn unexpected_payload(sensor_id: impl Into<String>, found: &'static str) -> Self {
        Self::UnexpectedPayload {
            sensor_id: sensor_id.into(),
            found,
        }
    }

    /// Tick-level synchronization violation
    pub fn is_violation(&self) -> bool {
        matches!(self, Self::Sync(e) if e.is_violation())
    }
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
