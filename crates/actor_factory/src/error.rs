//! Actor Factory error types

use contracts::ActorId;
use thiserror::Error;

/// Actor Factory specific error
#[derive(Debug, Error)]
pub enum ActorFactoryError {
    /// CARLA connection error
    #[error("failed to connect to CARLA: {message}")]
    ConnectionFailed { message: String },

    /// Unknown blueprint, map or spawn point; the session cannot start.
    #[error("configuration error: {message}")]
    BlueprintNotFound { message: String },

    /// Vehicle spawn error
    #[error("failed to spawn vehicle '{blueprint}': {message}")]
    VehicleSpawnFailed { blueprint: String, message: String },

    /// Sensor spawn error
    #[error("failed to spawn sensor '{sensor_id}' on actor {parent_id}: {message}")]
    SensorSpawnFailed {
        sensor_id: String,
        parent_id: ActorId,
        message: String,
    },

    /// Actor handle does not refer to a live actor
    #[error("actor {actor_id} not found")]
    ActorNotFound { actor_id: ActorId },

    /// Destroy error
    #[error("failed to destroy actor {actor_id}: {message}")]
    DestroyFailed { actor_id: ActorId, message: String },

    /// Any other simulator-side failure (tick, settings, weather)
    #[error("simulator error: {message}")]
    Simulator { message: String },
}

impl ActorFactoryError {
    pub fn blueprint_not_found(message: impl Into<String>) -> Self {
        Self::BlueprintNotFound {
            message: message.into(),
        }
    }

    /// Create vehicle spawn error
    pub fn vehicle_spawn(blueprint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::VehicleSpawnFailed {
            blueprint: blueprint.into(),
            message: message.into(),
        }
    }

    /// Create sensor spawn error
    pub fn sensor_spawn(
        sensor_id: impl Into<String>,
        parent_id: ActorId,
        message: impl Into<String>,
    ) -> Self {
        Self::SensorSpawnFailed {
            sensor_id: sensor_id.into(),
            parent_id,
            message: message.into(),
        }
    }

    pub fn simulator(message: impl Into<String>) -> Self {
        Self::Simulator {
            message: message.into(),
        }
    }

    /// Configuration problems are fatal and reported to the operator as-is.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::BlueprintNotFound { .. })
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ActorFactoryError>;
