//! RuntimeGraph - Actor Factory output
//!
//! Handles of every actor spawned for one capture run.

use crate::SensorKind;

/// CARLA actor handle type
pub type ActorId = u32;

/// A spawned sensor and where it is mounted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnedSensor {
    /// Configuration ID
    pub sensor_id: String,
    pub kind: SensorKind,
    pub actor_id: ActorId,
    /// Actor the sensor is attached to
    pub parent_id: ActorId,
}

/// Runtime actor graph
///
/// Sensors are kept in spawn order; that order is the registration order
/// used by the tick synchronizer.
#[derive(Debug, Clone, Default)]
pub struct RuntimeGraph {
    /// Vehicle ID -> Actor handle, in spawn order
    pub vehicles: Vec<(String, ActorId)>,

    /// Sensors in spawn order
    pub sensors: Vec<SpawnedSensor>,
}

impl RuntimeGraph {
    /// Create empty RuntimeGraph
    pub fn new() -> Self {
        Self::default()
    }

    /// Register vehicle
    pub fn register_vehicle(&mut self, id: impl Into<String>, actor_id: ActorId) {
        self.vehicles.push((id.into(), actor_id));
    }

    /// Register sensor
    pub fn register_sensor(
        &mut self,
        sensor_id: impl Into<String>,
        kind: SensorKind,
        actor_id: ActorId,
        parent_id: ActorId,
    ) {
        self.sensors.push(SpawnedSensor {
            sensor_id: sensor_id.into(),
            kind,
            actor_id,
            parent_id,
        });
    }

    pub fn vehicle(&self, id: &str) -> Option<ActorId> {
        self.vehicles
            .iter()
            .find(|(vehicle_id, _)| vehicle_id == id)
            .map(|(_, actor_id)| *actor_id)
    }

    pub fn sensor(&self, id: &str) -> Option<&SpawnedSensor> {
        self.sensors.iter().find(|s| s.sensor_id == id)
    }

    /// First sensor of the given kind
    pub fn first_of_kind(&self, kind: SensorKind) -> Option<&SpawnedSensor> {
        self.sensors.iter().find(|s| s.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty() && self.sensors.is_empty()
    }

    /// All actor handles in teardown order (sensors before their parents)
    pub fn all_actor_ids(&self) -> Vec<ActorId> {
        self.sensors
            .iter()
            .rev()
            .map(|s| s.actor_id)
            .chain(self.vehicles.iter().rev().map(|(_, id)| *id))
            .collect()
    }
}
