//! Simulator client abstraction
//!
//! Everything the capture tool needs from the simulator server, so the
//! session driver and the tick synchronizer run unchanged against the real
//! CARLA client or the in-process mock.

use std::future::Future;
use std::time::Duration;

use contracts::{
    ActorId, SensorKind, SensorSource, Tick, Transform, WeatherParameters, WorldSettings,
};

use crate::error::Result;

/// Blueprint/type id of traffic light actors
pub const TRAFFIC_LIGHT_TYPE: &str = "traffic.traffic_light";

/// Simulator client trait
///
/// Methods take `&self` (except `connect`) so one client can be shared by
/// the synchronizer and the driver for the duration of a run.
pub trait SimulatorClient: Send + Sync {
    /// Connect to the server; `timeout` bounds every later RPC.
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Name of the currently loaded map (e.g. "Town03")
    fn map_name(&self) -> impl Future<Output = Result<String>> + Send;

    /// Load a map; unknown names yield `BlueprintNotFound`.
    fn load_world(&self, map: &str) -> impl Future<Output = Result<()>> + Send;

    fn set_weather(&self, weather: WeatherParameters) -> impl Future<Output = Result<()>> + Send;

    /// Current world settings
    fn world_settings(&self) -> impl Future<Output = Result<WorldSettings>> + Send;

    /// Apply settings, returning the frame id at which they take effect
    fn apply_settings(
        &self,
        settings: WorldSettings,
    ) -> impl Future<Output = Result<Tick>> + Send;

    /// Request exactly one simulation step (synchronous mode) and return its tick
    fn tick(&self) -> impl Future<Output = Result<Tick>> + Send;

    /// The world's own per-tick notification as a record source
    fn world_tick_source(&self) -> Option<Box<dyn SensorSource>>;

    /// Recommended vehicle spawn points of the loaded map
    fn spawn_points(&self) -> impl Future<Output = Result<Vec<Transform>>> + Send;

    /// Spectator actor handle
    fn spectator(&self) -> impl Future<Output = Result<ActorId>> + Send;

    /// Spawn vehicle
    ///
    /// # Arguments
    /// * `blueprint` - Blueprint name, e.g., "vehicle.tesla.model3"
    /// * `transform` - Initial world pose
    /// * `attributes` - Blueprint attributes (e.g. `color`)
    fn spawn_vehicle(
        &self,
        blueprint: &str,
        transform: Transform,
        attributes: &[(String, String)],
    ) -> impl Future<Output = Result<ActorId>> + Send;

    /// Spawn sensor and attach to parent actor
    ///
    /// # Arguments
    /// * `blueprint` - Blueprint name, e.g., "sensor.camera.rgb"
    /// * `transform` - Pose relative to parent actor
    /// * `parent_id` - Parent actor ID
    /// * `attributes` - Sensor attributes
    fn spawn_sensor(
        &self,
        blueprint: &str,
        transform: Transform,
        parent_id: ActorId,
        attributes: &[(String, String)],
    ) -> impl Future<Output = Result<ActorId>> + Send;

    /// Recommended values of a blueprint attribute (empty if the attribute is absent)
    fn recommended_attribute_values(
        &self,
        blueprint: &str,
        attribute: &str,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    fn set_autopilot(
        &self,
        actor_id: ActorId,
        enabled: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Switch every traffic light to green, returning how many were changed
    fn set_traffic_lights_green(&self) -> impl Future<Output = Result<usize>> + Send;

    /// World pose of an actor
    fn actor_transform(&self, actor_id: ActorId)
        -> impl Future<Output = Result<Transform>> + Send;

    fn set_actor_transform(
        &self,
        actor_id: ActorId,
        transform: Transform,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Handles of every live actor whose type id equals `type_id`
    fn actors_of_type(&self, type_id: &str)
        -> impl Future<Output = Result<Vec<ActorId>>> + Send;

    /// Destroy actor
    ///
    /// Idempotent operation: returns Ok if actor doesn't exist
    fn destroy_actor(&self, actor_id: ActorId) -> impl Future<Output = Result<()>> + Send;

    /// Check if actor exists
    fn actor_exists(&self, actor_id: ActorId) -> impl Future<Output = Result<bool>> + Send;

    /// Get sensor data source
    ///
    /// Returns an object implementing `SensorSource`, consumed by a frame queue.
    ///
    /// # Returns
    /// Boxed trait object implementing `SensorSource`, None if actor doesn't exist
    fn get_sensor_source(
        &self,
        actor_id: ActorId,
        sensor_id: String,
        kind: SensorKind,
    ) -> Option<Box<dyn SensorSource>>;
}
