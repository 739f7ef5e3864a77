//! SensorSource trait - asynchronous record producer abstraction
//!
//! Decouples the frame queues from concrete simulator sensors, so real CARLA
//! sensors, the world tick notification and mock sensors are consumed alike.

use std::sync::Arc;

use crate::{SensorKind, SensorRecord};

/// Record callback type
///
/// Invoked on the producer's own thread every time a record is produced.
pub type SensorRecordCallback = Arc<dyn Fn(SensorRecord) + Send + Sync>;

/// Sensor data source trait
///
/// Push-model producer: once `listen` is called the source delivers one
/// `SensorRecord` per tick through the callback until `stop` is called.
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn SensorSource> = client.get_sensor_source(actor_id, id, kind)?;
/// source.listen(Arc::new(|record| {
///     println!("tick {} from {}", record.tick, record.sensor_id);
/// }));
/// // ... advance the world ...
/// source.stop();
/// ```
pub trait SensorSource: Send + Sync {
    /// Get sensor ID
    fn sensor_id(&self) -> &str;

    /// Get sensor kind
    fn sensor_kind(&self) -> SensorKind;

    /// Register record callback
    ///
    /// Repeated calls while already listening are ignored.
    fn listen(&self, callback: SensorRecordCallback);

    /// Stop listening; no callback invocation starts after this returns.
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
