//! CARLA SensorSource wrappers
//!
//! Wraps CARLA native sensors and the world tick notification as
//! `SensorSource`. Only compiled when `real-carla` feature is enabled.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use carla::client::{Sensor, World};
use contracts::{
    SensorKind, SensorPayload, SensorRecord, SensorRecordCallback, SensorSource, Tick,
    WorldSnapshot,
};
use tracing::{debug, trace, warn};

use crate::sensor_data_converter::convert_sensor_data;

/// CARLA Sensor wrapper
pub struct CarlaSensorSource {
    sensor_id: String,
    kind: SensorKind,
    sensor: Sensor,
    listening: Arc<AtomicBool>,
}

impl CarlaSensorSource {
    /// Create new CARLA sensor source
    pub fn new(sensor_id: String, kind: SensorKind, sensor: Sensor) -> Self {
        Self {
            sensor_id,
            kind,
            sensor,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SensorSource for CarlaSensorSource {
    fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    fn sensor_kind(&self) -> SensorKind {
        self.kind
    }

    fn listen(&self, callback: SensorRecordCallback) {
        // Idempotent: if already listening, don't register again
        if self.listening.swap(true, Ordering::SeqCst) {
            warn!(sensor_id = %self.sensor_id, "sensor already listening");
            return;
        }

        let sensor_id = self.sensor_id.clone();
        let kind = self.kind;
        let listening = self.listening.clone();

        debug!(sensor_id = %sensor_id, kind = kind.as_str(), "starting CARLA sensor");

        self.sensor.listen(move |sensor_data| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            match convert_sensor_data(&sensor_id, kind, &sensor_data) {
                Some(record) => {
                    trace!(sensor_id = %sensor_id, tick = %record.tick, "CARLA sensor data received");
                    callback(record);
                }
                None => {
                    trace!(sensor_id = %sensor_id, "failed to convert sensor data");
                }
            }
        });
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(sensor_id = %self.sensor_id, "stopping CARLA sensor");
            self.sensor.stop();
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

/// The world's on-tick notification as a record source
pub struct CarlaWorldTickSource {
    sensor_id: String,
    world: Mutex<World>,
    listening: Arc<AtomicBool>,
    callback_id: AtomicUsize,
}

impl CarlaWorldTickSource {
    pub fn new(sensor_id: String, world: World) -> Self {
        Self {
            sensor_id,
            world: Mutex::new(world),
            listening: Arc::new(AtomicBool::new(false)),
            callback_id: AtomicUsize::new(0),
        }
    }
}

impl SensorSource for CarlaWorldTickSource {
    fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    fn sensor_kind(&self) -> SensorKind {
        SensorKind::WorldTick
    }

    fn listen(&self, callback: SensorRecordCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let sensor_id = self.sensor_id.clone();
        let listening = self.listening.clone();
        let mut world = self.world.lock().unwrap_or_else(PoisonError::into_inner);
        let id = world.on_tick(move |snapshot| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }
            let timestamp = snapshot.timestamp();
            callback(SensorRecord {
                sensor_id: sensor_id.clone(),
                kind: SensorKind::WorldTick,
                tick: Tick::new(snapshot.frame() as u64),
                timestamp: timestamp.elapsed_seconds,
                payload: SensorPayload::WorldTick(WorldSnapshot {
                    elapsed_seconds: timestamp.elapsed_seconds,
                    delta_seconds: timestamp.delta_seconds,
                }),
            });
        });
        self.callback_id.store(id, Ordering::SeqCst);
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            let mut world = self.world.lock().unwrap_or_else(PoisonError::into_inner);
            world.remove_on_tick(self.callback_id.load(Ordering::SeqCst));
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
