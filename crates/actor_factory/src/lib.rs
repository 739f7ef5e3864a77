//! # Actor Factory
//!
//! Simulator access and asset lifecycle.
//!
//! Responsibilities:
//! - Abstract the simulator server behind `SimulatorClient`
//! - Prepare the scene (map, weather, traffic lights)
//! - Spawn the camera rig or the lidar rig from `CaptureBlueprint`
//! - Provide teardown, rollback and cleanup by actor type
//! - Provide a deterministic in-process simulator for tests
//!
//! ## Feature Flags
//!
//! - `real-carla`: Enable real CARLA client (requires carla crate)

pub mod client;
pub mod error;
pub mod factory;
pub mod mock_client;
pub mod mock_sensor;
pub mod spawn_search;

#[cfg(feature = "real-carla")]
pub mod carla_client;
#[cfg(feature = "real-carla")]
pub mod carla_sensor_source;
#[cfg(feature = "real-carla")]
pub mod sensor_data_converter;

pub use client::{SimulatorClient, TRAFFIC_LIGHT_TYPE};
pub use contracts::{ActorId, CaptureBlueprint, RuntimeGraph, SensorSource};
pub use error::{ActorFactoryError, Result};
pub use factory::{
    ActorFactory, CAMERA_RIG, DEPTH_SENSOR_ID, EGO_VEHICLE_ID, LIDAR_SENSOR_ID, RGB_SENSOR_ID,
    SEMSEG_SENSOR_ID,
};
pub use mock_client::{DelayedDelivery, MockConfig, MockSimulator, MOCK_MAPS};
pub use mock_sensor::MockSensorSource;
pub use spawn_search::closest_spawn_point;

#[cfg(feature = "real-carla")]
pub use carla_client::RealCarlaClient;
#[cfg(feature = "real-carla")]
pub use carla_sensor_source::{CarlaSensorSource, CarlaWorldTickSource};
