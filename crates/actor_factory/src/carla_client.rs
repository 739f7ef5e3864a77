//! Real CARLA client implementation
//!
//! Connects to CARLA server using carla-rust crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use carla::client::{ActorBase, Client, Sensor, TrafficLight, Vehicle, World};
use carla::geom::{Location, Rotation, Transform as CarlaTransform};
use carla::rpc::{TrafficLightState, WeatherParameters as CarlaWeather};
use contracts::{
    ActorId, SensorKind, SensorSource, Tick, Transform, WeatherParameters, WorldSettings,
    WORLD_TICK_SENSOR_ID,
};
use tracing::{debug, info, instrument, warn};

use crate::carla_sensor_source::{CarlaSensorSource, CarlaWorldTickSource};
use crate::client::{SimulatorClient, TRAFFIC_LIGHT_TYPE};
use crate::error::{ActorFactoryError, Result};

/// Real CARLA client
///
/// Wraps carla-rust's Client, implements SimulatorClient trait.
/// Uses Mutex for interior mutability, allowing `&self` methods to modify World.
#[derive(Default, Clone)]
pub struct RealCarlaClient {
    /// CARLA client
    client: Arc<Mutex<Option<Client>>>,
    /// World reference (uses Mutex for interior mutability)
    world: Arc<Mutex<Option<World>>>,
    /// Actors created through this client (for sensor sources)
    actors: Arc<Mutex<HashMap<ActorId, ActorType>>>,
    timeout: Duration,
}

/// Actor type enumeration
#[derive(Clone)]
enum ActorType {
    Vehicle(Vehicle),
    Sensor(Sensor),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RealCarlaClient {
    /// Create new client (disconnected state)
    pub fn new() -> Self {
        Self::default()
    }

    /// Access World with mutable reference, ensuring connected
    fn with_world_mut<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut World) -> Result<R>,
    {
        let mut world_guard = lock(&self.world);
        let world = world_guard
            .as_mut()
            .ok_or_else(|| ActorFactoryError::ConnectionFailed {
                message: "not connected to CARLA server".into(),
            })?;
        f(world)
    }

    /// Save actor to registry
    fn store_actor(&self, actor_id: ActorId, actor: ActorType) {
        lock(&self.actors).insert(actor_id, actor);
    }

    /// Convert internal Transform to CARLA Transform
    fn to_carla_transform(transform: Transform) -> CarlaTransform {
        CarlaTransform {
            location: Location {
                x: transform.location.x as f32,
                y: transform.location.y as f32,
                z: transform.location.z as f32,
            },
            rotation: Rotation {
                pitch: transform.rotation.pitch as f32,
                yaw: transform.rotation.yaw as f32,
                roll: transform.rotation.roll as f32,
            },
        }
    }

    fn from_carla_transform(transform: &CarlaTransform) -> Transform {
        Transform::new(
            contracts::Location::new(
                f64::from(transform.location.x),
                f64::from(transform.location.y),
                f64::from(transform.location.z),
            ),
            contracts::Rotation {
                pitch: f64::from(transform.rotation.pitch),
                yaw: f64::from(transform.rotation.yaw),
                roll: f64::from(transform.rotation.roll),
            },
        )
    }

    fn to_carla_weather(weather: &WeatherParameters) -> CarlaWeather {
        CarlaWeather {
            cloudiness: weather.cloudiness,
            precipitation: weather.precipitation,
            precipitation_deposits: weather.precipitation_deposits,
            wind_intensity: weather.wind_intensity,
            sun_azimuth_angle: weather.sun_azimuth_angle,
            sun_altitude_angle: weather.sun_altitude_angle,
            fog_density: weather.fog_density,
            fog_distance: weather.fog_distance,
            fog_falloff: weather.fog_falloff,
            wetness: weather.wetness,
            scattering_intensity: weather.scattering_intensity,
            mie_scattering_scale: weather.mie_scattering_scale,
            rayleigh_scattering_scale: weather.rayleigh_scattering_scale,
            ..CarlaWeather::default()
        }
    }

    fn find_actor(world: &World, actor_id: ActorId) -> Result<carla::client::Actor> {
        world
            .actor(actor_id)
            .ok_or(ActorFactoryError::ActorNotFound { actor_id })
    }

    /// Get underlying CARLA Sensor object
    pub fn get_sensor(&self, actor_id: ActorId) -> Option<Sensor> {
        match lock(&self.actors).get(&actor_id) {
            Some(ActorType::Sensor(sensor)) => Some(sensor.clone()),
            _ => None,
        }
    }
}

impl SimulatorClient for RealCarlaClient {
    #[instrument(name = "real_carla_connect", skip(self), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        let mut client = Client::connect(host, port, None);
        client.set_timeout(timeout);
        let world = client.world();

        info!(map = %world.map().name(), "connected to CARLA server");

        *lock(&self.client) = Some(client);
        *lock(&self.world) = Some(world);
        self.timeout = timeout;

        Ok(())
    }

    async fn map_name(&self) -> Result<String> {
        self.with_world_mut(|world| Ok(world.map().name().to_string()))
    }

    #[instrument(name = "real_carla_load_world", skip(self), fields(map = %map))]
    async fn load_world(&self, map: &str) -> Result<()> {
        let mut client_guard = lock(&self.client);
        let client = client_guard
            .as_mut()
            .ok_or_else(|| ActorFactoryError::ConnectionFailed {
                message: "not connected to CARLA server".into(),
            })?;

        if !client.available_maps().iter().any(|m| m.ends_with(map)) {
            return Err(ActorFactoryError::blueprint_not_found(format!(
                "map '{map}' not available"
            )));
        }

        let world = client.load_world(map);
        *lock(&self.world) = Some(world);
        Ok(())
    }

    async fn set_weather(&self, weather: WeatherParameters) -> Result<()> {
        self.with_world_mut(|world| {
            world.set_weather(&Self::to_carla_weather(&weather));
            Ok(())
        })
    }

    async fn world_settings(&self) -> Result<WorldSettings> {
        self.with_world_mut(|world| {
            let settings = world.settings();
            Ok(WorldSettings {
                synchronous_mode: settings.synchronous_mode,
                no_rendering_mode: settings.no_rendering_mode,
                fixed_delta_seconds: settings.fixed_delta_seconds,
            })
        })
    }

    #[instrument(name = "real_carla_apply_settings", skip(self))]
    async fn apply_settings(&self, settings: WorldSettings) -> Result<Tick> {
        let timeout = self.timeout;
        self.with_world_mut(|world| {
            let mut episode = world.settings();
            episode.synchronous_mode = settings.synchronous_mode;
            episode.no_rendering_mode = settings.no_rendering_mode;
            episode.fixed_delta_seconds = settings.fixed_delta_seconds;
            let frame = world.apply_settings(&episode, timeout);
            Ok(Tick::new(frame))
        })
    }

    async fn tick(&self) -> Result<Tick> {
        let timeout = self.timeout;
        self.with_world_mut(|world| {
            world
                .tick_or_timeout(timeout)
                .map(Tick::new)
                .ok_or_else(|| ActorFactoryError::simulator("world tick timed out"))
        })
    }

    fn world_tick_source(&self) -> Option<Box<dyn SensorSource>> {
        let world = lock(&self.world).clone()?;
        Some(Box::new(CarlaWorldTickSource::new(
            WORLD_TICK_SENSOR_ID.to_string(),
            world,
        )))
    }

    async fn spawn_points(&self) -> Result<Vec<Transform>> {
        self.with_world_mut(|world| {
            Ok(world
                .map()
                .recommended_spawn_points()
                .iter()
                .map(|t| Self::from_carla_transform(&t))
                .collect())
        })
    }

    async fn spectator(&self) -> Result<ActorId> {
        self.with_world_mut(|world| Ok(world.spectator().id()))
    }

    #[instrument(
        name = "real_carla_spawn_vehicle",
        skip(self, transform, attributes),
        fields(blueprint = %blueprint)
    )]
    async fn spawn_vehicle(
        &self,
        blueprint: &str,
        transform: Transform,
        attributes: &[(String, String)],
    ) -> Result<ActorId> {
        let vehicle = self.with_world_mut(|world| {
            let mut vehicle_bp = world.blueprint_library().find(blueprint).ok_or_else(|| {
                ActorFactoryError::blueprint_not_found(format!(
                    "blueprint '{blueprint}' not found"
                ))
            })?;
            for (key, value) in attributes {
                if !vehicle_bp.set_attribute(key, value) {
                    warn!(key, value, "failed to set vehicle attribute");
                }
            }

            let actor = world
                .spawn_actor(&vehicle_bp, &Self::to_carla_transform(transform))
                .map_err(|e| ActorFactoryError::vehicle_spawn(blueprint, e.to_string()))?;
            Vehicle::try_from(actor).map_err(|_| {
                ActorFactoryError::vehicle_spawn(blueprint, "spawned actor is not a vehicle")
            })
        })?;

        let actor_id = vehicle.id();
        debug!(actor_id, blueprint, "vehicle spawned");
        self.store_actor(actor_id, ActorType::Vehicle(vehicle));
        Ok(actor_id)
    }

    #[instrument(
        name = "real_carla_spawn_sensor",
        skip(self, transform, attributes),
        fields(blueprint = %blueprint, parent_id)
    )]
    async fn spawn_sensor(
        &self,
        blueprint: &str,
        transform: Transform,
        parent_id: ActorId,
        attributes: &[(String, String)],
    ) -> Result<ActorId> {
        let sensor = self.with_world_mut(|world| {
            let parent = Self::find_actor(world, parent_id)?;
            let mut sensor_bp = world.blueprint_library().find(blueprint).ok_or_else(|| {
                ActorFactoryError::blueprint_not_found(format!(
                    "blueprint '{blueprint}' not found"
                ))
            })?;

            for (key, value) in attributes {
                if !sensor_bp.set_attribute(key, value) {
                    warn!(key, value, "failed to set sensor attribute");
                }
            }

            let actor = world
                .spawn_actor_attached(
                    &sensor_bp,
                    &Self::to_carla_transform(transform),
                    &parent,
                    None,
                )
                .map_err(|e| ActorFactoryError::sensor_spawn(blueprint, parent_id, e.to_string()))?;

            Sensor::try_from(actor).map_err(|_| {
                ActorFactoryError::sensor_spawn(blueprint, parent_id, "spawned actor is not a sensor")
            })
        })?;

        let actor_id = sensor.id();
        debug!(actor_id, blueprint, parent_id, "sensor spawned and attached");
        self.store_actor(actor_id, ActorType::Sensor(sensor));
        Ok(actor_id)
    }

    async fn recommended_attribute_values(
        &self,
        blueprint: &str,
        attribute: &str,
    ) -> Result<Vec<String>> {
        self.with_world_mut(|world| {
            let bp = world.blueprint_library().find(blueprint).ok_or_else(|| {
                ActorFactoryError::blueprint_not_found(format!(
                    "blueprint '{blueprint}' not found"
                ))
            })?;
            Ok(bp
                .attribute(attribute)
                .map(|attr| attr.recommended_values())
                .unwrap_or_default())
        })
    }

    async fn set_autopilot(&self, actor_id: ActorId, enabled: bool) -> Result<()> {
        match lock(&self.actors).get(&actor_id) {
            Some(ActorType::Vehicle(vehicle)) => {
                vehicle.set_autopilot(enabled);
                info!(actor_id, enabled, "autopilot updated");
                Ok(())
            }
            _ => Err(ActorFactoryError::ActorNotFound { actor_id }),
        }
    }

    async fn set_traffic_lights_green(&self) -> Result<usize> {
        self.with_world_mut(|world| {
            let mut count = 0;
            for actor in world.actors().iter() {
                if actor.type_id() != TRAFFIC_LIGHT_TYPE {
                    continue;
                }
                if let Ok(light) = TrafficLight::try_from(actor) {
                    light.set_state(TrafficLightState::Green);
                    count += 1;
                }
            }
            Ok(count)
        })
    }

    async fn actor_transform(&self, actor_id: ActorId) -> Result<Transform> {
        self.with_world_mut(|world| {
            let actor = Self::find_actor(world, actor_id)?;
            Ok(Self::from_carla_transform(&actor.transform()))
        })
    }

    async fn set_actor_transform(&self, actor_id: ActorId, transform: Transform) -> Result<()> {
        self.with_world_mut(|world| {
            let actor = Self::find_actor(world, actor_id)?;
            actor.set_transform(&Self::to_carla_transform(transform));
            Ok(())
        })
    }

    async fn actors_of_type(&self, type_id: &str) -> Result<Vec<ActorId>> {
        self.with_world_mut(|world| {
            Ok(world
                .actors()
                .iter()
                .filter(|actor| actor.type_id() == type_id)
                .map(|actor| actor.id())
                .collect())
        })
    }

    #[instrument(name = "real_carla_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        if let Some(ActorType::Sensor(sensor)) = lock(&self.actors).remove(&actor_id) {
            if sensor.is_listening() {
                sensor.stop();
            }
        }

        let actor = self.with_world_mut(|world| Ok(world.actor(actor_id)))?;
        // Idempotent: return Ok even if not exists
        if let Some(actor) = actor {
            if !actor.destroy() {
                return Err(ActorFactoryError::DestroyFailed {
                    actor_id,
                    message: "destroy returned false".into(),
                });
            }
            debug!(actor_id, "actor destroyed");
        }
        Ok(())
    }

    async fn actor_exists(&self, actor_id: ActorId) -> Result<bool> {
        self.with_world_mut(|world| Ok(world.actor(actor_id).is_some()))
    }

    fn get_sensor_source(
        &self,
        actor_id: ActorId,
        sensor_id: String,
        kind: SensorKind,
    ) -> Option<Box<dyn SensorSource>> {
        let sensor = self.get_sensor(actor_id)?;
        Some(Box::new(CarlaSensorSource::new(sensor_id, kind, sensor)))
    }
}
