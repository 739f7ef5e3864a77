//! Mock 仿真器客户端
//!
//! 进程内的确定性仿真器：维护帧号、世界设置、actor 表和监听器，
//! 每次 `tick` 为每个监听中的传感器在独立线程上投递一条记录，
//! 以模拟服务器的异步回调线程。支持注入失败与延迟场景。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use contracts::{
    ActorId, Location, SensorKind, SensorRecord, SensorRecordCallback, SensorSource, Tick,
    Transform, WeatherParameters, WorldSettings, WorldSnapshot, WORLD_TICK_SENSOR_ID,
};
use rand::Rng;
use tracing::{debug, instrument, trace};

use crate::client::{SimulatorClient, TRAFFIC_LIGHT_TYPE};
use crate::error::{ActorFactoryError, Result};
use crate::mock_sensor::{synthesize_payload, MockSensorSource};

const SPECTATOR_TYPE: &str = "spectator";
const AUTOPILOT_SPEED_MPS: f64 = 10.0;
const DEFAULT_IMAGE_WIDTH: u32 = 64;
const DEFAULT_IMAGE_HEIGHT: u32 = 48;

/// Maps the mock knows about
pub const MOCK_MAPS: [&str; 8] = [
    "Town01", "Town02", "Town03", "Town04", "Town05", "Town06", "Town07", "Town10HD",
];

/// 延迟投递：第 `nth_tick` 次 tick 时，`sensor_id` 的记录推迟 `delay` 后才到达
#[derive(Debug, Clone)]
pub struct DelayedDelivery {
    pub sensor_id: String,
    /// 1-based count of `tick` calls
    pub nth_tick: u64,
    pub delay: Duration,
}

/// Mock 客户端配置
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// 拒绝连接
    pub refuse_connection: bool,
    /// spawn 时失败的蓝图
    pub fail_blueprints: Vec<String>,
    /// 销毁时失败的 actor IDs
    pub fail_destroy: Vec<ActorId>,
    /// 投递上一帧 tick 的传感器 (模拟过期数据)
    pub stale_sensors: Vec<String>,
    /// 从不投递的传感器
    pub silent_sensors: Vec<String>,
    /// 延迟投递
    pub delayed_deliveries: Vec<DelayedDelivery>,
    /// 成功 tick 这么多次后，`tick` 开始返回错误
    pub fail_tick_after: Option<u64>,
    /// 每条记录投递前的随机等待上限 (微秒)
    pub delivery_jitter_us: u64,
    /// 地图出生点数量
    pub spawn_point_count: usize,
    /// 预置红绿灯数量
    pub traffic_lights: usize,
    /// 初始地图
    pub initial_map: String,
    /// 初始世界设置
    pub initial_settings: WorldSettings,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            refuse_connection: false,
            fail_blueprints: Vec::new(),
            fail_destroy: Vec::new(),
            stale_sensors: Vec::new(),
            silent_sensors: Vec::new(),
            delayed_deliveries: Vec::new(),
            fail_tick_after: None,
            delivery_jitter_us: 0,
            spawn_point_count: 300,
            traffic_lights: 4,
            initial_map: "Town01".to_string(),
            initial_settings: WorldSettings {
                synchronous_mode: false,
                no_rendering_mode: false,
                fixed_delta_seconds: None,
            },
        }
    }
}

#[derive(Debug, Clone)]
struct MockActor {
    type_id: String,
    /// World pose for roots, pose relative to `parent` for attached actors
    transform: Transform,
    parent: Option<ActorId>,
    attributes: Vec<(String, String)>,
    autopilot: bool,
    green: bool,
}

impl MockActor {
    fn new(type_id: impl Into<String>, transform: Transform) -> Self {
        Self {
            type_id: type_id.into(),
            transform,
            parent: None,
            attributes: Vec::new(),
            autopilot: false,
            green: false,
        }
    }

    fn attribute<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.parse().ok())
    }
}

struct Listener {
    token: u64,
    sensor_id: String,
    kind: SensorKind,
    actor_id: Option<ActorId>,
    callback: SensorRecordCallback,
}

struct WorldState {
    connected: bool,
    map: String,
    weather: WeatherParameters,
    settings: WorldSettings,
    frame: u64,
    ticks: u64,
    elapsed: f64,
    spectator: ActorId,
    actors: HashMap<ActorId, MockActor>,
    listeners: Vec<Listener>,
}

/// State shared between the simulator handle and its sensor sources
pub(crate) struct MockWorld {
    config: MockConfig,
    next_actor_id: AtomicU32,
    next_token: AtomicU64,
    state: Mutex<WorldState>,
}

impl MockWorld {
    fn state(&self) -> MutexGuard<'_, WorldState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate_actor_id(&self) -> ActorId {
        self.next_actor_id.fetch_add(1, Ordering::SeqCst)
    }

    pub(crate) fn add_listener(
        &self,
        sensor_id: &str,
        kind: SensorKind,
        actor_id: Option<ActorId>,
        callback: SensorRecordCallback,
    ) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        self.state().listeners.push(Listener {
            token,
            sensor_id: sensor_id.to_string(),
            kind,
            actor_id,
            callback,
        });
        token
    }

    pub(crate) fn remove_listener(&self, token: u64) {
        self.state().listeners.retain(|l| l.token != token);
    }

    pub(crate) fn actor_alive(&self, actor_id: ActorId) -> bool {
        self.state().actors.contains_key(&actor_id)
    }

    fn world_transform(state: &WorldState, actor_id: ActorId) -> Option<Transform> {
        let actor = state.actors.get(&actor_id)?;
        match actor.parent {
            None => Some(actor.transform),
            Some(parent) => {
                let base = Self::world_transform(state, parent)?;
                let rel = actor.transform;
                Some(Transform::new(
                    Location::new(
                        base.location.x + rel.location.x,
                        base.location.y + rel.location.y,
                        base.location.z + rel.location.z,
                    ),
                    contracts::Rotation {
                        pitch: base.rotation.pitch + rel.rotation.pitch,
                        yaw: base.rotation.yaw + rel.rotation.yaw,
                        roll: base.rotation.roll + rel.rotation.roll,
                    },
                ))
            }
        }
    }

    fn delay_for(&self, sensor_id: &str, tick_count: u64) -> Option<Duration> {
        self.config
            .delayed_deliveries
            .iter()
            .find(|d| d.sensor_id == sensor_id && d.nth_tick == tick_count)
            .map(|d| d.delay)
    }
}

/// A record scheduled for delivery on its own thread
struct Delivery {
    callback: SensorRecordCallback,
    record: SensorRecord,
    delay: Duration,
}

/// Mock 仿真器客户端
#[derive(Clone)]
pub struct MockSimulator {
    world: Arc<MockWorld>,
}

impl MockSimulator {
    /// 创建默认 mock 客户端
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// 使用配置创建 mock 客户端
    pub fn with_config(config: MockConfig) -> Self {
        let next_actor_id = AtomicU32::new(1000); // 从 1000 开始，便于识别
        let spectator = next_actor_id.fetch_add(1, Ordering::SeqCst);

        let mut actors = HashMap::new();
        actors.insert(
            spectator,
            MockActor::new(SPECTATOR_TYPE, Transform::default()),
        );
        for i in 0..config.traffic_lights {
            let id = next_actor_id.fetch_add(1, Ordering::SeqCst);
            actors.insert(
                id,
                MockActor::new(
                    TRAFFIC_LIGHT_TYPE,
                    Transform::from_location(i as f64 * 40.0, 12.0, 0.0),
                ),
            );
        }

        let state = WorldState {
            connected: false,
            map: config.initial_map.clone(),
            weather: WeatherParameters::default(),
            settings: config.initial_settings,
            frame: 0,
            ticks: 0,
            elapsed: 0.0,
            spectator,
            actors,
            listeners: Vec::new(),
        };

        Self {
            world: Arc::new(MockWorld {
                config,
                next_actor_id,
                next_token: AtomicU64::new(1),
                state: Mutex::new(state),
            }),
        }
    }

    /// Number of live vehicles and sensors
    pub fn spawned_actor_count(&self) -> usize {
        self.world
            .state()
            .actors
            .values()
            .filter(|a| a.type_id.starts_with("vehicle.") || a.type_id.starts_with("sensor."))
            .count()
    }

    /// Current world settings (without going through the async trait)
    pub fn current_settings(&self) -> WorldSettings {
        self.world.state().settings
    }

    pub fn current_map(&self) -> String {
        self.world.state().map.clone()
    }

    pub fn current_weather(&self) -> WeatherParameters {
        self.world.state().weather
    }

    /// Number of successful `tick` calls so far
    pub fn tick_count(&self) -> u64 {
        self.world.state().ticks
    }

    /// Number of registered record listeners
    pub fn listener_count(&self) -> usize {
        self.world.state().listeners.len()
    }

    pub fn autopilot_enabled(&self, actor_id: ActorId) -> bool {
        self.world
            .state()
            .actors
            .get(&actor_id)
            .is_some_and(|a| a.autopilot)
    }

    pub fn all_lights_green(&self) -> bool {
        self.world
            .state()
            .actors
            .values()
            .filter(|a| a.type_id == TRAFFIC_LIGHT_TYPE)
            .all(|a| a.green)
    }

    /// Attributes an actor was spawned with
    pub fn actor_attributes(&self, actor_id: ActorId) -> Vec<(String, String)> {
        self.world
            .state()
            .actors
            .get(&actor_id)
            .map(|a| a.attributes.clone())
            .unwrap_or_default()
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.world.state().connected {
            Ok(())
        } else {
            Err(ActorFactoryError::ConnectionFailed {
                message: "not connected".into(),
            })
        }
    }

    fn should_fail(&self, blueprint: &str) -> bool {
        self.world
            .config
            .fail_blueprints
            .iter()
            .any(|b| b == blueprint)
    }

    fn mock_spawn_points(count: usize) -> Vec<Transform> {
        (0..count)
            .map(|i| {
                Transform::new(
                    Location::new((i % 25) as f64 * 8.0, (i / 25) as f64 * 6.0, 0.6),
                    contracts::Rotation {
                        pitch: 0.0,
                        yaw: ((i * 90) % 360) as f64,
                        roll: 0.0,
                    },
                )
            })
            .collect()
    }

    /// Advance the world by one step and collect the records it produces.
    fn step(&self) -> Result<(Tick, Vec<Delivery>)> {
        let config = &self.world.config;
        let mut state = self.world.state();

        if let Some(limit) = config.fail_tick_after {
            if state.ticks >= limit {
                return Err(ActorFactoryError::simulator(format!(
                    "mock tick failure after {limit} ticks"
                )));
            }
        }

        let delta = state.settings.fixed_delta_seconds.unwrap_or(0.05);
        state.frame += 1;
        state.ticks += 1;
        state.elapsed += delta;
        let frame = state.frame;
        let ticks = state.ticks;
        let elapsed = state.elapsed;

        for actor in state.actors.values_mut() {
            if actor.autopilot && actor.parent.is_none() {
                actor.transform.location.x += AUTOPILOT_SPEED_MPS * delta;
            }
        }

        let mut deliveries = Vec::new();
        for listener in &state.listeners {
            if config.silent_sensors.contains(&listener.sensor_id) {
                continue;
            }

            let payload = match listener.actor_id {
                None => contracts::SensorPayload::WorldTick(WorldSnapshot {
                    elapsed_seconds: elapsed,
                    delta_seconds: delta,
                }),
                Some(actor_id) => {
                    let Some(actor) = state.actors.get(&actor_id) else {
                        continue;
                    };
                    let width = actor
                        .attribute("image_size_x")
                        .unwrap_or(DEFAULT_IMAGE_WIDTH);
                    let height = actor
                        .attribute("image_size_y")
                        .unwrap_or(DEFAULT_IMAGE_HEIGHT);
                    synthesize_payload(listener.kind, width, height, frame)
                }
            };

            let tick = if config.stale_sensors.contains(&listener.sensor_id) {
                frame.saturating_sub(1)
            } else {
                frame
            };

            let mut delay = self
                .world
                .delay_for(&listener.sensor_id, ticks)
                .unwrap_or_default();
            if config.delivery_jitter_us > 0 {
                delay += Duration::from_micros(
                    rand::rng().random_range(0..=config.delivery_jitter_us),
                );
            }

            deliveries.push(Delivery {
                callback: listener.callback.clone(),
                record: SensorRecord {
                    sensor_id: listener.sensor_id.clone(),
                    kind: listener.kind,
                    tick: Tick::new(tick),
                    timestamp: elapsed,
                    payload,
                },
                delay,
            });
        }

        Ok((Tick::new(frame), deliveries))
    }
}

impl Default for MockSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatorClient for MockSimulator {
    #[instrument(name = "mock_sim_connect", skip(self), fields(host = %host, port))]
    async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        if self.world.config.refuse_connection {
            return Err(ActorFactoryError::ConnectionFailed {
                message: format!("{host}:{port} refused connection"),
            });
        }
        let _ = timeout;
        self.world.state().connected = true;
        Ok(())
    }

    async fn map_name(&self) -> Result<String> {
        self.ensure_connected()?;
        Ok(self.world.state().map.clone())
    }

    #[instrument(name = "mock_sim_load_world", skip(self), fields(map = %map))]
    async fn load_world(&self, map: &str) -> Result<()> {
        self.ensure_connected()?;
        if !MOCK_MAPS.contains(&map) {
            return Err(ActorFactoryError::blueprint_not_found(format!(
                "map '{map}' not available"
            )));
        }
        self.world.state().map = map.to_string();
        Ok(())
    }

    async fn set_weather(&self, weather: WeatherParameters) -> Result<()> {
        self.ensure_connected()?;
        self.world.state().weather = weather;
        Ok(())
    }

    async fn world_settings(&self) -> Result<WorldSettings> {
        self.ensure_connected()?;
        Ok(self.world.state().settings)
    }

    #[instrument(name = "mock_sim_apply_settings", skip(self))]
    async fn apply_settings(&self, settings: WorldSettings) -> Result<Tick> {
        self.ensure_connected()?;
        let mut state = self.world.state();
        state.settings = settings;
        Ok(Tick::new(state.frame))
    }

    async fn tick(&self) -> Result<Tick> {
        self.ensure_connected()?;
        let (tick, deliveries) = self.step()?;
        trace!(%tick, records = deliveries.len(), "mock tick");

        for delivery in deliveries {
            thread::spawn(move || {
                if !delivery.delay.is_zero() {
                    thread::sleep(delivery.delay);
                }
                (delivery.callback)(delivery.record);
            });
        }
        Ok(tick)
    }

    fn world_tick_source(&self) -> Option<Box<dyn SensorSource>> {
        Some(Box::new(MockSensorSource::new(
            WORLD_TICK_SENSOR_ID.to_string(),
            SensorKind::WorldTick,
            None,
            self.world.clone(),
        )))
    }

    async fn spawn_points(&self) -> Result<Vec<Transform>> {
        self.ensure_connected()?;
        Ok(Self::mock_spawn_points(self.world.config.spawn_point_count))
    }

    async fn spectator(&self) -> Result<ActorId> {
        self.ensure_connected()?;
        Ok(self.world.state().spectator)
    }

    #[instrument(
        name = "mock_sim_spawn_vehicle",
        skip(self, transform, attributes),
        fields(blueprint = %blueprint)
    )]
    async fn spawn_vehicle(
        &self,
        blueprint: &str,
        transform: Transform,
        attributes: &[(String, String)],
    ) -> Result<ActorId> {
        self.ensure_connected()?;

        if !blueprint.starts_with("vehicle.") {
            return Err(ActorFactoryError::blueprint_not_found(format!(
                "blueprint '{blueprint}' not found"
            )));
        }
        if self.should_fail(blueprint) {
            return Err(ActorFactoryError::vehicle_spawn(blueprint, "mock failure"));
        }

        let actor_id = self.world.allocate_actor_id();
        let mut actor = MockActor::new(blueprint, transform);
        actor.attributes = attributes.to_vec();
        self.world.state().actors.insert(actor_id, actor);
        debug!(actor_id, "mock vehicle spawned");
        Ok(actor_id)
    }

    #[instrument(
        name = "mock_sim_spawn_sensor",
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
        self.ensure_connected()?;

        let known = [
            SensorKind::RgbCamera,
            SensorKind::DepthCamera,
            SensorKind::SemanticCamera,
            SensorKind::Lidar,
        ]
        .iter()
        .any(|k| k.blueprint() == Some(blueprint));
        if !known {
            return Err(ActorFactoryError::blueprint_not_found(format!(
                "blueprint '{blueprint}' not found"
            )));
        }

        // 验证 parent 存在
        if !self.world.actor_alive(parent_id) {
            return Err(ActorFactoryError::sensor_spawn(
                blueprint,
                parent_id,
                "parent actor not found",
            ));
        }

        if self.should_fail(blueprint) {
            return Err(ActorFactoryError::sensor_spawn(
                blueprint,
                parent_id,
                "mock failure",
            ));
        }

        let actor_id = self.world.allocate_actor_id();
        let mut actor = MockActor::new(blueprint, transform);
        actor.parent = Some(parent_id);
        actor.attributes = attributes.to_vec();
        self.world.state().actors.insert(actor_id, actor);
        Ok(actor_id)
    }

    async fn recommended_attribute_values(
        &self,
        blueprint: &str,
        attribute: &str,
    ) -> Result<Vec<String>> {
        self.ensure_connected()?;
        if blueprint.starts_with("vehicle.") && attribute == "color" {
            return Ok(vec![
                "255,255,255".to_string(),
                "17,37,103".to_string(),
                "201,0,0".to_string(),
                "12,12,12".to_string(),
            ]);
        }
        Ok(Vec::new())
    }

    async fn set_autopilot(&self, actor_id: ActorId, enabled: bool) -> Result<()> {
        self.ensure_connected()?;
        let mut state = self.world.state();
        let actor = state
            .actors
            .get_mut(&actor_id)
            .ok_or(ActorFactoryError::ActorNotFound { actor_id })?;
        actor.autopilot = enabled;
        Ok(())
    }

    async fn set_traffic_lights_green(&self) -> Result<usize> {
        self.ensure_connected()?;
        let mut state = self.world.state();
        let mut count = 0;
        for actor in state.actors.values_mut() {
            if actor.type_id == TRAFFIC_LIGHT_TYPE {
                actor.green = true;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn actor_transform(&self, actor_id: ActorId) -> Result<Transform> {
        self.ensure_connected()?;
        let state = self.world.state();
        MockWorld::world_transform(&state, actor_id)
            .ok_or(ActorFactoryError::ActorNotFound { actor_id })
    }

    async fn set_actor_transform(&self, actor_id: ActorId, transform: Transform) -> Result<()> {
        self.ensure_connected()?;
        let mut state = self.world.state();
        let actor = state
            .actors
            .get_mut(&actor_id)
            .ok_or(ActorFactoryError::ActorNotFound { actor_id })?;
        actor.transform = transform;
        Ok(())
    }

    async fn actors_of_type(&self, type_id: &str) -> Result<Vec<ActorId>> {
        self.ensure_connected()?;
        let mut ids: Vec<ActorId> = self
            .world
            .state()
            .actors
            .iter()
            .filter(|(_, a)| a.type_id == type_id)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    #[instrument(name = "mock_sim_destroy_actor", skip(self), fields(actor_id))]
    async fn destroy_actor(&self, actor_id: ActorId) -> Result<()> {
        if self.world.config.fail_destroy.contains(&actor_id) {
            return Err(ActorFactoryError::DestroyFailed {
                actor_id,
                message: "mock failure".into(),
            });
        }

        // 幂等：即使不存在也返回 Ok
        let mut state = self.world.state();
        state.actors.remove(&actor_id);
        state.listeners.retain(|l| l.actor_id != Some(actor_id));
        Ok(())
    }

    async fn actor_exists(&self, actor_id: ActorId) -> Result<bool> {
        Ok(self.world.actor_alive(actor_id))
    }

    fn get_sensor_source(
        &self,
        actor_id: ActorId,
        sensor_id: String,
        kind: SensorKind,
    ) -> Option<Box<dyn SensorSource>> {
        if !self.world.actor_alive(actor_id) {
            return None;
        }
        Some(Box::new(MockSensorSource::new(
            sensor_id,
            kind,
            Some(actor_id),
            self.world.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    async fn connected() -> MockSimulator {
        let mut client = MockSimulator::new();
        client
            .connect("localhost", 2000, Duration::from_secs(1))
            .await
            .unwrap();
        client
    }

    #[tokio::test]
    async fn test_mock_spawn_vehicle() {
        let client = connected().await;
        let actor_id = client
            .spawn_vehicle("vehicle.tesla.model3", Transform::default(), &[])
            .await
            .unwrap();
        assert!(actor_id >= 1000);
        assert_eq!(client.spawned_actor_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_requires_connection() {
        let client = MockSimulator::new();
        let result = client.tick().await;
        assert!(matches!(
            result,
            Err(ActorFactoryError::ConnectionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_spawn_sensor() {
        let client = connected().await;

        let vehicle_id = client
            .spawn_vehicle("vehicle.tesla.model3", Transform::default(), &[])
            .await
            .unwrap();
        let sensor_id = client
            .spawn_sensor("sensor.camera.rgb", Transform::default(), vehicle_id, &[])
            .await
            .unwrap();

        assert!(sensor_id > vehicle_id);
        assert_eq!(client.spawned_actor_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_blueprint_is_configuration_error() {
        let client = connected().await;
        let err = client
            .spawn_vehicle("walker.pedestrian.0001", Transform::default(), &[])
            .await
            .unwrap_err();
        assert!(err.is_configuration());

        let err = client.load_world("Atlantis").await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_mock_destroy_idempotent() {
        let client = connected().await;

        let actor_id = client
            .spawn_vehicle("vehicle.tesla.model3", Transform::default(), &[])
            .await
            .unwrap();
        client.destroy_actor(actor_id).await.unwrap();
        // Second destroy should also succeed
        client.destroy_actor(actor_id).await.unwrap();
        assert_eq!(client.spawned_actor_count(), 0);
    }

    #[tokio::test]
    async fn test_tick_delivers_records_for_current_frame() {
        let client = connected().await;
        let vehicle = client
            .spawn_vehicle("vehicle.tesla.model3", Transform::default(), &[])
            .await
            .unwrap();
        let camera = client
            .spawn_sensor(
                "sensor.camera.depth",
                Transform::default(),
                vehicle,
                &[
                    ("image_size_x".to_string(), "8".to_string()),
                    ("image_size_y".to_string(), "4".to_string()),
                ],
            )
            .await
            .unwrap();

        let (tx, rx) = mpsc::channel();
        let source = client
            .get_sensor_source(camera, "depth".into(), SensorKind::DepthCamera)
            .unwrap();
        let tx = Mutex::new(tx);
        source.listen(Arc::new(move |record| {
            let _ = tx.lock().unwrap().send(record);
        }));

        let tick = client.tick().await.unwrap();
        let record = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(record.tick, tick);
        let image = record.payload.as_image().unwrap();
        assert_eq!((image.width, image.height), (8, 4));

        source.stop();
        assert_eq!(client.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_autopilot_moves_vehicle_and_attached_sensor() {
        let client = connected().await;
        client
            .apply_settings(WorldSettings::synchronous(0.1))
            .await
            .unwrap();
        let vehicle = client
            .spawn_vehicle(
                "vehicle.tesla.model3",
                Transform::from_location(0.0, 0.0, 0.0),
                &[],
            )
            .await
            .unwrap();
        let camera = client
            .spawn_sensor(
                "sensor.camera.rgb",
                Transform::from_location(1.5, 0.0, 2.4),
                vehicle,
                &[],
            )
            .await
            .unwrap();
        client.set_autopilot(vehicle, true).await.unwrap();

        client.tick().await.unwrap();
        let pose = client.actor_transform(camera).await.unwrap();
        assert!((pose.location.x - 2.5).abs() < 1e-9);
        assert!((pose.location.z - 2.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_traffic_lights_and_type_query() {
        let client = connected().await;
        assert!(!client.all_lights_green());
        let changed = client.set_traffic_lights_green().await.unwrap();
        assert_eq!(changed, 4);
        assert!(client.all_lights_green());
        assert_eq!(
            client.actors_of_type(TRAFFIC_LIGHT_TYPE).await.unwrap().len(),
            4
        );
    }

    #[tokio::test]
    async fn test_fail_tick_after() {
        let mut client = MockSimulator::with_config(MockConfig {
            fail_tick_after: Some(2),
            ..Default::default()
        });
        client
            .connect("localhost", 2000, Duration::from_secs(1))
            .await
            .unwrap();
        assert!(client.tick().await.is_ok());
        assert!(client.tick().await.is_ok());
        assert!(client.tick().await.is_err());
        assert_eq!(client.tick_count(), 2);
    }
}
