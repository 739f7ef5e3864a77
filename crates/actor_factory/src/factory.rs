//! ActorFactory 核心实现
//!
//! 准备世界 (地图、天气、红绿灯)，按 CaptureBlueprint spawn 相机组或
//! 激光雷达组，管理生命周期与回滚。

use contracts::{
    ActorId, CaptureBlueprint, LidarConfig, RuntimeGraph, SensorKind, SensorSource, Transform,
    WorldConfig,
};
use rand::seq::IndexedRandom;
use tracing::{error, info, instrument, warn};

use crate::client::SimulatorClient;
use crate::error::{ActorFactoryError, Result};

/// 自车在 RuntimeGraph 中的 ID
pub const EGO_VEHICLE_ID: &str = "ego";
pub const RGB_SENSOR_ID: &str = "rgb";
pub const DEPTH_SENSOR_ID: &str = "depth";
pub const SEMSEG_SENSOR_ID: &str = "semseg";
pub const LIDAR_SENSOR_ID: &str = "lidar";

/// Camera rig layout: sensor id and kind, in registration order
pub const CAMERA_RIG: [(&str, SensorKind); 3] = [
    (RGB_SENSOR_ID, SensorKind::RgbCamera),
    (DEPTH_SENSOR_ID, SensorKind::DepthCamera),
    (SEMSEG_SENSOR_ID, SensorKind::SemanticCamera),
];

/// Actor Factory
///
/// 负责 spawn 车辆与传感器，并提供 teardown 和回滚能力。
pub struct ActorFactory<C: SimulatorClient> {
    client: C,
}

impl<C: SimulatorClient> ActorFactory<C> {
    /// 创建新的 ActorFactory
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }

    /// 配置场景：地图不同则加载，设置天气，可选地将红绿灯全部设为绿灯
    #[instrument(name = "actor_factory_configure_world", skip(self, world), fields(map = %world.map))]
    pub async fn configure_world(&self, world: &WorldConfig) -> Result<()> {
        let current = self.client.map_name().await?;
        if current != world.map {
            info!(from = %current, to = %world.map, "loading map");
            self.client.load_world(&world.map).await?;
        }

        self.client.set_weather(world.weather.parameters()).await?;

        if world.traffic_lights_green {
            let changed = self.client.set_traffic_lights_green().await?;
            info!(traffic_lights = changed, "traffic lights set to green");
        }
        Ok(())
    }

    /// Spawn 自车与三个相机 (RGB / 深度 / 语义分割)，相机共用 `camera_mount`
    ///
    /// # 原子性保证
    /// 如果任何 spawn 失败，会回滚销毁所有已创建的 actors。
    #[instrument(
        name = "actor_factory_spawn_camera_rig",
        skip(self, blueprint, camera_mount),
        fields(spawn_index)
    )]
    pub async fn spawn_camera_rig(
        &self,
        blueprint: &CaptureBlueprint,
        spawn_index: usize,
        camera_mount: Transform,
    ) -> Result<RuntimeGraph> {
        let spawn_points = self.client.spawn_points().await?;
        let spawn_point = spawn_points.get(spawn_index).copied().ok_or_else(|| {
            ActorFactoryError::blueprint_not_found(format!(
                "spawn point index {spawn_index} out of range ({} available)",
                spawn_points.len()
            ))
        })?;

        let vehicle_cfg = &blueprint.vehicle;
        let mut attributes = Vec::new();
        if vehicle_cfg.random_color {
            if let Some(color) = self.random_color(&vehicle_cfg.blueprint).await? {
                attributes.push(("color".to_string(), color));
            }
        }

        info!(blueprint = %vehicle_cfg.blueprint, "spawning vehicle");
        let vehicle_id = self
            .client
            .spawn_vehicle(&vehicle_cfg.blueprint, spawn_point, &attributes)
            .await?;

        let mut graph = RuntimeGraph::new();
        graph.register_vehicle(EGO_VEHICLE_ID, vehicle_id);

        if let Err(e) = self
            .populate_camera_rig(blueprint, vehicle_id, camera_mount, &mut graph)
            .await
        {
            warn!(error = %e, "camera rig spawn failed, rolling back all actors");
            self.teardown(&graph).await;
            return Err(e);
        }

        info!(
            vehicle_id,
            sensors = graph.sensors.len(),
            "camera rig spawned successfully"
        );
        Ok(graph)
    }

    async fn populate_camera_rig(
        &self,
        blueprint: &CaptureBlueprint,
        vehicle_id: ActorId,
        camera_mount: Transform,
        graph: &mut RuntimeGraph,
    ) -> Result<()> {
        if blueprint.vehicle.autopilot {
            self.client.set_autopilot(vehicle_id, true).await?;
            info!(actor_id = vehicle_id, "autopilot enabled for vehicle");
        }

        let attributes = blueprint.camera_attributes();
        for (sensor_id, kind) in CAMERA_RIG {
            let actor_id = self
                .spawn_sensor_actor(sensor_id, kind, camera_mount, vehicle_id, &attributes)
                .await?;
            graph.register_sensor(sensor_id, kind, actor_id, vehicle_id);
        }
        Ok(())
    }

    /// Spawn 激光雷达并挂载到观察者上；观察者先移动到配置位姿
    ///
    /// 观察者不会登记到 RuntimeGraph，teardown 不会销毁它。
    #[instrument(name = "actor_factory_spawn_lidar_rig", skip(self, lidar))]
    pub async fn spawn_lidar_rig(&self, lidar: &LidarConfig) -> Result<RuntimeGraph> {
        let spectator = self.client.spectator().await?;
        self.client
            .set_actor_transform(spectator, lidar.spectator)
            .await?;

        let actor_id = self
            .spawn_sensor_actor(
                LIDAR_SENSOR_ID,
                SensorKind::Lidar,
                Transform::default(),
                spectator,
                &lidar.attributes(),
            )
            .await?;

        let mut graph = RuntimeGraph::new();
        graph.register_sensor(LIDAR_SENSOR_ID, SensorKind::Lidar, actor_id, spectator);
        info!(actor_id, spectator, "lidar created");
        Ok(graph)
    }

    /// Record sources for every sensor of `graph`, in registration order
    pub fn sensor_sources(&self, graph: &RuntimeGraph) -> Result<Vec<Box<dyn SensorSource>>> {
        graph
            .sensors
            .iter()
            .map(|s| {
                self.client
                    .get_sensor_source(s.actor_id, s.sensor_id.clone(), s.kind)
                    .ok_or(ActorFactoryError::ActorNotFound {
                        actor_id: s.actor_id,
                    })
            })
            .collect()
    }

    /// 销毁 RuntimeGraph 中的所有 actors (传感器先于车辆)
    ///
    /// # 幂等性
    /// 多次调用安全，不存在的 actor 会被忽略。
    /// 返回销毁失败的 actor 数量；失败只记录日志。
    #[instrument(
        name = "actor_factory_teardown",
        skip(self, graph),
        fields(vehicle_count = graph.vehicles.len(), sensor_count = graph.sensors.len())
    )]
    pub async fn teardown(&self, graph: &RuntimeGraph) -> usize {
        info!("starting teardown");

        let mut failed = 0;
        for actor_id in graph.all_actor_ids() {
            if !self.destroy_actor_safe(actor_id).await {
                failed += 1;
            }
        }

        info!(failed, "teardown completed");
        failed
    }

    /// 销毁所有类型为 `type_id` 的 actor
    #[instrument(name = "actor_factory_cleanup", skip(self), fields(type_id = %type_id))]
    pub async fn cleanup_by_type(&self, type_id: &str) -> Result<usize> {
        let ids = self.client.actors_of_type(type_id).await?;
        let mut destroyed = 0;
        for actor_id in ids {
            if self.destroy_actor_safe(actor_id).await {
                destroyed += 1;
            }
        }
        info!(destroyed, "cleanup completed");
        Ok(destroyed)
    }

    /// 安全销毁 actor（忽略错误，仅记录日志）
    async fn destroy_actor_safe(&self, actor_id: ActorId) -> bool {
        info!(actor_id, "destroying actor");

        match self.client.destroy_actor(actor_id).await {
            Ok(()) => true,
            Err(e) => {
                error!(actor_id, error = %e, "failed to destroy actor");
                false
            }
        }
    }

    async fn random_color(&self, blueprint: &str) -> Result<Option<String>> {
        let values = self
            .client
            .recommended_attribute_values(blueprint, "color")
            .await?;
        Ok(values.choose(&mut rand::rng()).cloned())
    }

    #[instrument(
        name = "actor_factory_spawn_sensor_actor",
        skip(self, transform, attributes),
        fields(sensor_id = %sensor_id, parent_id)
    )]
    async fn spawn_sensor_actor(
        &self,
        sensor_id: &str,
        kind: SensorKind,
        transform: Transform,
        parent_id: ActorId,
        attributes: &[(String, String)],
    ) -> Result<ActorId> {
        let blueprint = kind.blueprint().ok_or_else(|| {
            ActorFactoryError::blueprint_not_found(format!(
                "sensor kind {} has no blueprint",
                kind.as_str()
            ))
        })?;

        info!(blueprint, "spawning sensor");
        self.client
            .spawn_sensor(blueprint, transform, parent_id, attributes)
            .await
            .map_err(|e| match e {
                ActorFactoryError::SensorSpawnFailed { message, .. } => {
                    ActorFactoryError::sensor_spawn(sensor_id, parent_id, message)
                }
                other => other,
            })
            .inspect(|&actor_id| {
                info!(actor_id, "sensor spawned and attached successfully");
            })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::mock_client::{MockConfig, MockSimulator};

    async fn factory_with(config: MockConfig) -> ActorFactory<MockSimulator> {
        let mut client = MockSimulator::with_config(config);
        client
            .connect("localhost", 2000, Duration::from_secs(1))
            .await
            .unwrap();
        ActorFactory::new(client)
    }

    fn small_blueprint() -> CaptureBlueprint {
        let mut bp = CaptureBlueprint::default();
        bp.camera.width = 16;
        bp.camera.height = 8;
        bp
    }

    #[tokio::test]
    async fn test_spawn_camera_rig_success() {
        let factory = factory_with(MockConfig::default()).await;
        let bp = small_blueprint();

        let graph = factory
            .spawn_camera_rig(&bp, 221, bp.camera.mount_transform(0.0, 0.0))
            .await
            .unwrap();

        assert_eq!(graph.vehicles.len(), 1);
        let ids: Vec<&str> = graph.sensors.iter().map(|s| s.sensor_id.as_str()).collect();
        assert_eq!(ids, vec!["rgb", "depth", "semseg"]);

        let vehicle = graph.vehicle(EGO_VEHICLE_ID).unwrap();
        assert!(factory.client().autopilot_enabled(vehicle));
        let attrs = factory.client().actor_attributes(vehicle);
        assert!(attrs.iter().any(|(k, _)| k == "color"));

        let camera = graph.sensor(RGB_SENSOR_ID).unwrap().actor_id;
        let camera_attrs = factory.client().actor_attributes(camera);
        assert!(camera_attrs.contains(&("image_size_x".to_string(), "16".to_string())));
    }

    #[tokio::test]
    async fn test_sensor_spawn_failure_rollback() {
        let factory = factory_with(MockConfig {
            fail_blueprints: vec!["sensor.camera.semantic_segmentation".to_string()],
            ..Default::default()
        })
        .await;
        let bp = small_blueprint();

        let result = factory
            .spawn_camera_rig(&bp, 0, bp.camera.mount_transform(0.0, 0.0))
            .await;

        match result {
            Err(ActorFactoryError::SensorSpawnFailed { sensor_id, .. }) => {
                assert_eq!(sensor_id, SEMSEG_SENSOR_ID)
            }
            other => panic!("unexpected result: {:?}", other.map(|g| g.sensors.len())),
        }
        // vehicle, rgb and depth were rolled back
        assert_eq!(factory.client().spawned_actor_count(), 0);
    }

    #[tokio::test]
    async fn test_spawn_index_out_of_range() {
        let factory = factory_with(MockConfig {
            spawn_point_count: 5,
            ..Default::default()
        })
        .await;
        let bp = small_blueprint();
        let err = factory
            .spawn_camera_rig(&bp, 5, Transform::default())
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(factory.client().spawned_actor_count(), 0);
    }

    #[tokio::test]
    async fn test_teardown_idempotent() {
        let factory = factory_with(MockConfig::default()).await;
        let bp = small_blueprint();

        let graph = factory
            .spawn_camera_rig(&bp, 0, Transform::default())
            .await
            .unwrap();

        // First teardown
        assert_eq!(factory.teardown(&graph).await, 0);
        assert_eq!(factory.client().spawned_actor_count(), 0);

        // Second teardown should also succeed
        assert_eq!(factory.teardown(&graph).await, 0);
    }

    #[tokio::test]
    async fn test_teardown_continues_after_destroy_failure() {
        // actor ids: 1000 spectator, 1001..=1004 traffic lights, 1005 vehicle, 1006.. sensors
        let factory = factory_with(MockConfig {
            fail_destroy: vec![1006],
            ..Default::default()
        })
        .await;
        let bp = small_blueprint();
        let graph = factory
            .spawn_camera_rig(&bp, 0, Transform::default())
            .await
            .unwrap();

        assert_eq!(factory.teardown(&graph).await, 1);
        assert_eq!(factory.client().spawned_actor_count(), 1);
    }

    #[tokio::test]
    async fn test_configure_world() {
        let factory = factory_with(MockConfig::default()).await;
        let bp = small_blueprint();
        factory.configure_world(&bp.world).await.unwrap();
        assert_eq!(factory.client().current_map(), "Town03");
        assert!(factory.client().all_lights_green());
    }

    #[tokio::test]
    async fn test_lidar_rig_attaches_to_spectator() {
        let factory = factory_with(MockConfig::default()).await;
        let lidar = LidarConfig::default();
        let graph = factory.spawn_lidar_rig(&lidar).await.unwrap();

        let spectator = factory.client().spectator().await.unwrap();
        assert!(graph.vehicles.is_empty());
        assert_eq!(graph.sensors[0].parent_id, spectator);
        let pose = factory.client().actor_transform(spectator).await.unwrap();
        assert_eq!(pose, lidar.spectator);

        factory.teardown(&graph).await;
        assert!(factory.client().actor_exists(spectator).await.unwrap());
    }

    #[tokio::test]
    async fn test_cleanup_by_type() {
        let factory = factory_with(MockConfig::default()).await;
        for _ in 0..3 {
            factory
                .client()
                .spawn_vehicle("vehicle.tesla.model3", Transform::default(), &[])
                .await
                .unwrap();
        }
        factory
            .client()
            .spawn_vehicle("vehicle.audi.tt", Transform::default(), &[])
            .await
            .unwrap();

        let destroyed = factory.cleanup_by_type("vehicle.tesla.model3").await.unwrap();
        assert_eq!(destroyed, 3);
        assert_eq!(factory.client().spawned_actor_count(), 1);
    }
}
