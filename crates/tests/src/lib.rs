//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置加载与校验的跨 crate 行为
//! - 基于 MockSimulator 的 e2e 采集会话（无需 CARLA）
//! - 会话目录打包

#[cfg(test)]
mod config_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{Modality, TimeoutPolicy};

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let blueprint = ConfigLoader::load_from_str(
            r#"
            [world]
            map = "Town05"

            [sync]
            fps = 20.0
            on_timeout = "abort"

            [archive]
            modalities = ["rgb", "semseg_masked"]
            "#,
            ConfigFormat::Toml,
        )
        .unwrap();

        assert_eq!(blueprint.world.map, "Town05");
        assert_eq!(blueprint.sync.on_timeout, TimeoutPolicy::Abort);
        assert_eq!(blueprint.camera.width, 1280);
        assert_eq!(blueprint.vehicle.spawn_points, vec![221, 220, 239, 240]);
        assert_eq!(
            blueprint.archive.modalities,
            vec![Modality::Rgb, Modality::SemsegMasked]
        );
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let cases = [
            "[sync]\nfps = 0.0\n",
            "[run]\nframes_per_run = 0\n",
            "[run]\nframes_per_run = 10\nwarmup_ticks = 10\n",
            "[vehicle]\nspawn_points = []\n",
            "[archive]\nmodalities = [\"meta\"]\n",
        ];
        for content in cases {
            assert!(
                ConfigLoader::load_from_str(content, ConfigFormat::Toml).is_err(),
                "accepted: {content}"
            );
        }
    }

    #[test]
    fn test_dump_reloads_to_same_settings() {
        let mut blueprint = contracts::CaptureBlueprint::default();
        blueprint.run.frames_per_run = 42;
        let dumped = ConfigLoader::to_toml(&blueprint).unwrap();
        let reloaded = ConfigLoader::load_from_str(&dumped, ConfigFormat::Toml).unwrap();
        assert_eq!(reloaded.run.frames_per_run, 42);
        assert_eq!(reloaded.world.map, blueprint.world.map);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::time::Duration;

    use actor_factory::{
        DelayedDelivery, MockConfig, MockSimulator, SimulatorClient, RGB_SENSOR_ID,
        SEMSEG_SENSOR_ID, DEPTH_SENSOR_ID,
    };
    use carla_capture::{
        SessionDriver, SessionError, Shutdown, OUTCOME_COMPLETED, OUTCOME_INTERRUPTED,
    };
    use chrono::{NaiveDate, NaiveDateTime};
    use contracts::{CaptureBlueprint, Modality, TimeoutPolicy};
    use exporter::{package_archive, RunMetadata, CAMERA_FILE, FOCAL_FILE, RUN_METADATA_FILE};
    use sync_engine::SyncError;
    use tempfile::tempdir;

    fn started() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 8, 24)
            .unwrap()
            .and_hms_opt(13, 30, 13)
            .unwrap()
    }

    /// Small images and short runs: 5 ticks, the first 2 are warm-up
    fn blueprint(spawn_points: Vec<usize>) -> CaptureBlueprint {
        let mut bp = CaptureBlueprint::default();
        bp.camera.width = 32;
        bp.camera.height = 24;
        bp.vehicle.spawn_points = spawn_points;
        bp.run.runs_per_spawn = 1;
        bp.run.frames_per_run = 5;
        bp.run.warmup_ticks = 2;
        bp.sync.fps = 20.0;
        bp.sync.timeout_sec = 1.0;
        bp
    }

    async fn driver(config: MockConfig, bp: CaptureBlueprint) -> SessionDriver<MockSimulator> {
        let mut client = MockSimulator::with_config(config);
        client
            .connect("localhost", 2000, Duration::from_secs(1))
            .await
            .unwrap();
        SessionDriver::new(client, bp)
    }

    fn metadata(run_dir: &Path) -> RunMetadata {
        let text = std::fs::read_to_string(run_dir.join(RUN_METADATA_FILE)).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    fn pose_rows(run_dir: &Path) -> usize {
        std::fs::read_to_string(run_dir.join(CAMERA_FILE))
            .unwrap()
            .lines()
            .count()
    }

    /// End-to-end: MockSimulator -> TickSynchronizer -> FrameProcessor -> FileSink
    #[tokio::test]
    async fn test_full_session_writes_every_run() {
        let base = tempdir().unwrap();
        let mut driver = driver(MockConfig::default(), blueprint(vec![3, 5])).await;

        let report = driver.run_session(base.path(), started()).await.unwrap();

        assert_eq!(report.session_dir, base.path().join("08_24_13_30_13"));
        assert_eq!(report.runs.len(), 2);
        assert_eq!(report.frames_recorded(), 6);
        assert_eq!(report.summary.runs_completed, 2);
        assert_eq!(report.summary.warmup_ticks, 4);

        for (run, name) in report.runs.iter().zip(["1_1", "2_1"]) {
            assert_eq!(run.dir, report.session_dir.join(name));
            assert_eq!(run.frames_recorded, 3);
            assert_eq!(run.warmup_ticks, 2);
            assert_eq!(run.timeouts, 0);

            // warm-up ticks consume sequence numbers 0 and 1
            for modality in carla_capture::CAMERA_MODALITIES {
                for sequence in 2..5 {
                    let path = run.dir.join(modality.dir_name()).join(modality.file_name(sequence));
                    assert!(path.is_file(), "missing {}", path.display());
                }
                let first = run.dir.join(modality.dir_name()).join(modality.file_name(0));
                assert!(!first.exists());
            }
            assert_eq!(pose_rows(&run.dir), 3);
            assert!(run.dir.join(FOCAL_FILE).is_file());

            let meta = metadata(&run.dir);
            assert_eq!(meta.outcome, OUTCOME_COMPLETED);
            assert_eq!(meta.frames_recorded, 3);
            assert_eq!(meta.map, "Town03");
            assert_eq!((meta.image_width, meta.image_height), (32, 24));
            assert!(meta.first_tick < meta.last_tick);
        }
        assert_eq!(report.runs[0].spawn_index, 3);
        assert_eq!(report.runs[1].spawn_index, 5);

        // scene configured, everything torn down, settings restored
        let client = driver.client();
        assert_eq!(client.current_map(), "Town03");
        assert!(client.all_lights_green());
        assert_eq!(client.spawned_actor_count(), 0);
        assert_eq!(client.listener_count(), 0);
        assert!(!client.current_settings().synchronous_mode);
    }

    #[tokio::test]
    async fn test_simulator_failure_aborts_session_and_cleans_up() {
        let base = tempdir().unwrap();
        let config = MockConfig {
            fail_tick_after: Some(3),
            ..Default::default()
        };
        let mut driver = driver(config, blueprint(vec![3, 5])).await;
        let before = driver.client().current_settings();

        let err = driver.run_session(base.path(), started()).await.unwrap_err();
        assert!(matches!(err, SessionError::Sync(SyncError::Simulator(_))));
        assert!(!err.is_violation());

        let run_dir = base.path().join("08_24_13_30_13").join("1_1");
        // tick 3 was recorded before the failure; its pose row survives
        assert_eq!(pose_rows(&run_dir), 1);
        assert_ne!(metadata(&run_dir).outcome, OUTCOME_COMPLETED);
        assert!(!base.path().join("08_24_13_30_13").join("2_1").exists());

        assert_eq!(driver.stats().summary().runs_failed, 1);
        assert_eq!(driver.client().spawned_actor_count(), 0);
        assert_eq!(driver.client().current_settings(), before);
    }

    #[tokio::test]
    async fn test_stale_sensor_is_a_violation() {
        let base = tempdir().unwrap();
        let config = MockConfig {
            stale_sensors: vec![SEMSEG_SENSOR_ID.to_string()],
            ..Default::default()
        };
        let mut driver = driver(config, blueprint(vec![0])).await;
        let before = driver.client().current_settings();

        let err = driver.run_session(base.path(), started()).await.unwrap_err();
        assert!(err.is_violation(), "unexpected error: {err}");
        assert_eq!(driver.client().spawned_actor_count(), 0);
        assert_eq!(driver.client().current_settings(), before);
    }

    #[tokio::test]
    async fn test_late_delivery_is_skipped_not_misattributed() {
        let base = tempdir().unwrap();
        let mut bp = blueprint(vec![0]);
        bp.run.warmup_ticks = 1;
        bp.sync.timeout_sec = 0.2;
        let config = MockConfig {
            delayed_deliveries: vec![DelayedDelivery {
                sensor_id: RGB_SENSOR_ID.to_string(),
                nth_tick: 3,
                delay: Duration::from_millis(600),
            }],
            ..Default::default()
        };
        let mut driver = driver(config, bp).await;

        let report = driver.run_session(base.path(), started()).await.unwrap();
        let run = &report.runs[0];
        assert_eq!(run.timeouts, 1);
        assert_eq!(run.frames_recorded, 3);
        assert!(run.late_discarded >= 1);

        // the timed-out tick keeps its sequence number but writes nothing
        let rgb = run.dir.join(Modality::Rgb.dir_name());
        for sequence in [1, 3, 4] {
            assert!(rgb.join(Modality::Rgb.file_name(sequence)).is_file());
        }
        assert!(!rgb.join(Modality::Rgb.file_name(2)).exists());
        assert_eq!(pose_rows(&run.dir), 3);
        assert_eq!(report.summary.total_timeouts, 1);
        assert_eq!(report.summary.sensor_timeout_counts.get(RGB_SENSOR_ID), Some(&1));
    }

    #[tokio::test]
    async fn test_abort_policy_fails_on_timeout() {
        let base = tempdir().unwrap();
        let mut bp = blueprint(vec![0]);
        bp.sync.timeout_sec = 0.05;
        bp.sync.on_timeout = TimeoutPolicy::Abort;
        let config = MockConfig {
            silent_sensors: vec![DEPTH_SENSOR_ID.to_string()],
            ..Default::default()
        };
        let mut driver = driver(config, bp).await;

        let err = driver.run_session(base.path(), started()).await.unwrap_err();
        match err {
            SessionError::Sync(SyncError::Timeout { sensor_id, .. }) => {
                assert_eq!(sensor_id, DEPTH_SENSOR_ID)
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(driver.client().spawned_actor_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_mid_run_restores_world() {
        let base = tempdir().unwrap();
        let mut bp = blueprint(vec![3, 5]);
        bp.run.frames_per_run = 100_000;
        let (trigger, shutdown) = Shutdown::channel();
        let mut driver = driver(MockConfig::default(), bp).await.with_shutdown(shutdown);
        let before = driver.client().current_settings();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.trigger();
        });
        let report = tokio::time::timeout(
            Duration::from_secs(60),
            driver.run_session(base.path(), started()),
        )
        .await
        .expect("session should stop after the shutdown request")
        .unwrap();

        assert!(report.interrupted);
        assert_eq!(report.runs.len(), 1);
        let run = &report.runs[0];
        assert!(run.interrupted);
        assert!(run.warmup_ticks + run.frames_recorded < 100_000);
        assert_eq!(pose_rows(&run.dir) as u64, run.frames_recorded);
        assert_eq!(metadata(&run.dir).outcome, OUTCOME_INTERRUPTED);
        assert!(!report.session_dir.join("2_1").exists());

        let client = driver.client();
        assert_eq!(client.current_settings(), before);
        assert_eq!(client.spawned_actor_count(), 0);
        assert_eq!(client.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_before_session_starts_no_run() {
        let base = tempdir().unwrap();
        let (trigger, shutdown) = Shutdown::channel();
        trigger.trigger();
        let mut driver = driver(MockConfig::default(), blueprint(vec![3]))
            .await
            .with_shutdown(shutdown);

        let report = driver.run_session(base.path(), started()).await.unwrap();

        assert!(report.interrupted);
        assert!(report.runs.is_empty());
        assert!(!report.session_dir.join("1_1").exists());
        assert_eq!(driver.client().spawned_actor_count(), 0);
        assert!(!driver.client().current_settings().synchronous_mode);
    }

    #[tokio::test]
    async fn test_failed_begin_still_writes_pose_table() {
        let base = tempdir().unwrap();
        let mut bp = blueprint(vec![3]);
        bp.sync.fps = 0.0;
        let mut driver = driver(MockConfig::default(), bp).await;
        let before = driver.client().current_settings();

        let err = driver.run_session(base.path(), started()).await.unwrap_err();
        assert!(matches!(err, SessionError::Sync(SyncError::InvalidRate(_))));

        let run_dir = base.path().join("08_24_13_30_13").join("1_1");
        assert!(run_dir.join(CAMERA_FILE).is_file());
        assert_eq!(pose_rows(&run_dir), 0);
        assert_ne!(metadata(&run_dir).outcome, OUTCOME_COMPLETED);
        assert_eq!(driver.client().spawned_actor_count(), 0);
        assert_eq!(driver.client().current_settings(), before);
    }

    #[tokio::test]
    async fn test_session_archive() {
        let base = tempdir().unwrap();
        let mut driver = driver(MockConfig::default(), blueprint(vec![3, 5])).await;
        let report = driver.run_session(base.path(), started()).await.unwrap();

        let output = base.path().join("dataset.zip");
        let summary =
            package_archive(&report.session_dir, &[Modality::Rgb, Modality::Semseg], &output)
                .unwrap();
        assert_eq!(summary.folders, 2);
        // 2 runs x 3 frames x 2 modalities, plus the first run's pose and focal files
        assert_eq!(summary.entries, 14);

        let file = std::fs::File::open(&output).unwrap();
        let archive = zip::ZipArchive::new(file).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert_eq!(names.len(), 14);
        assert!(names.contains(&"1_1/rgb/2.png"));
        assert!(names.contains(&"2_1/semseg/4_semseg.png"));
        assert!(names.contains(&"1_1/camera.txt"));
        assert!(names.contains(&"1_1/focal.txt"));
        assert!(!names.contains(&"2_1/camera.txt"));
        assert!(!names.iter().any(|n| n.contains("masked_rgb")));
    }
}
