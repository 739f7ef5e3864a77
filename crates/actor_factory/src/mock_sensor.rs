//! Mock sensor implementation
//!
//! Implements `SensorSource` on top of the mock world's listener table and
//! synthesizes payloads that look like the real camera encodings:
//! BGRA color, BGRA-packed normalized depth, and class tags in the red
//! channel for segmentation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use contracts::{
    ActorId, ImageData, ImageFormat, LidarPoint, PointCloudData, SensorKind, SensorPayload,
    SensorRecordCallback, SensorSource,
};
use tracing::debug;

use crate::mock_client::MockWorld;

/// Depth of the sky band, in the 0..=255 scaled unit
const SKY_DEPTH: f64 = 255.0;
/// Depth of the obstacle patch in the lower image centre (closer than the default min depth)
const NEAR_DEPTH: f64 = 2.0;

const TAG_UNLABELED: u8 = 0;
const TAG_BUILDING: u8 = 1;
const TAG_ROAD: u8 = 7;
const TAG_VEHICLE: u8 = 10;

/// Mock sensor
///
/// Records are produced by `MockSimulator::tick`, one per call, on a
/// separate thread per record.
pub struct MockSensorSource {
    sensor_id: String,
    kind: SensorKind,
    actor_id: Option<ActorId>,
    world: Arc<MockWorld>,
    listening: Arc<AtomicBool>,
    token: AtomicU64,
}

impl MockSensorSource {
    pub(crate) fn new(
        sensor_id: String,
        kind: SensorKind,
        actor_id: Option<ActorId>,
        world: Arc<MockWorld>,
    ) -> Self {
        Self {
            sensor_id,
            kind,
            actor_id,
            world,
            listening: Arc::new(AtomicBool::new(false)),
            token: AtomicU64::new(0),
        }
    }
}

impl SensorSource for MockSensorSource {
    fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    fn sensor_kind(&self) -> SensorKind {
        self.kind
    }

    fn listen(&self, callback: SensorRecordCallback) {
        // Idempotent: if already listening, don't start again
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let listening = self.listening.clone();
        let gated: SensorRecordCallback = Arc::new(move |record| {
            if listening.load(Ordering::Acquire) {
                callback(record);
            }
        });

        let token = self
            .world
            .add_listener(&self.sensor_id, self.kind, self.actor_id, gated);
        self.token.store(token, Ordering::SeqCst);

        debug!(sensor_id = %self.sensor_id, kind = self.kind.as_str(), "mock sensor listening");
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            self.world.remove_listener(self.token.load(Ordering::SeqCst));
            debug!(sensor_id = %self.sensor_id, "mock sensor stopped");
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

impl Drop for MockSensorSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Generate simulated data payload for one frame
pub(crate) fn synthesize_payload(
    kind: SensorKind,
    width: u32,
    height: u32,
    frame: u64,
) -> SensorPayload {
    match kind {
        SensorKind::RgbCamera => image(width, height, |x, y| {
            let b = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            let r = (frame.wrapping_mul(7) % 256) as u8;
            [b, g, r, 255]
        }),
        SensorKind::DepthCamera => image(width, height, |x, y| {
            encode_depth(scene_depth(x, y, width, height) / SKY_DEPTH)
        }),
        SensorKind::SemanticCamera => image(width, height, |x, y| {
            [0, 0, scene_tag(x, y, width, height), 255]
        }),
        SensorKind::Lidar => {
            let radius = 10.0 + (frame % 5) as f32;
            let points: Vec<LidarPoint> = (0..32)
                .map(|i| {
                    let angle = i as f32 * std::f32::consts::TAU / 32.0;
                    LidarPoint {
                        x: radius * angle.cos(),
                        y: radius * angle.sin(),
                        z: -1.5,
                        intensity: 0.5,
                    }
                })
                .collect();
            SensorPayload::PointCloud(PointCloudData::from_points(&points))
        }
        SensorKind::WorldTick => SensorPayload::Raw(Bytes::new()),
    }
}

fn image(width: u32, height: u32, pixel: impl Fn(u32, u32) -> [u8; 4]) -> SensorPayload {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&pixel(x, y));
        }
    }
    SensorPayload::Image(ImageData {
        width,
        height,
        format: ImageFormat::Bgra8,
        data: Bytes::from(data),
    })
}

/// Upper third is sky, a near obstacle sits in the lower centre, the rest
/// is ground getting closer towards the bottom row.
fn scene_depth(x: u32, y: u32, width: u32, height: u32) -> f64 {
    if y < height / 3 {
        SKY_DEPTH
    } else if is_obstacle(x, y, width, height) {
        NEAR_DEPTH
    } else {
        4.0 + 60.0 * f64::from(height - y) / f64::from(height.max(1))
    }
}

fn scene_tag(x: u32, y: u32, width: u32, height: u32) -> u8 {
    if y < height / 3 {
        TAG_UNLABELED
    } else if is_obstacle(x, y, width, height) {
        TAG_VEHICLE
    } else if x < width / 8 {
        TAG_BUILDING
    } else {
        TAG_ROAD
    }
}

fn is_obstacle(x: u32, y: u32, width: u32, height: u32) -> bool {
    let cx = width / 2;
    x + width / 8 >= cx && x <= cx + width / 8 && y >= height * 3 / 4
}

/// Pack a normalized depth into BGRA the way the depth camera does
fn encode_depth(normalized: f64) -> [u8; 4] {
    let v = (normalized.clamp(0.0, 1.0) * 16_777_215.0).round() as u32;
    let r = (v & 0xFF) as u8;
    let g = ((v >> 8) & 0xFF) as u8;
    let b = ((v >> 16) & 0xFF) as u8;
    [b, g, r, 255]
}
