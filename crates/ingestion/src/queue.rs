//! FrameQueue - push→pull 桥接
//!
//! 传感器在自己的投递线程上回调，回调只做一次非阻塞 `try_send`；
//! 控制任务通过 `pop(timeout)` 拉取。每个队列只有一个生产者和一个消费者。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_channel::{Receiver, TryRecvError};
use contracts::{SensorKind, SensorRecord, SensorSource};
use tracing::{debug, trace};

use crate::error::{IngestionError, Result};
use crate::stats::{QueueMetrics, QueueMetricsSnapshot};

/// 单个传感器的待消费记录队列
pub struct FrameQueue {
    sensor_id: String,
    kind: SensorKind,
    source: Box<dyn SensorSource>,
    rx: Receiver<SensorRecord>,
    metrics: Arc<QueueMetrics>,
    closed: AtomicBool,
}

impl FrameQueue {
    /// 注册回调并开始缓冲该传感器的记录
    pub fn register(source: Box<dyn SensorSource>) -> Self {
        let sensor_id = source.sensor_id().to_string();
        let kind = source.sensor_kind();
        let (tx, rx) = async_channel::unbounded::<SensorRecord>();
        let metrics = Arc::new(QueueMetrics::new());

        let cb_metrics = Arc::clone(&metrics);
        let cb_sensor_id = sensor_id.clone();
        source.listen(Arc::new(move |record: SensorRecord| {
            let tick = record.tick;
            match tx.try_send(record) {
                Ok(()) => {
                    cb_metrics.record_received(tx.len());
                    metrics::counter!(
                        "carla_capture_records_received_total",
                        "sensor_id" => cb_sensor_id.clone()
                    )
                    .increment(1);
                    trace!(sensor_id = %cb_sensor_id, tick = %tick, "record queued");
                }
                Err(_) => {
                    // 仅在队列已关闭时发生（无界队列不会满）
                    cb_metrics.record_rejected();
                    trace!(sensor_id = %cb_sensor_id, tick = %tick, "record after close dropped");
                }
            }
        }));

        debug!(sensor_id = %sensor_id, kind = kind.as_str(), "frame queue registered");

        Self {
            sensor_id,
            kind,
            source,
            rx,
            metrics,
            closed: AtomicBool::new(false),
        }
    }

    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// 当前缓冲的记录数
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// 取出最早的未消费记录，最多等待 `timeout`
    ///
    /// 队列已关闭且为空时返回 `Closed`，超时返回 `Timeout`。
    pub async fn pop(&self, timeout: Duration) -> Result<SensorRecord> {
        let started = Instant::now();
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Ok(record)) => {
                self.metrics.record_popped(self.rx.len());
                Ok(record)
            }
            Ok(Err(_)) => Err(IngestionError::Closed {
                sensor_id: self.sensor_id.clone(),
            }),
            Err(_) => {
                self.metrics.record_timeout();
                Err(IngestionError::Timeout {
                    sensor_id: self.sensor_id.clone(),
                    waited: started.elapsed(),
                })
            }
        }
    }

    /// 非阻塞地取出一条记录（用于丢弃过期记录）
    pub fn try_pop(&self) -> Option<SensorRecord> {
        match self.rx.try_recv() {
            Ok(record) => {
                self.metrics.record_popped(self.rx.len());
                Some(record)
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }

    /// 撤销回调注册；已缓冲的记录仍可被取出
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.source.stop();
        self.rx.close();
        debug!(
            sensor_id = %self.sensor_id,
            pending = self.rx.len(),
            "frame queue closed"
        );
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn metrics(&self) -> QueueMetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Drop for FrameQueue {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameQueue")
            .field("sensor_id", &self.sensor_id)
            .field("kind", &self.kind)
            .field("pending", &self.rx.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use contracts::{SensorPayload, SensorRecordCallback, Tick};

    use super::*;

    /// 手动触发的测试源
    #[derive(Clone, Default)]
    struct ManualSource {
        callback: Arc<Mutex<Option<SensorRecordCallback>>>,
        stopped: Arc<AtomicBool>,
    }

    impl ManualSource {
        fn emit(&self, tick: u64) {
            let cb = self.callback.lock().unwrap().clone();
            if let Some(cb) = cb {
                cb(record(tick));
            }
        }
    }

    impl SensorSource for ManualSource {
        fn sensor_id(&self) -> &str {
            "cam"
        }

        fn sensor_kind(&self) -> SensorKind {
            SensorKind::RgbCamera
        }

        fn listen(&self, callback: SensorRecordCallback) {
            *self.callback.lock().unwrap() = Some(callback);
        }

        fn stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
            self.callback.lock().unwrap().take();
        }

        fn is_listening(&self) -> bool {
            self.callback.lock().unwrap().is_some()
        }
    }

    fn record(tick: u64) -> SensorRecord {
        SensorRecord {
            sensor_id: "cam".to_string(),
            kind: SensorKind::RgbCamera,
            tick: Tick::new(tick),
            timestamp: tick as f64 * 0.05,
            payload: SensorPayload::Raw(Bytes::new()),
        }
    }

    #[tokio::test]
    async fn test_pop_returns_in_arrival_order() {
        let source = ManualSource::default();
        let queue = FrameQueue::register(Box::new(source.clone()));
        assert!(source.is_listening());

        source.emit(1);
        source.emit(2);
        source.emit(3);
        assert_eq!(queue.len(), 3);

        for expected in 1..=3 {
            let r = queue.pop(Duration::from_millis(50)).await.unwrap();
            assert_eq!(r.tick, Tick::new(expected));
        }
        assert!(queue.is_empty());
        assert_eq!(queue.metrics().records_popped, 3);
    }

    #[tokio::test]
    async fn test_pop_times_out_when_nothing_arrives() {
        let source = ManualSource::default();
        let queue = FrameQueue::register(Box::new(source));

        let err = queue.pop(Duration::from_millis(20)).await.unwrap_err();
        match err {
            IngestionError::Timeout { sensor_id, waited } => {
                assert_eq!(sensor_id, "cam");
                assert!(waited >= Duration::from_millis(10));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(queue.metrics().timeouts, 1);
    }

    #[tokio::test]
    async fn test_pop_wakes_on_push_from_other_thread() {
        let source = ManualSource::default();
        let queue = FrameQueue::register(Box::new(source.clone()));

        let producer = source.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            producer.emit(7);
        });

        let r = queue.pop(Duration::from_secs(2)).await.unwrap();
        assert_eq!(r.tick, Tick::new(7));
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_close_revokes_registration() {
        let source = ManualSource::default();
        let queue = FrameQueue::register(Box::new(source.clone()));
        source.emit(1);

        queue.close();
        assert!(source.stopped.load(Ordering::SeqCst));
        assert!(!source.is_listening());
        assert!(queue.is_closed());

        // 已缓冲的记录仍然可以取出，之后返回 Closed
        let r = queue.pop(Duration::from_millis(10)).await.unwrap();
        assert_eq!(r.tick, Tick::new(1));
        let err = queue.pop(Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, IngestionError::Closed { .. }));
    }

    #[test]
    fn test_drop_stops_source() {
        let source = ManualSource::default();
        {
            let _queue = FrameQueue::register(Box::new(source.clone()));
        }
        assert!(source.stopped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_try_pop() {
        let source = ManualSource::default();
        let queue = FrameQueue::register(Box::new(source.clone()));
        assert!(queue.try_pop().is_none());
        source.emit(4);
        assert_eq!(queue.try_pop().map(|r| r.tick), Some(Tick::new(4)));
        assert_eq!(queue.metrics().records_received, 1);
    }
}
