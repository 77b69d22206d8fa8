//! Diagnostics telemetry collector and helpers.
//!
//! The collector multiplexes dropped-frame, voice-activity, processing-time
//! and buffer occupancy events into a bounded history plus a broadcast
//! stream. Nothing here is on the per-sample path: the pipeline publishes at
//! most a few events per frame.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;
use tokio::sync::broadcast;

pub mod events;

pub use events::{DiagnosticError, MetricEvent};

/// Global telemetry hub shared across the crate.
static HUB: Lazy<TelemetryHub> = Lazy::new(TelemetryHub::default);

/// Access the global telemetry hub.
pub fn hub() -> &'static TelemetryHub {
    &HUB
}

/// Diagnostics never fail on a poisoned lock; the guarded data stays usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
    pub frames_dropped: u64,
    pub malformed_samples: u64,
}

/// Broadcast-based collector retaining a bounded history of metrics.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        {
            let mut history = lock(&self.history);
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            if self.history_capacity > 0 {
                history.push_back(event.clone());
            }
        }

        // No subscribers is the normal case
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    fn recent(&self) -> Vec<MetricEvent> {
        lock(&self.history).iter().cloned().collect()
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

/// Rolling window of per-frame processing times
struct ProcessingTimeTracker {
    samples: VecDeque<f32>,
    max_samples: usize,
    /// Every observation since construction, unlike the window fill
    observed: u64,
}

impl ProcessingTimeTracker {
    fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
            observed: 0,
        }
    }

    fn observe(&mut self, value: f32) -> (f32, f32, usize) {
        self.observed += 1;
        if self.samples.len() == self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(value.abs());

        let count = self.samples.len();
        let sum: f32 = self.samples.iter().copied().sum();
        let max = self
            .samples
            .iter()
            .copied()
            .fold(0.0_f32, |acc, next| acc.max(next));
        (sum / count as f32, max, count)
    }
}

/// Top-level hub wrapping collector state plus derived gauges.
pub struct TelemetryHub {
    collector: TelemetryCollector,
    processing: Mutex<ProcessingTimeTracker>,
    /// Publish a processing-time summary every this many frames
    processing_report_interval: u64,
    buffer_gauges: Mutex<HashMap<&'static str, f32>>,
    frames_dropped: AtomicU64,
    malformed_samples: AtomicU64,
}

impl TelemetryHub {
    pub fn new(channel_capacity: usize, history_capacity: usize, timing_window: usize) -> Self {
        Self {
            collector: TelemetryCollector::new(channel_capacity, history_capacity),
            processing: Mutex::new(ProcessingTimeTracker::new(timing_window)),
            processing_report_interval: timing_window.max(1) as u64,
            buffer_gauges: Mutex::new(HashMap::new()),
            frames_dropped: AtomicU64::new(0),
            malformed_samples: AtomicU64::new(0),
        }
    }

    pub fn collector(&self) -> &TelemetryCollector {
        &self.collector
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.collector.subscribe()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            recent: self.collector.recent(),
            total_events: self.collector.total_events.load(Ordering::Relaxed),
            dropped_events: self.collector.dropped_history.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            malformed_samples: self.malformed_samples.load(Ordering::Relaxed),
        }
    }

    /// A frame was discarded because it held `malformed_samples` bad values
    pub fn record_frame_dropped(&self, frame_index: u64, malformed_samples: u64) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
        self.malformed_samples
            .fetch_add(malformed_samples, Ordering::Relaxed);
        self.collector.publish(MetricEvent::FrameDropped {
            frame_index,
            malformed_samples,
        });
    }

    pub fn record_noise_profile(&self, frames: usize, mean_magnitude: f32) {
        self.collector.publish(MetricEvent::NoiseProfileReady {
            frames,
            mean_magnitude,
        });
    }

    pub fn record_voice_activity(&self, frame_index: u64, energy: f32, zcr: f32, centroid_hz: f32) {
        self.collector.publish(MetricEvent::VoiceActivity {
            frame_index,
            energy,
            zcr,
            centroid_hz,
        });
    }

    /// Track one frame's processing cost; a summary is published once per window
    pub fn record_processing_time(&self, micros: f32) {
        let (avg, max, count, observed) = {
            let mut tracker = lock(&self.processing);
            let (avg, max, count) = tracker.observe(micros);
            (avg, max, count, tracker.observed)
        };

        if observed % self.processing_report_interval == 0 {
            self.collector.publish(MetricEvent::ProcessingTime {
                avg_us: avg,
                max_us: max,
                sample_count: count,
            });
        }
    }

    pub fn record_buffer_occupancy(&self, channel: &'static str, percent: f32) {
        let normalized = percent.clamp(0.0, 100.0);
        let mut gauges = lock(&self.buffer_gauges);

        let should_emit = gauges
            .get(channel)
            .map(|last| (last - normalized).abs() >= 2.5)
            .unwrap_or(true);

        if should_emit {
            gauges.insert(channel, normalized);
            self.collector.publish(MetricEvent::BufferOccupancy {
                channel: channel.to_string(),
                percent: normalized,
            });
        }
    }

    pub fn record_error(&self, code: DiagnosticError, context: impl Into<String>) {
        self.collector.publish(MetricEvent::Error {
            code,
            context: context.into(),
        });
    }
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new(256, 64, 32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupancy(percent: f32) -> MetricEvent {
        MetricEvent::BufferOccupancy {
            channel: "test".to_string(),
            percent,
        }
    }

    #[test]
    fn collector_preserves_order_within_history() {
        let collector = TelemetryCollector::new(8, 3);
        collector.publish(MetricEvent::FrameDropped {
            frame_index: 1,
            malformed_samples: 1,
        });
        collector.publish(occupancy(10.0));
        collector.publish(MetricEvent::FrameDropped {
            frame_index: 7,
            malformed_samples: 2,
        });

        let recent = collector.recent();
        assert_eq!(recent.len(), 3);
        assert!(matches!(
            recent[0],
            MetricEvent::FrameDropped { frame_index: 1, .. }
        ));
        assert!(matches!(
            recent[2],
            MetricEvent::FrameDropped { frame_index: 7, .. }
        ));
    }

    #[test]
    fn collector_drops_history_when_full() {
        let hub = TelemetryHub::new(8, 2, 4);
        hub.collector().publish(occupancy(1.0));
        hub.collector().publish(occupancy(2.0));
        hub.collector().publish(occupancy(3.0));

        let snapshot = hub.snapshot();
        assert_eq!(snapshot.recent.len(), 2);
        assert_eq!(snapshot.dropped_events, 1);
        assert_eq!(snapshot.total_events, 3);
        assert!(
            matches!(snapshot.recent[0], MetricEvent::BufferOccupancy { percent, .. } if (percent - 2.0).abs() < f32::EPSILON)
        );
    }

    #[test]
    fn hub_counts_dropped_frames() {
        let hub = TelemetryHub::new(8, 8, 4);
        hub.record_frame_dropped(3, 2);
        hub.record_frame_dropped(9, 1);

        let snapshot = hub.snapshot();
        assert_eq!(snapshot.frames_dropped, 2);
        assert_eq!(snapshot.malformed_samples, 3);
    }

    #[test]
    fn processing_time_is_summarised_once_per_window() {
        let hub = TelemetryHub::new(8, 16, 4);
        for micros in [10.0, 20.0, 30.0, 40.0, 50.0] {
            hub.record_processing_time(micros);
        }

        let summaries: Vec<_> = hub
            .snapshot()
            .recent
            .into_iter()
            .filter(|event| matches!(event, MetricEvent::ProcessingTime { .. }))
            .collect();
        assert_eq!(summaries.len(), 1, "expected one summary, got {:?}", summaries);
        assert!(
            matches!(summaries[0], MetricEvent::ProcessingTime { avg_us, max_us, sample_count: 4 } if (avg_us - 25.0).abs() < 1e-3 && (max_us - 40.0).abs() < 1e-3)
        );
    }

    #[test]
    fn processing_time_cadence_holds_after_window_fills() {
        let hub = TelemetryHub::new(8, 1000, 32);
        for _ in 0..100 {
            hub.record_processing_time(10.0);
        }

        let fills: Vec<usize> = hub
            .snapshot()
            .recent
            .into_iter()
            .filter_map(|event| match event {
                MetricEvent::ProcessingTime { sample_count, .. } => Some(sample_count),
                _ => None,
            })
            .collect();
        assert_eq!(fills, vec![32, 32, 32], "one summary per 32 frames");
    }

    #[test]
    fn buffer_gauge_debounces_small_changes() {
        let hub = TelemetryHub::new(8, 8, 4);
        hub.record_buffer_occupancy("queue", 10.0);
        hub.record_buffer_occupancy("queue", 10.5);
        hub.record_buffer_occupancy("queue", 25.0);

        let emitted = hub
            .snapshot()
            .recent
            .iter()
            .filter(|event| matches!(event, MetricEvent::BufferOccupancy { .. }))
            .count();
        assert_eq!(emitted, 2);
    }

    #[test]
    fn subscribers_receive_published_events() {
        let hub = TelemetryHub::new(8, 8, 4);
        let mut rx = hub.subscribe();
        hub.record_error(DiagnosticError::CommandRejected, "zcr range inverted");

        match rx.try_recv() {
            Ok(MetricEvent::Error { code, context }) => {
                assert_eq!(code, DiagnosticError::CommandRejected);
                assert!(context.contains("zcr"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
