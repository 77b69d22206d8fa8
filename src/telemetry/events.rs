//! Telemetry event types describing pipeline diagnostics exposed to the CLI
//! and to embedding applications.

use serde::{Deserialize, Serialize};

/// Diagnostic error codes surfaced via telemetry metrics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticError {
    /// The inbound buffer pool had no free buffer for a batch
    InputBackpressure,
    /// Cleaned audio was discarded because the caller did not drain it
    OutputOverrun,
    /// A threshold patch failed validation
    CommandRejected,
    /// An input file could not be decoded
    FixtureLoad,
}

/// Metric events covering frame health, processing cost and buffer occupancy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    FrameDropped {
        frame_index: u64,
        malformed_samples: u64,
    },
    NoiseProfileReady {
        frames: usize,
        mean_magnitude: f32,
    },
    VoiceActivity {
        frame_index: u64,
        energy: f32,
        zcr: f32,
        centroid_hz: f32,
    },
    ProcessingTime {
        avg_us: f32,
        max_us: f32,
        sample_count: usize,
    },
    BufferOccupancy {
        channel: String,
        percent: f32,
    },
    Error {
        code: DiagnosticError,
        context: String,
    },
}
