// Framing module - sliding-window frame buffer and analysis windows
//
// The frame buffer turns an arbitrarily chunked sample stream into
// fixed-size overlapping frames. After each completed frame the last
// `frame_size - hop_size` samples are shifted to the front and the write
// cursor resumes at that overlap boundary, so one frame completes for every
// `hop_size` samples pushed regardless of how the host delivers them.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Analysis window shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Hann,
    Hamming,
    /// All-ones window (no tapering)
    Rectangular,
}

/// Precomputed window coefficient table
#[derive(Debug, Clone)]
pub struct WindowFunction {
    kind: WindowKind,
    coefficients: Vec<f32>,
}

impl WindowFunction {
    /// Compute a periodic window of `len` coefficients
    ///
    /// Periodic (rather than symmetric) tables are used so that shifted copies
    /// at common overlaps sum to a constant during resynthesis.
    pub fn new(kind: WindowKind, len: usize) -> Self {
        let n = len.max(1) as f32;
        let coefficients = (0..len)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / n;
                match kind {
                    WindowKind::Hann => 0.5 - 0.5 * phase.cos(),
                    WindowKind::Hamming => 0.54 - 0.46 * phase.cos(),
                    WindowKind::Rectangular => 1.0,
                }
            })
            .collect();

        Self { kind, coefficients }
    }

    pub fn kind(&self) -> WindowKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }

    /// Element-wise multiply `input` by the window into `output`
    ///
    /// `output` is resized to the window length; missing input samples are
    /// treated as zero.
    pub fn apply(&self, input: &[f32], output: &mut Vec<f32>) {
        output.clear();
        output.extend(
            self.coefficients
                .iter()
                .enumerate()
                .map(|(i, &w)| input.get(i).copied().unwrap_or(0.0) * w),
        );
    }
}

/// Result of pushing one sample into the frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The frame is still filling
    Pending,
    /// The buffer holds a complete frame; read it, then call `advance`
    FrameReady,
}

/// Fixed-capacity sliding frame buffer
pub struct FrameBuffer {
    frame_size: usize,
    hop_size: usize,
    buffer: Vec<f32>,
    cursor: usize,
    /// A non-finite sample landed in the frame currently filling
    corrupt: bool,
    malformed_samples: u64,
}

impl FrameBuffer {
    /// Create a frame buffer
    ///
    /// # Errors
    /// Fails if either size is zero or `hop_size > frame_size`.
    pub fn new(frame_size: usize, hop_size: usize) -> Result<Self, ConfigError> {
        if frame_size == 0 {
            return Err(ConfigError::FrameSizeZero);
        }
        if hop_size == 0 {
            return Err(ConfigError::HopSizeZero);
        }
        if hop_size > frame_size {
            return Err(ConfigError::HopExceedsFrame {
                hop: hop_size,
                frame: frame_size,
            });
        }

        Ok(Self {
            frame_size,
            hop_size,
            buffer: vec![0.0; frame_size],
            cursor: 0,
            corrupt: false,
            malformed_samples: 0,
        })
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn overlap(&self) -> usize {
        self.frame_size - self.hop_size
    }

    /// Current write position
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Samples buffered so far in the filling frame
    pub fn buffered(&self) -> &[f32] {
        &self.buffer[..self.cursor]
    }

    /// Total non-finite samples replaced by silence
    pub fn malformed_samples(&self) -> u64 {
        self.malformed_samples
    }

    /// Write one sample at the cursor
    ///
    /// A NaN or infinite sample is stored as silence and marks the filling
    /// frame as corrupt.
    pub fn push(&mut self, sample: f32) -> PushOutcome {
        debug_assert!(self.cursor < self.frame_size, "advance() not called");

        if sample.is_finite() {
            self.buffer[self.cursor] = sample;
        } else {
            self.buffer[self.cursor] = 0.0;
            self.corrupt = true;
            self.malformed_samples += 1;
        }
        self.cursor += 1;

        if self.cursor == self.frame_size {
            PushOutcome::FrameReady
        } else {
            PushOutcome::Pending
        }
    }

    /// The completed frame; only meaningful after `FrameReady`
    pub fn frame(&self) -> &[f32] {
        &self.buffer
    }

    /// Whether the completed frame contains a replaced sample
    pub fn is_corrupt(&self) -> bool {
        self.corrupt
    }

    /// Retain the frame tail as the head of the next frame
    pub fn advance(&mut self) {
        self.buffer.copy_within(self.hop_size.., 0);
        self.cursor = self.overlap();
        self.corrupt = false;
    }

    /// Drop all buffered samples
    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.cursor = 0;
        self.corrupt = false;
    }
}
