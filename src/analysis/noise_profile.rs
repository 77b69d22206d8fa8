// Noise profile module - stationary noise estimate from the session start
//
// The estimator is a two-state machine. While Learning it averages the
// magnitude spectra of the first `max_learning_frames` frames; on the frame
// that reaches the count it computes the per-bin mean, frees the accumulator
// and becomes Frozen. A Frozen estimator never changes again.

use serde::{Deserialize, Serialize};

/// Frozen per-bin noise magnitude
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseProfile {
    magnitudes: Vec<f32>,
    frames: usize,
}

impl NoiseProfile {
    /// Build a profile directly, e.g. an all-zero profile for bypass tests
    pub fn from_magnitudes(magnitudes: Vec<f32>, frames: usize) -> Self {
        Self { magnitudes, frames }
    }

    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Number of frames averaged
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    pub fn mean_magnitude(&self) -> f32 {
        if self.magnitudes.is_empty() {
            return 0.0;
        }
        self.magnitudes.iter().sum::<f32>() / self.magnitudes.len() as f32
    }
}

enum EstimatorState {
    Learning { sums: Vec<f64>, frames: usize },
    Frozen(NoiseProfile),
}

/// Learns the noise profile from the first frames of a session
pub struct NoiseProfileEstimator {
    bins: usize,
    target_frames: usize,
    state: EstimatorState,
}

impl NoiseProfileEstimator {
    /// Create an estimator for spectra of `bins` values
    ///
    /// A `max_learning_frames` of 0 behaves like 1: the first observed frame
    /// becomes the profile.
    pub fn new(bins: usize, max_learning_frames: usize) -> Self {
        Self {
            bins,
            target_frames: max_learning_frames.max(1),
            state: EstimatorState::Learning {
                sums: vec![0.0; bins],
                frames: 0,
            },
        }
    }

    pub fn is_learning(&self) -> bool {
        matches!(self.state, EstimatorState::Learning { .. })
    }

    pub fn target_frames(&self) -> usize {
        self.target_frames
    }

    /// Frames observed so far (saturates at the target once frozen)
    pub fn frames_observed(&self) -> usize {
        match &self.state {
            EstimatorState::Learning { frames, .. } => *frames,
            EstimatorState::Frozen(profile) => profile.frames(),
        }
    }

    pub fn profile(&self) -> Option<&NoiseProfile> {
        match &self.state {
            EstimatorState::Frozen(profile) => Some(profile),
            EstimatorState::Learning { .. } => None,
        }
    }

    /// Accumulate one magnitude spectrum
    ///
    /// # Returns
    /// `Some(profile)` exactly once, on the observation that freezes the
    /// estimator. Observations after that are ignored and return `None`.
    pub fn observe(&mut self, magnitudes: &[f32]) -> Option<&NoiseProfile> {
        let (sums, frames) = match &mut self.state {
            EstimatorState::Learning { sums, frames } => (sums, frames),
            EstimatorState::Frozen(_) => return None,
        };

        debug_assert_eq!(magnitudes.len(), self.bins);
        for (sum, &mag) in sums.iter_mut().zip(magnitudes) {
            *sum += mag as f64;
        }
        *frames += 1;

        if *frames < self.target_frames {
            return None;
        }

        let count = *frames;
        let profile = NoiseProfile {
            magnitudes: sums.iter().map(|&s| (s / count as f64) as f32).collect(),
            frames: count,
        };
        tracing::info!(
            "[NoiseProfile] Frozen after {} frames, mean magnitude {:.5}",
            count,
            profile.mean_magnitude()
        );

        // Replacing the state drops the accumulator
        self.state = EstimatorState::Frozen(profile);
        self.profile()
    }

    /// Return to Learning with an empty accumulator
    pub fn reset(&mut self) {
        self.state = EstimatorState::Learning {
            sums: vec![0.0; self.bins],
            frames: 0,
        };
    }
}
