// Suppressor module - spectral subtraction and overlap-add resynthesis
//
// Per bin: clean = max(signal - alpha * noise, beta * signal). With a non-
// negative noise estimate and alpha >= 0 the result lies in
// [beta * signal, signal], so it is never negative and never louder than the
// input.
//
// Resynthesis multiplies each inverse-transformed frame by an optional
// synthesis window and accumulates it into an overlap-add buffer. Every hop
// emits `hop_size` samples divided by the steady-state sum of
// analysis * synthesis window products at that position, which gives unity
// gain whether or not the synthesis window is enabled.

use crate::analysis::framing::WindowFunction;
use crate::analysis::noise_profile::NoiseProfile;

/// Window-product sums below this are treated as zero coverage
const NORM_EPSILON: f32 = 1e-6;

/// Magnitude-domain spectral subtraction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralSubtractor {
    alpha: f32,
    beta: f32,
}

impl SpectralSubtractor {
    /// # Arguments
    /// * `alpha` - Over-subtraction factor (typically > 1.0)
    /// * `beta` - Spectral floor as a fraction of the input magnitude
    pub fn new(alpha: f32, beta: f32) -> Self {
        Self { alpha, beta }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn beta(&self) -> f32 {
        self.beta
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
    }

    pub fn set_beta(&mut self, beta: f32) {
        self.beta = beta;
    }

    /// Subtract the noise profile from `signal` into `out`
    ///
    /// Without a profile (still learning) the signal is copied unchanged.
    pub fn apply(&self, signal: &[f32], noise: Option<&NoiseProfile>, out: &mut Vec<f32>) {
        match noise {
            Some(profile) => self.subtract(signal, profile.magnitudes(), out),
            None => {
                out.clear();
                out.extend_from_slice(signal);
            }
        }
    }

    pub fn subtract(&self, signal: &[f32], noise: &[f32], out: &mut Vec<f32>) {
        debug_assert_eq!(signal.len(), noise.len());
        out.clear();
        out.extend(
            signal
                .iter()
                .zip(noise)
                .map(|(&s, &n)| (s - self.alpha * n).max(self.beta * s)),
        );
    }
}

/// Overlap-add accumulator for resynthesized frames
pub struct OverlapAdd {
    hop_size: usize,
    synthesis: Option<Vec<f32>>,
    accumulator: Vec<f32>,
    /// Reciprocal steady-state gain per position within a hop
    gain: Vec<f32>,
}

impl OverlapAdd {
    /// # Arguments
    /// * `analysis` - Window applied before the forward transform
    /// * `hop_size` - Samples emitted per frame
    /// * `synthesis_window` - Multiply frames by `analysis` again before accumulating
    pub fn new(analysis: &WindowFunction, hop_size: usize, synthesis_window: bool) -> Self {
        let frame_size = analysis.len();
        let coefficients = analysis.coefficients();
        let synthesis = synthesis_window.then(|| coefficients.to_vec());

        let gain = (0..hop_size)
            .map(|j| {
                let coverage: f32 = (j..frame_size)
                    .step_by(hop_size)
                    .map(|i| {
                        let s = synthesis.as_ref().map_or(1.0, |w| w[i]);
                        coefficients[i] * s
                    })
                    .sum();
                if coverage > NORM_EPSILON {
                    1.0 / coverage
                } else {
                    0.0
                }
            })
            .collect();

        Self {
            hop_size,
            synthesis,
            accumulator: vec![0.0; frame_size],
            gain,
        }
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn frame_size(&self) -> usize {
        self.accumulator.len()
    }

    pub fn uses_synthesis_window(&self) -> bool {
        self.synthesis.is_some()
    }

    /// Accumulate one time-domain frame and append `hop_size` samples to `output`
    pub fn push_frame(&mut self, frame: &[f32], output: &mut Vec<f32>) {
        match &self.synthesis {
            Some(window) => {
                for ((acc, &x), &w) in self.accumulator.iter_mut().zip(frame).zip(window) {
                    *acc += x * w;
                }
            }
            None => {
                for (acc, &x) in self.accumulator.iter_mut().zip(frame) {
                    *acc += x;
                }
            }
        }
        self.emit(output);
    }

    /// Advance by one hop without adding signal energy
    pub fn push_silence(&mut self, output: &mut Vec<f32>) {
        self.emit(output);
    }

    fn emit(&mut self, output: &mut Vec<f32>) {
        output.extend(
            self.accumulator[..self.hop_size]
                .iter()
                .zip(&self.gain)
                .map(|(&acc, &g)| acc * g),
        );

        let frame_size = self.accumulator.len();
        self.accumulator.copy_within(self.hop_size.., 0);
        self.accumulator[frame_size - self.hop_size..].fill(0.0);
    }

    pub fn reset(&mut self) {
        self.accumulator.fill(0.0);
    }
}
