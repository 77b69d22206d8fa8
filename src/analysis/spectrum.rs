// Spectrum module - forward and inverse transforms
//
// Bin `k` of the forward transform is `sum_n x[n] * exp(-2*pi*i*k*n/N)`, the
// direct DFT definition, with no scaling. The inverse divides by `N` so that
// inverse(forward(x)) == x. Bins are kept at full frame length, so real input
// yields a conjugate-symmetric spectrum.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Complex spectrum of one frame, stored as parallel real/imaginary arrays
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFrame {
    pub re: Vec<f32>,
    pub im: Vec<f32>,
}

impl SpectralFrame {
    pub fn zeros(len: usize) -> Self {
        Self {
            re: vec![0.0; len],
            im: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.re.len()
    }

    pub fn is_empty(&self) -> bool {
        self.re.is_empty()
    }

    /// `sqrt(re^2 + im^2)` per bin
    pub fn magnitudes_into(&self, out: &mut Vec<f32>) {
        out.clear();
        out.extend(self.re.iter().zip(&self.im).map(|(&re, &im)| re.hypot(im)));
    }

    /// `atan2(im, re)` per bin
    pub fn phases_into(&self, out: &mut Vec<f32>) {
        out.clear();
        out.extend(self.re.iter().zip(&self.im).map(|(&re, &im)| im.atan2(re)));
    }

    pub fn magnitudes(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len());
        self.magnitudes_into(&mut out);
        out
    }

    pub fn phases(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len());
        self.phases_into(&mut out);
        out
    }

    /// Rebuild from magnitude and phase arrays of equal length
    pub fn set_polar(&mut self, magnitudes: &[f32], phases: &[f32]) {
        debug_assert_eq!(magnitudes.len(), phases.len());
        self.re.clear();
        self.im.clear();
        for (&mag, &phase) in magnitudes.iter().zip(phases) {
            let (sin, cos) = phase.sin_cos();
            self.re.push(mag * cos);
            self.im.push(mag * sin);
        }
    }
}

/// Reference O(N^2) DFT used to pin down the transform convention
///
/// Accumulates in `f64`; intended for tests and offline verification.
pub fn direct_dft(input: &[f32]) -> SpectralFrame {
    let n = input.len();
    let mut frame = SpectralFrame::zeros(n);
    for k in 0..n {
        let mut re = 0.0f64;
        let mut im = 0.0f64;
        for (t, &x) in input.iter().enumerate() {
            // Reduce k*t mod n before scaling to keep the angle small
            let angle = -2.0 * std::f64::consts::PI * ((k * t) % n) as f64 / n as f64;
            re += x as f64 * angle.cos();
            im += x as f64 * angle.sin();
        }
        frame.re[k] = re as f32;
        frame.im[k] = im as f32;
    }
    frame
}

/// FFT-backed analyzer with pre-planned transforms and reusable scratch
pub struct SpectralAnalyzer {
    size: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectralAnalyzer {
    /// Plan forward and inverse transforms of `size` points
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len());

        Self {
            size,
            forward,
            inverse,
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward transform of a real frame
    ///
    /// Input shorter than the transform size is zero-padded; extra samples
    /// are ignored.
    pub fn forward(&mut self, input: &[f32], out: &mut SpectralFrame) {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            *slot = Complex::new(input.get(i).copied().unwrap_or(0.0), 0.0);
        }

        self.forward
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        out.re.clear();
        out.im.clear();
        for c in &self.buffer {
            out.re.push(c.re);
            out.im.push(c.im);
        }
    }

    /// Inverse transform, keeping the real part scaled by `1/N`
    pub fn inverse(&mut self, spectrum: &SpectralFrame, out: &mut Vec<f32>) {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            *slot = Complex::new(
                spectrum.re.get(i).copied().unwrap_or(0.0),
                spectrum.im.get(i).copied().unwrap_or(0.0),
            );
        }

        self.inverse
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let scale = 1.0 / self.size as f32;
        out.clear();
        out.extend(self.buffer.iter().map(|c| c.re * scale));
    }
}
