// Spectral module - Frequency-domain feature extraction
//
// This module computes spectral features from full-length magnitude spectra.
// Only the lower half of the bins is used: for real input the upper half
// mirrors it.

/// Spectral feature computation
pub struct SpectralFeatures {
    sample_rate: u32,
    fft_size: usize,
}

impl SpectralFeatures {
    /// Create a new spectral features processor
    ///
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz
    /// * `fft_size` - Transform length
    pub fn new(sample_rate: u32, fft_size: usize) -> Self {
        Self {
            sample_rate,
            fft_size,
        }
    }

    /// Width of one bin in Hz
    pub fn bin_width_hz(&self) -> f32 {
        self.sample_rate as f32 / self.fft_size as f32
    }

    /// Compute spectral centroid (weighted mean frequency)
    ///
    /// Formula: centroid = Σ(f_i × |X[i]|) / Σ|X[i]| for i < N/2,
    /// with f_i = i × sample_rate / N
    ///
    /// # Returns
    /// Spectral centroid in Hz, or 0.0 when the spectrum carries no magnitude
    pub fn compute_centroid(&self, spectrum: &[f32]) -> f32 {
        let half = (self.fft_size / 2).min(spectrum.len());
        let freq_bin_width = self.bin_width_hz();

        let (weighted_sum, magnitude_sum) = spectrum[..half].iter().enumerate().fold(
            (0.0f64, 0.0f64),
            |(weighted, total), (i, &mag)| {
                let freq = i as f64 * freq_bin_width as f64;
                (weighted + freq * mag as f64, total + mag as f64)
            },
        );

        if magnitude_sum > 1e-10 {
            (weighted_sum / magnitude_sum) as f32
        } else {
            0.0
        }
    }
}
