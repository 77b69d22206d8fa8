// Mel-cepstral features
//
// Triangular filters are spaced evenly on the mel scale between `low_hz` and
// `high_hz`; weights are evaluated at each bin's centre frequency. A filter
// narrower than the bin spacing can miss every bin, so such geometries are
// rejected at construction. Band energy is the weighted sum of squared
// magnitudes, floored before the log, and a DCT-II across bands yields the
// coefficients.

use crate::error::ConfigError;

/// Floor applied to band energies before taking the log
const LOG_FLOOR: f32 = 1e-10;

pub fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

pub fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Mel filter bank + DCT with a reusable band-energy buffer
pub struct MelCepstrum {
    /// `bands` rows of `(first_bin, weights)`
    filters: Vec<(usize, Vec<f32>)>,
    /// `coefficients` rows of `bands` cosine terms
    dct: Vec<Vec<f32>>,
    band_energies: Vec<f32>,
}

impl MelCepstrum {
    /// # Arguments
    /// * `bands` - Number of triangular filters
    /// * `coefficients` - Cepstral coefficients to output (at most `bands`)
    /// * `fft_size` - Transform length of the incoming magnitude spectra
    /// * `sample_rate` - Sample rate in Hz
    /// * `low_hz`, `high_hz` - Filter bank edges
    pub fn new(
        bands: usize,
        coefficients: usize,
        fft_size: usize,
        sample_rate: u32,
        low_hz: f32,
        high_hz: f32,
    ) -> Result<Self, ConfigError> {
        if bands == 0 {
            return Err(ConfigError::MelBandsInvalid { bands });
        }
        if coefficients == 0 || coefficients > bands {
            return Err(ConfigError::CepstralCountInvalid {
                requested: coefficients,
                bands,
            });
        }
        let nyquist = sample_rate as f32 / 2.0;
        if !(low_hz >= 0.0 && low_hz < high_hz && high_hz <= nyquist) {
            return Err(ConfigError::InvalidRange {
                name: "mel".to_string(),
                low: low_hz,
                high: high_hz,
            });
        }

        let low_mel = hz_to_mel(low_hz);
        let high_mel = hz_to_mel(high_hz);
        let edges: Vec<f32> = (0..bands + 2)
            .map(|i| mel_to_hz(low_mel + (high_mel - low_mel) * i as f32 / (bands + 1) as f32))
            .collect();

        let bin_width = sample_rate as f32 / fft_size as f32;
        let usable_bins = fft_size / 2 + 1;

        let filters: Vec<(usize, Vec<f32>)> = edges
            .windows(3)
            .map(|e| {
                let (left, centre, right) = (e[0], e[1], e[2]);
                let first = ((left / bin_width).ceil() as usize).min(usable_bins);
                let last = ((right / bin_width).floor() as usize + 1).min(usable_bins);
                let weights = (first..last.max(first))
                    .map(|bin| {
                        let f = bin as f32 * bin_width;
                        if f <= centre {
                            (f - left) / (centre - left)
                        } else {
                            (right - f) / (right - centre)
                        }
                        .max(0.0)
                    })
                    .collect();
                (first, weights)
            })
            .collect();

        if let Some(band) = filters
            .iter()
            .position(|(_, weights)| !weights.iter().any(|&w| w > 0.0))
        {
            return Err(ConfigError::MelFilterEmpty { band, fft_size });
        }

        let dct = (0..coefficients)
            .map(|k| {
                (0..bands)
                    .map(|m| {
                        (std::f32::consts::PI * k as f32 * (m as f32 + 0.5) / bands as f32).cos()
                    })
                    .collect()
            })
            .collect();

        Ok(Self {
            filters,
            dct,
            band_energies: vec![0.0; bands],
        })
    }

    pub fn bands(&self) -> usize {
        self.filters.len()
    }

    pub fn coefficients(&self) -> usize {
        self.dct.len()
    }

    /// Log mel band energies of the most recent `compute` call
    pub fn band_energies(&self) -> &[f32] {
        &self.band_energies
    }

    /// Compute cepstral coefficients from a magnitude spectrum into `out`
    pub fn compute(&mut self, magnitudes: &[f32], out: &mut Vec<f32>) {
        for (energy, (first, weights)) in self.band_energies.iter_mut().zip(&self.filters) {
            let sum: f32 = weights
                .iter()
                .enumerate()
                .filter_map(|(j, &w)| magnitudes.get(first + j).map(|&m| w * m * m))
                .sum();
            *energy = sum.max(LOG_FLOOR).ln();
        }

        out.clear();
        out.extend(self.dct.iter().map(|row| {
            row.iter()
                .zip(&self.band_energies)
                .map(|(&c, &e)| c * e)
                .sum::<f32>()
        }));
    }
}
