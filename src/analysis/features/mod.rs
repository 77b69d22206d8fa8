// FeatureExtractor - voice-activity features for one frame
//
// Module organization:
// - types: Data structures (VoiceFeatures struct)
// - spectral: Frequency-domain features (centroid)
// - temporal: Time-domain features (energy, ZCR)
// - mod.rs: Coordinator (FeatureExtractor)
//
// Features extracted:
// 1. Energy: mean squared sample value of the windowed frame
// 2. Zero-Crossing Rate (ZCR): rate of sign changes (noise/tonality measure)
// 3. Spectral Centroid: weighted mean frequency over the lower half spectrum

mod spectral;
mod temporal;
mod types;

pub use spectral::SpectralFeatures;
pub use temporal::{compute_energy, compute_zcr};
pub use types::VoiceFeatures;

/// FeatureExtractor combines time- and frequency-domain feature computation
pub struct FeatureExtractor {
    spectral_features: SpectralFeatures,
}

impl FeatureExtractor {
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz (e.g., 16000)
    /// * `fft_size` - Transform length the magnitude spectra come from
    pub fn new(sample_rate: u32, fft_size: usize) -> Self {
        Self {
            spectral_features: SpectralFeatures::new(sample_rate, fft_size),
        }
    }

    /// Extract all features from a windowed frame and its magnitude spectrum
    pub fn extract(&self, windowed: &[f32], magnitudes: &[f32]) -> VoiceFeatures {
        VoiceFeatures {
            energy: compute_energy(windowed),
            zcr: compute_zcr(windowed),
            centroid_hz: self.spectral_features.compute_centroid(magnitudes),
        }
    }
}
