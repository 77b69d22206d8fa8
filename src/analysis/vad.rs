// Voice-activity gate
//
// A frame is speech when all three hold:
// - energy above the energy threshold (strict by default, `>=` when inclusive)
// - zero-crossing rate within [zcr_low, zcr_high]
// - spectral centroid within [centroid_low_hz, centroid_high_hz]
// Both range checks are inclusive at their ends.

use serde::{Deserialize, Serialize};

use crate::analysis::features::{FeatureExtractor, VoiceFeatures};
use crate::config::VadConfig;

/// Per-frame decision plus the features that produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceActivityDecision {
    pub is_speech: bool,
    pub features: VoiceFeatures,
}

pub struct VoiceActivityGate {
    thresholds: VadConfig,
    extractor: FeatureExtractor,
}

impl VoiceActivityGate {
    pub fn new(thresholds: VadConfig, sample_rate: u32, fft_size: usize) -> Self {
        Self {
            thresholds,
            extractor: FeatureExtractor::new(sample_rate, fft_size),
        }
    }

    pub fn thresholds(&self) -> &VadConfig {
        &self.thresholds
    }

    /// Replace thresholds; callers validate beforehand
    pub fn set_thresholds(&mut self, thresholds: VadConfig) {
        self.thresholds = thresholds;
    }

    /// Extract features from a frame and classify it
    pub fn classify(&self, windowed: &[f32], magnitudes: &[f32]) -> VoiceActivityDecision {
        self.decide(self.extractor.extract(windowed, magnitudes))
    }

    /// Apply the decision rule to precomputed features
    pub fn decide(&self, features: VoiceFeatures) -> VoiceActivityDecision {
        let t = &self.thresholds;

        let energetic = if t.energy_inclusive {
            features.energy >= t.energy_threshold
        } else {
            features.energy > t.energy_threshold
        };
        let zcr_ok = (t.zcr_low..=t.zcr_high).contains(&features.zcr);
        let centroid_ok = (t.centroid_low_hz..=t.centroid_high_hz).contains(&features.centroid_hz);

        VoiceActivityDecision {
            is_speech: energetic && zcr_ok && centroid_ok,
            features,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(thresholds: VadConfig) -> VoiceActivityGate {
        VoiceActivityGate::new(thresholds, 16000, 1024)
    }

    fn voiced(energy: f32) -> VoiceFeatures {
        VoiceFeatures {
            energy,
            zcr: 0.1,
            centroid_hz: 1000.0,
        }
    }

    #[test]
    fn test_silence_is_not_speech() {
        let gate = gate(VadConfig::default());
        let decision = gate.classify(&[0.0; 1024], &[0.0; 1024]);
        assert!(!decision.is_speech);
        assert_eq!(decision.features, VoiceFeatures::default());
    }

    #[test]
    fn test_silence_is_not_speech_even_with_zero_threshold_inclusive() {
        // Energy passes (0 >= 0) but the centroid of an empty spectrum is 0 Hz
        let gate = gate(VadConfig {
            energy_threshold: 0.0,
            energy_inclusive: true,
            ..VadConfig::default()
        });
        assert!(!gate.classify(&[0.0; 1024], &[0.0; 1024]).is_speech);
    }

    #[test]
    fn test_energy_boundary_exclusive_by_default() {
        let config = VadConfig::default();
        let gate = gate(config);
        assert!(!gate.decide(voiced(config.energy_threshold)).is_speech);
        assert!(gate.decide(voiced(config.energy_threshold * 1.01)).is_speech);
    }

    #[test]
    fn test_energy_boundary_inclusive() {
        let config = VadConfig {
            energy_inclusive: true,
            ..VadConfig::default()
        };
        let gate = gate(config);
        assert!(gate.decide(voiced(config.energy_threshold)).is_speech);
        assert!(!gate.decide(voiced(config.energy_threshold * 0.99)).is_speech);
    }

    #[test]
    fn test_frame_at_exact_energy_threshold() {
        use crate::analysis::spectrum::{SpectralAnalyzer, SpectralFrame};

        // ±0.5 square wave with an 8-sample period: energy is exactly 0.25,
        // ZCR about 0.25 and the centroid between its 2 kHz and 6 kHz partials
        let frame: Vec<f32> = (0..1024)
            .map(|i| if i % 8 < 4 { 0.5 } else { -0.5 })
            .collect();
        let mut analyzer = SpectralAnalyzer::new(1024);
        let mut spectrum = SpectralFrame::zeros(1024);
        analyzer.forward(&frame, &mut spectrum);
        let magnitudes = spectrum.magnitudes();

        let at_threshold = VadConfig {
            energy_threshold: 0.25,
            ..VadConfig::default()
        };
        let exclusive = gate(at_threshold).classify(&frame, &magnitudes);
        assert_eq!(exclusive.features.energy, 0.25);
        assert!(!exclusive.is_speech, "energy == threshold is rejected by default");

        let inclusive = gate(VadConfig {
            energy_inclusive: true,
            ..at_threshold
        })
        .classify(&frame, &magnitudes);
        assert!(
            inclusive.is_speech,
            "inclusive gate should accept the boundary frame: {:?}",
            inclusive.features
        );
    }

    #[test]
    fn test_zcr_and_centroid_ranges_are_inclusive() {
        let config = VadConfig::default();
        let gate = gate(config);

        let at_edges = VoiceFeatures {
            energy: 1.0,
            zcr: config.zcr_high,
            centroid_hz: config.centroid_low_hz,
        };
        assert!(gate.decide(at_edges).is_speech);

        let noisy = VoiceFeatures {
            zcr: 0.45,
            ..at_edges
        };
        assert!(!gate.decide(noisy).is_speech);

        let rumble = VoiceFeatures {
            centroid_hz: 120.0,
            ..at_edges
        };
        assert!(!gate.decide(rumble).is_speech);

        let hiss = VoiceFeatures {
            centroid_hz: 6000.0,
            ..at_edges
        };
        assert!(!gate.decide(hiss).is_speech);
    }

    #[test]
    fn test_decision_reports_features() {
        let gate = gate(VadConfig::default());
        let features = voiced(0.2);
        assert_eq!(gate.decide(features).features, features);
    }

    #[test]
    fn test_set_thresholds() {
        let mut gate = gate(VadConfig::default());
        gate.set_thresholds(VadConfig {
            energy_threshold: 0.5,
            ..VadConfig::default()
        });
        assert_eq!(gate.thresholds().energy_threshold, 0.5);
        assert!(!gate.decide(voiced(0.2)).is_speech);
    }
}
