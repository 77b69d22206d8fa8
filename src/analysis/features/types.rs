// Types module - per-frame voice-activity features

use serde::{Deserialize, Serialize};

/// Features extracted from one analysis frame
///
/// These are the three inputs of the voice-activity rule. They are reported
/// alongside every decision so thresholds can be tuned from recorded output.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VoiceFeatures {
    /// Mean of squared sample values
    pub energy: f32,

    /// Fraction of adjacent sample pairs with opposite sign (0.0 to 1.0)
    pub zcr: f32,

    /// Magnitude-weighted mean frequency over the lower half of the spectrum, in Hz
    ///
    /// Zero when the frame has no spectral magnitude at all.
    pub centroid_hz: f32,
}
