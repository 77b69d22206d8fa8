//! Configuration management for the voice front end
//!
//! This module provides runtime configuration loading from JSON files so
//! frame geometry, suppression strength and voice-activity thresholds can be
//! tuned without recompilation. Every struct carries `#[serde(default)]`, so a
//! config file only needs the fields it overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::analysis::framing::WindowKind;
use crate::error::ConfigError;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub engine: EngineConfig,
}

/// What happens to the audio of frames observed while the noise profile is learned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningPolicy {
    /// Learning frames are resynthesized unmodified
    Passthrough,
    /// Learning frames are replaced by silence in the output stream
    Mute,
}

/// Frame geometry and per-stage parameters for one processing session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Analysis frame length in samples
    pub frame_size: usize,
    /// New samples advanced between consecutive frames
    pub hop_size: usize,
    /// Input sample rate in Hz
    pub sample_rate: u32,
    /// Analysis window
    pub window: WindowKind,
    /// Apply the analysis window a second time before overlap-add
    pub synthesis_window: bool,
    /// Number of frames averaged into the noise profile
    pub max_learning_frames: usize,
    pub learning_policy: LearningPolicy,
    /// Emit a decision event for every non-speech frame as well
    pub report_decisions: bool,
    pub suppression: SuppressionConfig,
    pub vad: VadConfig,
    pub mel: MelConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_size: 1024,
            hop_size: 512,
            sample_rate: 16_000,
            window: WindowKind::Hann,
            synthesis_window: true,
            max_learning_frames: 50,
            learning_policy: LearningPolicy::Passthrough,
            report_decisions: false,
            suppression: SuppressionConfig::default(),
            vad: VadConfig::default(),
            mel: MelConfig::default(),
        }
    }
}

/// Spectral subtraction strength
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuppressionConfig {
    /// Over-subtraction factor applied to the noise profile
    pub alpha: f32,
    /// Spectral floor as a fraction of the original magnitude
    pub beta: f32,
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            alpha: 2.0,
            beta: 0.01,
        }
    }
}

/// Voice-activity decision thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    /// Mean squared sample value a frame must exceed
    pub energy_threshold: f32,
    /// Treat `energy == energy_threshold` as speech
    pub energy_inclusive: bool,
    pub zcr_low: f32,
    pub zcr_high: f32,
    pub centroid_low_hz: f32,
    pub centroid_high_hz: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 1e-4,
            energy_inclusive: false,
            zcr_low: 0.02,
            zcr_high: 0.4,
            centroid_low_hz: 300.0,
            centroid_high_hz: 4000.0,
        }
    }
}

/// Mel filter bank and cepstral output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MelConfig {
    /// Compute cepstral coefficients for voice-active frames
    pub enabled: bool,
    pub bands: usize,
    pub coefficients: usize,
    pub low_hz: f32,
    /// Upper edge of the filter bank; `None` means Nyquist
    pub high_hz: Option<f32>,
}

impl Default for MelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bands: 26,
            coefficients: 13,
            low_hz: 0.0,
            high_hz: None,
        }
    }
}

/// Processing thread and channel sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of pre-allocated input buffers in flight
    pub buffer_pool_size: usize,
    /// Samples per input buffer (one audio quantum)
    pub buffer_size: usize,
    /// Number of cleaned-audio buffers the caller may leave undrained
    pub output_capacity: usize,
    /// Broadcast capacity for pipeline events
    pub event_capacity: usize,
    /// Pending threshold patches
    pub command_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_pool_size: 32,
            buffer_size: 128,
            output_capacity: 64,
            event_capacity: 128,
            command_capacity: 16,
        }
    }
}

/// Runtime update of threshold parameters
///
/// Frame geometry and sample rate are deliberately absent: changing them
/// requires building a new pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPatch {
    #[serde(default)]
    pub energy_threshold: Option<f32>,
    #[serde(default)]
    pub zcr_low: Option<f32>,
    #[serde(default)]
    pub zcr_high: Option<f32>,
    #[serde(default)]
    pub centroid_low_hz: Option<f32>,
    #[serde(default)]
    pub centroid_high_hz: Option<f32>,
    #[serde(default)]
    pub alpha: Option<f32>,
    #[serde(default)]
    pub beta: Option<f32>,
}

impl ThresholdPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl PipelineConfig {
    /// Number of samples shared between consecutive frames
    pub fn overlap(&self) -> usize {
        self.frame_size.saturating_sub(self.hop_size)
    }

    pub fn nyquist_hz(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }

    /// Upper mel edge with the Nyquist default resolved
    pub fn mel_high_hz(&self) -> f32 {
        self.mel.high_hz.unwrap_or_else(|| self.nyquist_hz())
    }

    /// Copy of this config with a new sample rate (e.g. taken from a WAV header)
    pub fn with_sample_rate(&self, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..self.clone()
        }
    }

    /// Check every construction-time invariant
    ///
    /// # Returns
    /// * `Ok(())` - All stages can be built from this config
    /// * `Err(ConfigError)` - The first violated rule
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_size == 0 {
            return Err(ConfigError::FrameSizeZero);
        }
        if self.hop_size == 0 {
            return Err(ConfigError::HopSizeZero);
        }
        if self.hop_size > self.frame_size {
            return Err(ConfigError::HopExceedsFrame {
                hop: self.hop_size,
                frame: self.frame_size,
            });
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::SampleRateInvalid {
                sample_rate: self.sample_rate,
            });
        }

        validate_suppression(&self.suppression)?;
        validate_vad(&self.vad)?;

        if self.mel.enabled {
            if self.mel.bands == 0 {
                return Err(ConfigError::MelBandsInvalid {
                    bands: self.mel.bands,
                });
            }
            if self.mel.coefficients == 0 || self.mel.coefficients > self.mel.bands {
                return Err(ConfigError::CepstralCountInvalid {
                    requested: self.mel.coefficients,
                    bands: self.mel.bands,
                });
            }
            let high = self.mel_high_hz();
            if !(self.mel.low_hz >= 0.0 && self.mel.low_hz < high && high <= self.nyquist_hz())
            {
                return Err(ConfigError::InvalidRange {
                    name: "mel".to_string(),
                    low: self.mel.low_hz,
                    high,
                });
            }
        }

        Ok(())
    }

    /// Apply a threshold patch, validating the result before committing it
    pub fn apply_patch(&mut self, patch: &ThresholdPatch) -> Result<(), ConfigError> {
        let mut vad = self.vad;
        let mut suppression = self.suppression;

        if let Some(value) = patch.energy_threshold {
            vad.energy_threshold = value;
        }
        if let Some(value) = patch.zcr_low {
            vad.zcr_low = value;
        }
        if let Some(value) = patch.zcr_high {
            vad.zcr_high = value;
        }
        if let Some(value) = patch.centroid_low_hz {
            vad.centroid_low_hz = value;
        }
        if let Some(value) = patch.centroid_high_hz {
            vad.centroid_high_hz = value;
        }
        if let Some(value) = patch.alpha {
            suppression.alpha = value;
        }
        if let Some(value) = patch.beta {
            suppression.beta = value;
        }

        validate_suppression(&suppression)?;
        validate_vad(&vad)?;

        self.vad = vad;
        self.suppression = suppression;
        Ok(())
    }
}

fn validate_suppression(suppression: &SuppressionConfig) -> Result<(), ConfigError> {
    if !suppression.alpha.is_finite() || suppression.alpha < 0.0 {
        return Err(ConfigError::InvalidFactor {
            name: "alpha".to_string(),
            value: suppression.alpha,
        });
    }
    if !(0.0..=1.0).contains(&suppression.beta) {
        return Err(ConfigError::InvalidFactor {
            name: "beta".to_string(),
            value: suppression.beta,
        });
    }
    Ok(())
}

fn validate_vad(vad: &VadConfig) -> Result<(), ConfigError> {
    if !vad.energy_threshold.is_finite() || vad.energy_threshold < 0.0 {
        return Err(ConfigError::InvalidFactor {
            name: "energy_threshold".to_string(),
            value: vad.energy_threshold,
        });
    }
    if !(vad.zcr_low >= 0.0 && vad.zcr_low <= vad.zcr_high && vad.zcr_high <= 1.0) {
        return Err(ConfigError::InvalidRange {
            name: "zcr".to_string(),
            low: vad.zcr_low,
            high: vad.zcr_high,
        });
    }
    if !(vad.centroid_low_hz >= 0.0 && vad.centroid_low_hz <= vad.centroid_high_hz) {
        return Err(ConfigError::InvalidRange {
            name: "centroid".to_string(),
            low: vad.centroid_low_hz,
            high: vad.centroid_high_hz,
        });
    }
    Ok(())
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file is missing or
    /// the JSON is invalid. Validation is left to the pipeline constructor.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default asset location
    pub fn load() -> Self {
        Self::load_from_file("assets/voice_config.json")
    }
}
