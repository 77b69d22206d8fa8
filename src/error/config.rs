// Configuration error types

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Log a configuration error with structured context
pub fn log_config_error(err: &ConfigError, context: &str) {
    error!(
        "Config error in {}: code={}, component=PipelineConfig, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Configuration errors
///
/// Raised by `PipelineConfig::validate` and by every constructor that takes
/// a configuration. None of these can occur once a pipeline is running.
///
/// Error code range: 3001-3009
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Frame size must be at least one sample
    FrameSizeZero,

    /// Hop size must be at least one sample
    HopSizeZero,

    /// Hop size larger than the frame would skip samples
    HopExceedsFrame { hop: usize, frame: usize },

    /// Sample rate must be positive
    SampleRateInvalid { sample_rate: u32 },

    /// A `[low, high]` bound pair is inverted or out of its domain
    InvalidRange { name: String, low: f32, high: f32 },

    /// A scalar factor is negative, non-finite or out of its domain
    InvalidFactor { name: String, value: f32 },

    /// Mel filter bank needs at least one band
    MelBandsInvalid { bands: usize },

    /// Cepstral coefficient count must be in `1..=bands`
    CepstralCountInvalid { requested: usize, bands: usize },

    /// A mel filter covers no FFT bin at this frame size
    MelFilterEmpty { band: usize, fft_size: usize },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> i32 {
        match self {
            ConfigError::FrameSizeZero => 3001,
            ConfigError::HopSizeZero => 3002,
            ConfigError::HopExceedsFrame { .. } => 3003,
            ConfigError::SampleRateInvalid { .. } => 3004,
            ConfigError::InvalidRange { .. } => 3005,
            ConfigError::InvalidFactor { .. } => 3006,
            ConfigError::MelBandsInvalid { .. } => 3007,
            ConfigError::CepstralCountInvalid { .. } => 3008,
            ConfigError::MelFilterEmpty { .. } => 3009,
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigError::FrameSizeZero => "frame_size must be greater than 0".to_string(),
            ConfigError::HopSizeZero => "hop_size must be greater than 0".to_string(),
            ConfigError::HopExceedsFrame { hop, frame } => {
                format!("hop_size ({}) must not exceed frame_size ({})", hop, frame)
            }
            ConfigError::SampleRateInvalid { sample_rate } => {
                format!("sample_rate must be greater than 0 (got {})", sample_rate)
            }
            ConfigError::InvalidRange { name, low, high } => {
                format!("invalid range for {}: [{}, {}]", name, low, high)
            }
            ConfigError::InvalidFactor { name, value } => {
                format!("invalid value for {}: {}", name, value)
            }
            ConfigError::MelBandsInvalid { bands } => {
                format!("mel filter bank needs at least one band (got {})", bands)
            }
            ConfigError::CepstralCountInvalid { requested, bands } => format!(
                "cepstral coefficient count must be between 1 and {} (got {})",
                bands, requested
            ),
            ConfigError::MelFilterEmpty { band, fft_size } => format!(
                "mel band {} covers no bin of a {}-point spectrum; use fewer bands or a larger frame",
                band, fft_size
            ),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_codes() {
        assert_eq!(ConfigError::FrameSizeZero.code(), 3001);
        assert_eq!(ConfigError::HopSizeZero.code(), 3002);
        assert_eq!(ConfigError::HopExceedsFrame { hop: 2, frame: 1 }.code(), 3003);
        assert_eq!(ConfigError::SampleRateInvalid { sample_rate: 0 }.code(), 3004);
        assert_eq!(
            ConfigError::InvalidRange {
                name: "zcr".to_string(),
                low: 0.5,
                high: 0.1
            }
            .code(),
            3005
        );
        assert_eq!(
            ConfigError::InvalidFactor {
                name: "alpha".to_string(),
                value: -1.0
            }
            .code(),
            3006
        );
        assert_eq!(ConfigError::MelBandsInvalid { bands: 0 }.code(), 3007);
        assert_eq!(
            ConfigError::CepstralCountInvalid {
                requested: 30,
                bands: 26
            }
            .code(),
            3008
        );
        assert_eq!(
            ConfigError::MelFilterEmpty {
                band: 0,
                fft_size: 64
            }
            .code(),
            3009
        );
    }

    #[test]
    fn test_config_error_messages() {
        let err = ConfigError::HopExceedsFrame {
            hop: 2048,
            frame: 1024,
        };
        assert!(err.message().contains("2048"));
        assert!(err.message().contains("1024"));

        let err = ConfigError::InvalidFactor {
            name: "beta".to_string(),
            value: 2.0,
        };
        assert!(err.to_string().contains("beta"));
        assert!(err.to_string().contains("3006"));
    }
}
