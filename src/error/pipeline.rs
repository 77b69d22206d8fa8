// Pipeline handle error types

use crate::error::{ConfigError, ErrorCode};
use log::error;
use std::fmt;

/// Log a pipeline error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_pipeline_error(err: &PipelineError, context: &str) {
    error!(
        "Pipeline error in {}: code={}, component=PipelineHandle, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised by the threaded pipeline handle and capture streams
///
/// Error code range: 4001-4006
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Configuration rejected before the processing thread was spawned
    InvalidConfig(ConfigError),

    /// The processing thread has already been stopped
    NotRunning,

    /// No free input buffer; the processing thread is not keeping up
    InputBackpressure { dropped_samples: usize },

    /// The runtime command queue is full
    CommandQueueFull,

    /// The processing thread panicked before it could be joined
    ThreadPanicked,

    /// Failed to open or start an audio capture stream
    StreamOpenFailed { reason: String },
}

impl ErrorCode for PipelineError {
    fn code(&self) -> i32 {
        match self {
            PipelineError::InvalidConfig(_) => 4001,
            PipelineError::NotRunning => 4002,
            PipelineError::InputBackpressure { .. } => 4003,
            PipelineError::CommandQueueFull => 4004,
            PipelineError::ThreadPanicked => 4005,
            PipelineError::StreamOpenFailed { .. } => 4006,
        }
    }

    fn message(&self) -> String {
        match self {
            PipelineError::InvalidConfig(inner) => {
                format!("Invalid configuration: {}", inner.message())
            }
            PipelineError::NotRunning => {
                "Pipeline not running. Spawn a new handle first.".to_string()
            }
            PipelineError::InputBackpressure { dropped_samples } => format!(
                "Input queue exhausted, dropped {} samples",
                dropped_samples
            ),
            PipelineError::CommandQueueFull => "Command queue full".to_string(),
            PipelineError::ThreadPanicked => "Processing thread panicked".to_string(),
            PipelineError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PipelineError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::InvalidConfig(inner) => Some(inner),
            _ => None,
        }
    }
}

impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        PipelineError::InvalidConfig(err)
    }
}
