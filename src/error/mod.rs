// Error types for the voice front end
//
// Configuration errors are raised at construction time and never reach the
// steady-state audio callback. Pipeline errors cover the threaded handle
// (channels, lifecycle, capture streams).

mod config;
mod pipeline;

pub use config::{log_config_error, ConfigError};
pub use pipeline::{log_pipeline_error, PipelineError};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, so that an embedding application can forward
/// them to its own logging or telemetry.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
