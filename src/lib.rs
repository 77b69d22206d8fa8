// Voice Front End Core - streaming noise suppression and voice-activity gating
// Real-time DSP pipeline with lock-free transport to a processing thread

// Module declarations
pub mod analysis;
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod fixtures;
pub mod telemetry;

// Re-exports for convenience
pub use analysis::{Pipeline, PipelineEvent, PipelineStats, VoiceFrame};
pub use config::{AppConfig, PipelineConfig, ThresholdPatch};
pub use engine::PipelineHandle;
pub use error::{ConfigError, ErrorCode, PipelineError};
