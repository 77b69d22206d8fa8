// Audio module - lock-free PCM transport and optional live capture

pub mod buffer_pool;
#[cfg(feature = "capture")]
pub mod capture;

// Re-export commonly used types for convenience
pub use buffer_pool::{AudioBuffer, BufferPool, BufferPoolChannels, SampleReceiver, SampleSender};
#[cfg(feature = "capture")]
pub use capture::{default_input_sample_rate, CaptureStream};
