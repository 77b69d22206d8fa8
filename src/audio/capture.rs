// Live microphone capture
//
// Opens the default input device and forwards each callback's samples (first
// channel only) into the inbound buffer pool. The callback never blocks and
// never logs; samples that do not fit the pool are counted and dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::buffer_pool::SampleSender;
use crate::error::PipelineError;

/// Largest callback (in frames) de-interleaved without reallocating
const SCRATCH_FRAMES: usize = 4096;

fn stream_error(reason: impl Into<String>) -> PipelineError {
    PipelineError::StreamOpenFailed {
        reason: reason.into(),
    }
}

fn default_input() -> Result<(cpal::Device, cpal::SupportedStreamConfig), PipelineError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| stream_error("No default input device found"))?;
    let config = device
        .default_input_config()
        .map_err(|e| stream_error(format!("Failed to get default input config: {:?}", e)))?;
    Ok((device, config))
}

/// Sample rate the default input device runs at
pub fn default_input_sample_rate() -> Result<u32, PipelineError> {
    default_input().map(|(_, config)| config.sample_rate().0)
}

/// A running input stream; capture stops when this is dropped
pub struct CaptureStream {
    _stream: cpal::Stream,
    sample_rate: u32,
    dropped_samples: Arc<AtomicU64>,
}

impl CaptureStream {
    /// Start capturing from the default input device into `sender`
    pub fn start(mut sender: SampleSender) -> Result<Self, PipelineError> {
        let (device, config) = default_input()?;
        if config.sample_format() != cpal::SampleFormat::F32 {
            return Err(stream_error(
                "Only F32 sample format is currently supported for input",
            ));
        }

        let stream_config: cpal::StreamConfig = config.clone().into();
        let channels_count = stream_config.channels.max(1) as usize;
        let dropped_samples = Arc::new(AtomicU64::new(0));
        let dropped = Arc::clone(&dropped_samples);
        let mut scratch: Vec<f32> = Vec::with_capacity(SCRATCH_FRAMES);

        let err_fn = |err| tracing::error!("[Capture] Input stream error: {}", err);

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mono: &[f32] = if channels_count == 1 {
                        data
                    } else {
                        scratch.clear();
                        scratch.extend(data.chunks(channels_count).map(|frame| frame[0]));
                        &scratch
                    };
                    if let Err(lost) = sender.send(mono) {
                        dropped.fetch_add(lost as u64, Ordering::Relaxed);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| stream_error(format!("{:?}", e)))?;

        stream
            .play()
            .map_err(|e| stream_error(format!("Failed to start input stream: {:?}", e)))?;

        tracing::info!(
            "[Capture] Input stream started: {} Hz, {} channel(s)",
            stream_config.sample_rate.0,
            stream_config.channels
        );

        Ok(Self {
            _stream: stream,
            sample_rate: stream_config.sample_rate.0,
            dropped_samples,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples discarded because the buffer pool was exhausted
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples.load(Ordering::Relaxed)
    }
}
