//! Offline processing utilities for the CLI and integration tests.
//!
//! This module decodes WAV input, runs the streaming pipeline over it in
//! audio-quantum sized batches, and writes the cleaned signal back out. It is
//! desktop-focused and uses `anyhow` at its file-handling boundary.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::{Pipeline, PipelineEvent, PipelineStats};
use crate::config::PipelineConfig;
use crate::error::ConfigError;
use crate::telemetry::{self, DiagnosticError};

pub mod synth;

/// Batch size used when replaying recorded audio, matching one capture quantum.
pub const OFFLINE_BATCH: usize = 128;

/// Result of running a whole signal through a fresh pipeline
#[derive(Debug, Clone)]
pub struct OfflineRun {
    /// Cleaned audio aligned with the input and truncated to its length
    pub cleaned: Vec<f32>,
    pub events: Vec<PipelineEvent>,
    pub stats: PipelineStats,
}

/// Summary written by `process_wav`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingReport {
    pub input: String,
    pub output: String,
    pub sample_rate: u32,
    pub samples: usize,
    pub duration_seconds: f32,
    /// Frame on which the noise profile froze, if the input was long enough
    pub noise_profile_frame: Option<u64>,
    pub voice_frames: Vec<u64>,
    pub stats: PipelineStats,
}

/// Run `samples` through a new pipeline and flush the synthesis tail
///
/// The signal is followed by one frame of silence so every input sample
/// leaves the overlap-add buffer; the output is then cut back to the input
/// length, which removes the pipeline latency.
pub fn run_pipeline(config: &PipelineConfig, samples: &[f32]) -> Result<OfflineRun, ConfigError> {
    let mut pipeline = Pipeline::new(config.clone())?;
    let latency = pipeline.latency_samples();

    let mut cleaned = Vec::with_capacity(samples.len() + config.frame_size);
    let mut events = Vec::new();
    for batch in samples.chunks(OFFLINE_BATCH) {
        pipeline.process(batch, &mut cleaned, &mut events);
    }
    let tail = vec![0.0; config.frame_size];
    pipeline.process(&tail, &mut cleaned, &mut events);
    cleaned.truncate(samples.len());

    tracing::debug!(
        "[Fixtures] Processed {} samples with {} samples of latency",
        samples.len(),
        latency
    );

    Ok(OfflineRun {
        cleaned,
        events,
        stats: pipeline.dispose(),
    })
}

/// Decode, suppress and re-encode one WAV file
///
/// The pipeline runs at the file's sample rate regardless of `config`.
pub fn process_wav(
    input: &Path,
    output: &Path,
    config: &PipelineConfig,
) -> Result<ProcessingReport> {
    let (samples, sample_rate) = load_wav(input)?;
    let config = config.with_sample_rate(sample_rate);

    let run = run_pipeline(&config, &samples)
        .with_context(|| format!("configuring pipeline for {}", input.display()))?;
    write_wav(output, &run.cleaned, sample_rate)?;

    let noise_profile_frame = run.events.iter().find_map(|event| match event {
        PipelineEvent::NoiseProfileReady { frame_index, .. } => Some(*frame_index),
        _ => None,
    });
    let voice_frames = run
        .events
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::VoiceActive(frame) => Some(frame.frame_index),
            _ => None,
        })
        .collect();

    Ok(ProcessingReport {
        input: input.display().to_string(),
        output: output.display().to_string(),
        sample_rate,
        samples: samples.len(),
        duration_seconds: samples.len() as f32 / sample_rate as f32,
        noise_profile_frame,
        voice_frames,
        stats: run.stats,
    })
}

/// Read a WAV file as f32 samples; multi-channel files yield their first channel
pub fn load_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    decode_wav(path).map_err(|err| {
        telemetry::hub().record_error(DiagnosticError::FixtureLoad, format!("{err:#}"));
        err
    })
}

fn decode_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(|err| anyhow!(err)))
            .collect::<Result<Vec<f32>>>()?,
        hound::SampleFormat::Int => {
            let max = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f32;
            match spec.bits_per_sample {
                16 => reader
                    .samples::<i16>()
                    .map(|sample| {
                        sample
                            .map(|value| value as f32 / max)
                            .map_err(|err| anyhow!(err))
                    })
                    .collect::<Result<Vec<f32>>>()?,
                24 | 32 => reader
                    .samples::<i32>()
                    .map(|sample| {
                        sample
                            .map(|value| value as f32 / max)
                            .map_err(|err| anyhow!(err))
                    })
                    .collect::<Result<Vec<f32>>>()?,
                other => {
                    return Err(anyhow!(
                        "Unsupported bits per sample {} in {}",
                        other,
                        path.display()
                    ))
                }
            }
        }
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved.into_iter().step_by(channels).collect()
    };

    Ok((samples, spec.sample_rate))
}

/// Write mono 32-bit float PCM
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer =
        hound::WavWriter::create(path, spec).with_context(|| format!("creating {}", path.display()))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    writer
        .finalize()
        .with_context(|| format!("finalizing {}", path.display()))?;
    Ok(())
}
