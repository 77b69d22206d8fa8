// Analysis module - streaming noise-suppression and voice-activity pipeline
//
// This module wires the per-frame DSP stages into a single-threaded processor
// that the processing thread (or an offline fixture) drives one audio batch at
// a time.
//
// Architecture:
// - FrameBuffer: sliding frames of `frame_size` advancing by `hop_size`
// - Per frame: window → forward FFT → learn noise | (VAD, subtract, inverse FFT)
// - OverlapAdd: exactly `hop_size` cleaned samples per completed frame
// - Events: NoiseProfileReady once, VoiceActive per speech frame
//
// Frame lifecycle:
// - Learning frames feed the noise estimator only; their audio follows the
//   configured LearningPolicy and they never reach VAD or MFCC
// - Frames holding a non-finite sample are dropped and emitted as silence
// - All other frames are suppressed and classified

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::{LearningPolicy, PipelineConfig, ThresholdPatch};
use crate::error::ConfigError;
use crate::telemetry;

pub mod features;
pub mod framing;
pub mod mfcc;
pub mod noise_profile;
pub mod spectrum;
pub mod suppressor;
pub mod vad;

use framing::{FrameBuffer, PushOutcome, WindowFunction};
use mfcc::MelCepstrum;
use noise_profile::{NoiseProfile, NoiseProfileEstimator};
use spectrum::{SpectralAnalyzer, SpectralFrame};
use suppressor::{OverlapAdd, SpectralSubtractor};
use vad::{VoiceActivityDecision, VoiceActivityGate};

/// A voice-active frame handed to downstream consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceFrame {
    pub frame_index: u64,
    pub decision: VoiceActivityDecision,
    /// Cleaned time-domain frame (`frame_size` samples, before synthesis windowing)
    pub samples: Vec<f32>,
    /// Mel-cepstral coefficients when the mel stage is enabled
    pub cepstrum: Option<Vec<f32>>,
}

/// Asynchronous notifications produced while processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Emitted once per session, on the last learning frame
    NoiseProfileReady {
        frame_index: u64,
        profile: NoiseProfile,
    },
    VoiceActive(VoiceFrame),
    /// Non-speech decision, only when `report_decisions` is set
    FrameClassified {
        frame_index: u64,
        decision: VoiceActivityDecision,
    },
    FrameDropped {
        frame_index: u64,
        malformed_samples: u64,
    },
}

impl PipelineEvent {
    pub fn frame_index(&self) -> u64 {
        match self {
            Self::NoiseProfileReady { frame_index, .. }
            | Self::FrameClassified { frame_index, .. }
            | Self::FrameDropped { frame_index, .. } => *frame_index,
            Self::VoiceActive(frame) => frame.frame_index,
        }
    }
}

/// Diagnostic counters for one pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub frames_processed: u64,
    pub frames_dropped: u64,
    pub malformed_samples: u64,
    pub voice_frames: u64,
    pub learning_frames: u64,
}

/// Streaming processor owning every per-session buffer
pub struct Pipeline {
    config: PipelineConfig,
    frames: FrameBuffer,
    window: WindowFunction,
    analyzer: SpectralAnalyzer,
    estimator: NoiseProfileEstimator,
    subtractor: SpectralSubtractor,
    gate: VoiceActivityGate,
    mel: Option<MelCepstrum>,
    synthesis: OverlapAdd,

    // Scratch buffers reused by every frame
    windowed: Vec<f32>,
    spectrum: SpectralFrame,
    magnitudes: Vec<f32>,
    phases: Vec<f32>,
    cleaned: Vec<f32>,
    resynthesized: Vec<f32>,
    cepstrum: Vec<f32>,

    frame_index: u64,
    stats: PipelineStats,
}

impl Pipeline {
    /// Build a pipeline, validating the whole configuration up front
    ///
    /// # Errors
    /// The first configuration rule the config violates.
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let frame_size = config.frame_size;
        let frames = FrameBuffer::new(frame_size, config.hop_size)?;
        let window = WindowFunction::new(config.window, frame_size);
        let synthesis = OverlapAdd::new(&window, config.hop_size, config.synthesis_window);

        let mel = if config.mel.enabled {
            Some(MelCepstrum::new(
                config.mel.bands,
                config.mel.coefficients,
                frame_size,
                config.sample_rate,
                config.mel.low_hz,
                config.mel_high_hz(),
            )?)
        } else {
            None
        };

        tracing::info!(
            "[Pipeline] Initialized: frame={} hop={} rate={}Hz window={:?} learning_frames={}",
            frame_size,
            config.hop_size,
            config.sample_rate,
            config.window,
            config.max_learning_frames
        );

        Ok(Self {
            frames,
            analyzer: SpectralAnalyzer::new(frame_size),
            estimator: NoiseProfileEstimator::new(frame_size, config.max_learning_frames),
            subtractor: SpectralSubtractor::new(
                config.suppression.alpha,
                config.suppression.beta,
            ),
            gate: VoiceActivityGate::new(config.vad, config.sample_rate, frame_size),
            mel,
            synthesis,
            window,
            windowed: Vec::with_capacity(frame_size),
            spectrum: SpectralFrame::zeros(frame_size),
            magnitudes: Vec::with_capacity(frame_size),
            phases: Vec::with_capacity(frame_size),
            cleaned: Vec::with_capacity(frame_size),
            resynthesized: Vec::with_capacity(frame_size),
            cepstrum: Vec::new(),
            frame_index: 0,
            stats: PipelineStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn is_learning(&self) -> bool {
        self.estimator.is_learning()
    }

    pub fn noise_profile(&self) -> Option<&NoiseProfile> {
        self.estimator.profile()
    }

    /// Samples of input consumed before the first output sample is emitted
    pub fn latency_samples(&self) -> usize {
        self.frames.overlap()
    }

    /// Process one batch of any length
    ///
    /// Cleaned audio is appended to `output` (`hop_size` samples per completed
    /// frame) and notifications to `events`. Never fails: malformed samples
    /// are counted and their frames dropped.
    pub fn process(
        &mut self,
        input: &[f32],
        output: &mut Vec<f32>,
        events: &mut Vec<PipelineEvent>,
    ) {
        for &sample in input {
            if self.frames.push(sample) == PushOutcome::FrameReady {
                let started = Instant::now();
                self.process_frame(output, events);
                self.frames.advance();
                telemetry::hub().record_processing_time(started.elapsed().as_secs_f32() * 1e6);
            }
        }
    }

    fn process_frame(&mut self, output: &mut Vec<f32>, events: &mut Vec<PipelineEvent>) {
        let frame_index = self.frame_index;
        self.frame_index += 1;
        self.stats.frames_processed += 1;

        if self.frames.is_corrupt() {
            let malformed = self.frames.malformed_samples() - self.stats.malformed_samples;
            self.stats.malformed_samples = self.frames.malformed_samples();
            self.stats.frames_dropped += 1;
            self.synthesis.push_silence(output);

            tracing::debug!(
                "[Pipeline] Dropped frame {} ({} malformed samples)",
                frame_index,
                malformed
            );
            telemetry::hub().record_frame_dropped(frame_index, malformed);
            events.push(PipelineEvent::FrameDropped {
                frame_index,
                malformed_samples: malformed,
            });
            return;
        }

        self.window.apply(self.frames.frame(), &mut self.windowed);
        self.analyzer.forward(&self.windowed, &mut self.spectrum);
        self.spectrum.magnitudes_into(&mut self.magnitudes);

        if self.estimator.is_learning() {
            self.stats.learning_frames += 1;
            if let Some(profile) = self.estimator.observe(&self.magnitudes) {
                telemetry::hub().record_noise_profile(profile.frames(), profile.mean_magnitude());
                events.push(PipelineEvent::NoiseProfileReady {
                    frame_index,
                    profile: profile.clone(),
                });
            }

            match self.config.learning_policy {
                LearningPolicy::Passthrough => {
                    self.synthesis.push_frame(&self.windowed, output)
                }
                LearningPolicy::Mute => self.synthesis.push_silence(output),
            }
            return;
        }

        // VAD sees the frame as captured; MFCC sees the cleaned spectrum
        let decision = self.gate.classify(&self.windowed, &self.magnitudes);

        self.spectrum.phases_into(&mut self.phases);
        self.subtractor
            .apply(&self.magnitudes, self.estimator.profile(), &mut self.cleaned);
        self.spectrum.set_polar(&self.cleaned, &self.phases);
        self.analyzer
            .inverse(&self.spectrum, &mut self.resynthesized);
        self.synthesis.push_frame(&self.resynthesized, output);

        if decision.is_speech {
            self.stats.voice_frames += 1;

            let cepstrum = match self.mel.as_mut() {
                Some(mel) => {
                    mel.compute(&self.cleaned, &mut self.cepstrum);
                    Some(self.cepstrum.clone())
                }
                None => None,
            };

            let features = decision.features;
            telemetry::hub().record_voice_activity(
                frame_index,
                features.energy,
                features.zcr,
                features.centroid_hz,
            );
            events.push(PipelineEvent::VoiceActive(VoiceFrame {
                frame_index,
                decision,
                samples: self.resynthesized.clone(),
                cepstrum,
            }));
        } else if self.config.report_decisions {
            events.push(PipelineEvent::FrameClassified {
                frame_index,
                decision,
            });
        }
    }

    /// Update thresholds and suppression strength
    ///
    /// The patch is validated as a whole; on error nothing changes.
    pub fn apply_patch(&mut self, patch: &ThresholdPatch) -> Result<(), ConfigError> {
        self.config.apply_patch(patch)?;
        self.gate.set_thresholds(self.config.vad);
        self.subtractor.set_alpha(self.config.suppression.alpha);
        self.subtractor.set_beta(self.config.suppression.beta);

        tracing::info!("[Pipeline] Applied threshold patch: {:?}", patch);
        Ok(())
    }

    /// Return to Learning with empty frame and synthesis buffers
    ///
    /// Frame indices and counters keep running across resets.
    pub fn reset(&mut self) {
        self.frames.reset();
        self.estimator.reset();
        self.synthesis.reset();
        tracing::info!("[Pipeline] Reset at frame {}", self.frame_index);
    }

    /// Tear down the session, releasing every retained buffer
    pub fn dispose(self) -> PipelineStats {
        tracing::info!(
            "[Pipeline] Disposed after {} frames ({} voice, {} dropped)",
            self.stats.frames_processed,
            self.stats.voice_frames,
            self.stats.frames_dropped
        );
        self.stats
    }
}
