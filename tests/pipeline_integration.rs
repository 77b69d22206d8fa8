//! End-to-end pipeline scenarios on synthetic signals.

use voice_frontend::analysis::framing::{WindowFunction, WindowKind};
use voice_frontend::analysis::spectrum::{direct_dft, SpectralAnalyzer, SpectralFrame};
use voice_frontend::config::LearningPolicy;
use voice_frontend::fixtures::{self, synth};
use voice_frontend::{Pipeline, PipelineConfig, PipelineEvent};

const RATE: u32 = 16_000;
const FRAME: usize = 1024;
const HOP: usize = 512;
const LEARNING_FRAMES: usize = 50;
/// 1 kHz falls exactly on bin 64 at 16 kHz / 1024
const TONE_HZ: f32 = 1000.0;
const TONE_BIN: usize = 64;
const NOISE_AMPLITUDE: f32 = 0.05;
const SEED: u64 = 2024;

/// First frame whose samples are all tone + noise
const FIRST_TONE_FRAME: usize = LEARNING_FRAMES + 1;
const TOTAL_FRAMES: usize = LEARNING_FRAMES + 10;

fn frame_start(index: usize) -> usize {
    index * HOP
}

fn windowed_magnitudes(samples: &[f32]) -> Vec<f32> {
    let window = WindowFunction::new(WindowKind::Hann, FRAME);
    let mut analyzer = SpectralAnalyzer::new(FRAME);
    let mut windowed = Vec::new();
    let mut spectrum = SpectralFrame::zeros(FRAME);
    window.apply(samples, &mut windowed);
    analyzer.forward(&windowed, &mut spectrum);
    spectrum.magnitudes()
}

struct Scenario {
    noise: Vec<f32>,
    input: Vec<f32>,
    events: Vec<PipelineEvent>,
}

/// 50 frames of white noise, then 10 frames with a 1 kHz tone added
fn noise_then_tone() -> Scenario {
    let len = frame_start(TOTAL_FRAMES - 1) + FRAME;
    let onset = frame_start(FIRST_TONE_FRAME);
    let noise = synth::white_noise(NOISE_AMPLITUDE, len, SEED);
    let input = synth::tone_after_noise(NOISE_AMPLITUDE, TONE_HZ, 0.5, RATE, len, onset, SEED);

    let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
    let mut output = Vec::new();
    let mut events = Vec::new();
    for quantum in input.chunks(128) {
        pipeline.process(quantum, &mut output, &mut events);
    }
    assert_eq!(pipeline.stats().frames_processed, TOTAL_FRAMES as u64);

    Scenario {
        noise,
        input,
        events,
    }
}

#[test]
fn test_profile_ready_fires_exactly_once_after_learning() {
    let scenario = noise_then_tone();

    let ready: Vec<_> = scenario
        .events
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::NoiseProfileReady {
                frame_index,
                profile,
            } => Some((*frame_index, profile)),
            _ => None,
        })
        .collect();

    assert_eq!(ready.len(), 1, "profile-ready must fire exactly once");
    let (frame_index, profile) = ready[0];
    assert_eq!(frame_index, (LEARNING_FRAMES - 1) as u64);
    assert_eq!(profile.frames(), LEARNING_FRAMES);
    assert_eq!(profile.len(), FRAME);

    // No learning frame is ever classified
    assert!(scenario
        .events
        .iter()
        .filter(|event| matches!(event, PipelineEvent::VoiceActive(_)))
        .all(|event| event.frame_index() >= LEARNING_FRAMES as u64));
}

#[test]
fn test_tone_is_preserved_while_noise_is_attenuated() {
    let scenario = noise_then_tone();
    let profile = scenario
        .events
        .iter()
        .find_map(|event| match event {
            PipelineEvent::NoiseProfileReady { profile, .. } => Some(profile.clone()),
            _ => None,
        })
        .expect("profile ready");
    let alpha = PipelineConfig::default().suppression.alpha;

    let voiced: Vec<_> = scenario
        .events
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::VoiceActive(frame) => Some(frame),
            _ => None,
        })
        .filter(|frame| frame.frame_index as usize >= FIRST_TONE_FRAME)
        .collect();
    assert_eq!(
        voiced.len(),
        TOTAL_FRAMES - FIRST_TONE_FRAME,
        "every full tone frame should be voice-active"
    );

    for frame in voiced {
        let index = frame.frame_index as usize;
        let range = frame_start(index)..frame_start(index) + FRAME;

        let noisy = windowed_magnitudes(&scenario.input[range.clone()]);
        let noise_only = windowed_magnitudes(&scenario.noise[range.clone()]);
        let tone_only: Vec<f32> = scenario.input[range.clone()]
            .iter()
            .zip(&scenario.noise[range])
            .map(|(x, n)| x - n)
            .collect();
        let tone_ref = windowed_magnitudes(&tone_only)[TONE_BIN];
        let cleaned = direct_dft(&frame.samples).magnitudes();

        // Subtraction removes alpha times the learned mean at every bin; beyond
        // that the tone may only lose what the injected noise cancelled
        let loss = tone_ref - cleaned[TONE_BIN];
        let allowance = noise_only[TONE_BIN] + alpha * profile.magnitudes()[TONE_BIN];
        println!(
            "frame {}: tone_ref={:.3} cleaned={:.3} loss={:.3} allowance={:.3}",
            index, tone_ref, cleaned[TONE_BIN], loss, allowance
        );
        assert!(
            loss <= allowance + 1e-2,
            "frame {}: tone lost {:.3}, more than the noise allowance {:.3}",
            index,
            loss,
            allowance
        );
        assert!(
            cleaned[TONE_BIN] >= 0.95 * tone_ref,
            "frame {}: tone bin {:.3} vs reference {:.3}",
            index,
            cleaned[TONE_BIN],
            tone_ref
        );

        let band = 200..500;
        let mean = |mags: &[f32]| mags[band.clone()].iter().sum::<f32>() / band.len() as f32;
        let (noisy_mean, cleaned_mean) = (mean(&noisy), mean(&cleaned));
        assert!(
            cleaned_mean < 0.5 * noisy_mean,
            "frame {}: noise band {:.4} not attenuated from {:.4}",
            index,
            cleaned_mean,
            noisy_mean
        );
    }
}

#[test]
fn test_mute_policy_silences_learning_output() {
    let config = PipelineConfig {
        learning_policy: LearningPolicy::Mute,
        ..PipelineConfig::default()
    };
    let len = frame_start(TOTAL_FRAMES - 1) + FRAME;
    let input = synth::noise_plus_tone(NOISE_AMPLITUDE, TONE_HZ, 0.5, RATE, len, SEED);
    let run = fixtures::run_pipeline(&config, &input).unwrap();

    // Learning frames emit samples [0, 50 * hop)
    let learning_end = LEARNING_FRAMES * HOP;
    assert!(run.cleaned[..learning_end].iter().all(|&s| s == 0.0));
    let energy: f32 = run.cleaned[learning_end..].iter().map(|s| s * s).sum();
    assert!(energy > 0.0, "suppressed frames must produce audio");
    assert_eq!(run.stats.learning_frames, LEARNING_FRAMES as u64);
}

#[test]
fn test_passthrough_policy_keeps_learning_audio() {
    let len = LEARNING_FRAMES * HOP;
    let input = synth::white_noise(NOISE_AMPLITUDE, len, SEED);
    let run = fixtures::run_pipeline(&PipelineConfig::default(), &input).unwrap();

    for t in HOP..len {
        assert!(
            (run.cleaned[t] - input[t]).abs() < 1e-4,
            "sample {} changed during learning",
            t
        );
    }
}

#[test]
fn test_malformed_burst_is_dropped_not_propagated() {
    let len = frame_start(TOTAL_FRAMES - 1) + FRAME;
    let mut input = synth::noise_plus_tone(NOISE_AMPLITUDE, TONE_HZ, 0.5, RATE, len, SEED);
    for sample in &mut input[20_000..20_004] {
        *sample = f32::INFINITY;
    }
    input[30_000] = f32::NAN;

    let run = fixtures::run_pipeline(&PipelineConfig::default(), &input).unwrap();
    assert_eq!(run.stats.malformed_samples, 5);
    assert_eq!(run.stats.frames_dropped, 2);
    assert!(run.cleaned.iter().all(|s| s.is_finite()));

    let dropped: Vec<u64> = run
        .events
        .iter()
        .filter_map(|event| match event {
            PipelineEvent::FrameDropped { frame_index, .. } => Some(*frame_index),
            _ => None,
        })
        .collect();
    assert_eq!(dropped.len(), 2);
}
