//! Threaded pipeline handle: input transport, events, commands and teardown.

use std::time::{Duration, Instant};

use futures::StreamExt;
use voice_frontend::config::{EngineConfig, MelConfig};
use voice_frontend::fixtures::synth;
use voice_frontend::{AppConfig, PipelineConfig, PipelineError, PipelineEvent, PipelineHandle, ThresholdPatch};

const RATE: u32 = 16_000;

fn config(max_learning_frames: usize) -> AppConfig {
    AppConfig {
        pipeline: PipelineConfig {
            max_learning_frames,
            mel: MelConfig {
                coefficients: 12,
                ..MelConfig::default()
            },
            ..PipelineConfig::default()
        },
        engine: EngineConfig {
            buffer_pool_size: 256,
            ..EngineConfig::default()
        },
    }
}

/// Push in capture-sized quanta; the pool holds more than any test feeds
fn feed(handle: &mut PipelineHandle, samples: &[f32]) {
    for quantum in samples.chunks(128) {
        if let Err(err) = handle.push_samples(quantum) {
            panic!("push failed: {}", err);
        }
    }
}

fn drain_output(handle: &mut PipelineHandle, expected: usize) -> Vec<f32> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut cleaned = Vec::new();
    while cleaned.len() < expected && Instant::now() < deadline {
        if handle.pop_output(&mut cleaned) == 0 {
            std::thread::sleep(Duration::from_millis(2));
        }
    }
    cleaned
}

/// Learning noise followed by a tone
fn noisy_tone(frames: usize, onset_frame: usize) -> Vec<f32> {
    let len = (frames - 1) * 512 + 1024;
    synth::tone_after_noise(0.02, 1000.0, 0.5, RATE, len, onset_frame * 512, 17)
}

#[test]
fn test_cleaned_audio_arrives_in_order() {
    let mut handle = PipelineHandle::spawn(config(1000)).unwrap();
    let input = synth::sine(440.0, 0.3, RATE, 16 * 512 + 512);
    feed(&mut handle, &input);

    // Output trails input by frame - hop samples
    let expected = input.len() - 512;
    let cleaned = drain_output(&mut handle, expected);
    assert_eq!(cleaned.len(), expected);

    // Still learning with passthrough: steady-state output equals input
    for t in 512..expected {
        assert!((cleaned[t] - input[t]).abs() < 1e-4, "sample {}", t);
    }

    let stats = handle.stop().unwrap();
    assert_eq!(stats.frames_processed, 16);
}

#[tokio::test]
async fn test_event_stream_delivers_profile_and_voice_frames() {
    let mut handle = PipelineHandle::spawn(config(5)).unwrap();
    let mut events = Box::pin(handle.event_stream());

    feed(&mut handle, &noisy_tone(16, 6));

    let first = tokio::time::timeout(Duration::from_secs(5), events.next())
        .await
        .expect("event within timeout")
        .expect("stream open");
    match first {
        PipelineEvent::NoiseProfileReady { frame_index, profile } => {
            assert_eq!(frame_index, 4);
            assert_eq!(profile.frames(), 5);
        }
        other => panic!("expected the profile first, got {:?}", other),
    }

    let voice = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(event) = events.next().await {
            if let PipelineEvent::VoiceActive(frame) = event {
                return Some(frame);
            }
        }
        None
    })
    .await
    .expect("voice frame within timeout")
    .expect("stream open");

    assert!(voice.frame_index >= 5);
    assert_eq!(voice.cepstrum.map(|c| c.len()), Some(12));

    let stats = handle.stop().unwrap();
    assert!(stats.voice_frames >= 1);
}

#[test]
fn test_threshold_patch_reaches_processing_thread() {
    let mut handle = PipelineHandle::spawn(config(5)).unwrap();
    let mut events = handle.subscribe();

    handle
        .update_thresholds(ThresholdPatch {
            energy_threshold: Some(10.0),
            ..ThresholdPatch::default()
        })
        .unwrap();
    assert_eq!(handle.config().vad.energy_threshold, 10.0);

    feed(&mut handle, &noisy_tone(16, 6));
    let stats = handle.stop().unwrap();
    assert_eq!(stats.frames_processed, 16);
    assert_eq!(stats.voice_frames, 0, "energy threshold 10 admits nothing");

    let mut saw_profile = false;
    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, PipelineEvent::VoiceActive(_)));
        saw_profile |= matches!(event, PipelineEvent::NoiseProfileReady { .. });
    }
    assert!(saw_profile);
}

#[test]
fn test_invalid_patch_is_reported_to_caller() {
    let mut handle = PipelineHandle::spawn(config(5)).unwrap();
    let err = handle
        .update_thresholds(ThresholdPatch {
            centroid_low_hz: Some(5000.0),
            ..ThresholdPatch::default()
        })
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidConfig(_)));
    assert_eq!(handle.config().vad.centroid_low_hz, 300.0);
    handle.stop().unwrap();
}

#[test]
fn test_exhausted_pool_reports_backpressure() {
    let mut config = config(5);
    config.engine = EngineConfig {
        buffer_pool_size: 2,
        buffer_size: 32,
        ..EngineConfig::default()
    };
    let mut handle = PipelineHandle::spawn(config).unwrap();

    // Thousands of buffers' worth in one call outruns a two-buffer pool
    match handle.push_samples(&vec![0.0; 200_000]) {
        Err(PipelineError::InputBackpressure { dropped_samples }) => {
            assert!(dropped_samples > 0 && dropped_samples <= 200_000);
        }
        other => panic!("expected backpressure, got {:?}", other),
    }
    handle.stop().unwrap();
}

#[test]
fn test_stop_joins_and_reports_stats() {
    let mut handle = PipelineHandle::spawn(config(2)).unwrap();
    assert!(handle.is_running());
    feed(&mut handle, &[0.0; 2048]);

    let stats = handle.stop().unwrap();
    assert_eq!(stats.frames_processed, 3);
    assert_eq!(stats.learning_frames, 2);
    assert_eq!(stats.frames_dropped, 0);
}
