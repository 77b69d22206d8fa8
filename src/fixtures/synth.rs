//! Deterministic synthetic signals for tests and the `synth` CLI command.
//!
//! Noise is uniform in `[-amplitude, amplitude]` from a seeded `StdRng`, so the
//! same seed always reproduces the same samples.

use std::f32::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn white_noise(amplitude: f32, len: usize, seed: u64) -> Vec<f32> {
    let amplitude = amplitude.abs();
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len)
        .map(|_| rng.gen_range(-amplitude..=amplitude))
        .collect()
}

pub fn sine(frequency_hz: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
    let step = 2.0 * PI * frequency_hz / sample_rate as f32;
    (0..len)
        .map(|i| amplitude * (step * i as f32).sin())
        .collect()
}

/// White noise with a tone mixed in over the whole length
pub fn noise_plus_tone(
    noise_amplitude: f32,
    tone_hz: f32,
    tone_amplitude: f32,
    sample_rate: u32,
    len: usize,
    seed: u64,
) -> Vec<f32> {
    tone_after_noise(
        noise_amplitude,
        tone_hz,
        tone_amplitude,
        sample_rate,
        len,
        0,
        seed,
    )
}

/// White noise throughout, with a tone starting at sample `onset`
///
/// The noise is identical to `white_noise(noise_amplitude, len, seed)`.
pub fn tone_after_noise(
    noise_amplitude: f32,
    tone_hz: f32,
    tone_amplitude: f32,
    sample_rate: u32,
    len: usize,
    onset: usize,
    seed: u64,
) -> Vec<f32> {
    let mut signal = white_noise(noise_amplitude, len, seed);
    let onset = onset.min(len);
    let tone = sine(tone_hz, tone_amplitude, sample_rate, len - onset);
    for (sample, t) in signal[onset..].iter_mut().zip(tone) {
        *sample += t;
    }
    signal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_white_noise_is_seeded_and_bounded() {
        let a = white_noise(0.2, 512, 42);
        let b = white_noise(0.2, 512, 42);
        let c = white_noise(0.2, 512, 43);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().all(|s| s.abs() <= 0.2));
    }

    #[test]
    fn test_sine_period() {
        // 1 kHz at 16 kHz repeats every 16 samples
        let tone = sine(1000.0, 1.0, 16000, 64);
        assert!(tone[0].abs() < 1e-6);
        assert!((tone[4] - 1.0).abs() < 1e-5);
        assert!((tone[16] - tone[0]).abs() < 1e-4);
    }

    #[test]
    fn test_tone_after_noise_keeps_noise_prefix() {
        let noise = white_noise(0.05, 256, 9);
        let mixed = tone_after_noise(0.05, 500.0, 0.5, 16000, 256, 100, 9);
        assert_eq!(&mixed[..100], &noise[..100]);
        assert_ne!(&mixed[101..], &noise[101..]);
    }
}
