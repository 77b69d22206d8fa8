// Temporal module - Time-domain feature extraction
//
// This module computes features directly from windowed time-domain frames:
// mean energy and zero-crossing rate.
//
// References:
// - Peeters, G. (2004). A large set of audio features for sound description
// - Lerch, A. (2012). An Introduction to Audio Content Analysis

/// Compute mean frame energy
///
/// Formula: E = (1 / N) × Σ x[n]²
///
/// # Returns
/// Mean squared sample value (0.0 for an empty frame)
pub fn compute_energy(audio: &[f32]) -> f32 {
    if audio.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = audio.iter().map(|&x| (x as f64) * (x as f64)).sum();
    (sum_squares / audio.len() as f64) as f32
}

/// Compute zero-crossing rate (ZCR)
///
/// ZCR measures how often the signal changes sign. A sample of exactly zero
/// counts as non-negative, so an all-zero frame has no crossings.
///
/// # Returns
/// Crossings divided by the frame length (0.0 to just under 1.0)
pub fn compute_zcr(audio: &[f32]) -> f32 {
    if audio.len() < 2 {
        return 0.0;
    }

    let crossings = audio
        .windows(2)
        .filter(|pair| (pair[0] < 0.0) != (pair[1] < 0.0))
        .count();

    crossings as f32 / audio.len() as f32
}
