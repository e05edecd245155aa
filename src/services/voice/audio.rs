//! Fallback audio.
//!
//! When synthesis fails the device still expects a PCM payload, so a short
//! two-tone chime proportional to the answer length is generated instead.

// Sample counts stay far below f64's exact integer range and the scaled
// sample is clamped to the i16 range before conversion.
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use std::f64::consts::PI;

/// Output sample rate in Hz.
pub const SAMPLE_RATE: u32 = 16_000;

/// Seconds of tone per character of text.
const SECONDS_PER_CHAR: f64 = 0.15;

/// Upper bound on tone length in seconds.
const MAX_SECONDS: f64 = 10.0;

/// Generates 16 kHz, 16-bit little-endian mono PCM for `text`.
///
/// The tone lasts 0.15 s per character, capped at 10 s, with a 0.5 s fade
/// at both ends.
///
/// # Example
///
/// ```rust
/// use heritage_kg::services::voice::fallback_pcm;
///
/// // Ten characters: 1.5 s at 16 kHz, two bytes per sample.
/// assert_eq!(fallback_pcm("青铜器保护主要关注防").len(), 48_000);
/// assert!(fallback_pcm("").is_empty());
/// ```
#[must_use]
pub fn fallback_pcm(text: &str) -> Vec<u8> {
    let duration = (text.chars().count() as f64 * SECONDS_PER_CHAR).min(MAX_SECONDS);
    let rate = f64::from(SAMPLE_RATE);
    let sample_count = (duration * rate).floor() as usize;

    let mut pcm = Vec::with_capacity(sample_count * 2);
    for i in 0..sample_count {
        let t = i as f64 / rate;
        let mut sample = (2.0 * PI * 440.0 * t).sin() * 0.2 + (2.0 * PI * 880.0 * t).sin() * 0.1;
        sample *= 1.0 + (2.0 * PI * 5.0 * t).sin() * 0.3;

        let fade = t.min(duration - t).min(0.5);
        sample *= (fade * 2.0).min(1.0);

        let scaled = (sample * 16_383.0)
            .floor()
            .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16;
        pcm.extend_from_slice(&scaled.to_le_bytes());
    }
    pcm
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(pcm: &[u8]) -> Vec<i16> {
        pcm.chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    #[test]
    fn test_length_scales_with_text() {
        assert_eq!(fallback_pcm("文物").len(), 2 * 4_800);
    }

    #[test]
    fn test_length_is_capped() {
        let long = "文".repeat(500);
        assert_eq!(fallback_pcm(&long).len(), 2 * 160_000);
    }

    #[test]
    fn test_fades_in_from_silence() {
        let pcm = samples(&fallback_pcm("古建筑保护要求不改变文物原状"));
        assert_eq!(pcm[0], 0);
        let peak = pcm.iter().map(|s| s.unsigned_abs()).max().unwrap_or(0);
        assert!(peak > 1_000);
        assert!(peak < 16_383);
    }
}
