//! PCM payload decoding and level helpers.
//!
//! Synthesized speech arrives as base64-encoded raw PCM in one fixed
//! layout: little-endian signed 16-bit, mono, 24 kHz.

use anyhow::{Result, bail};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Sample rate of every synthesis payload.
pub const SAMPLE_RATE: u32 = 24_000;

/// Decode a base64 PCM payload into f32 samples in -1.0..1.0.
pub fn decode_payload(payload: &str) -> Result<Vec<f32>> {
    let bytes = BASE64.decode(payload.trim())?;
    if bytes.len() % 2 != 0 {
        bail!("PCM payload has odd byte length {}", bytes.len());
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect())
}

/// Playback duration of a sample buffer in milliseconds.
pub fn duration_ms(samples: &[f32], sample_rate: u32) -> f64 {
    samples.len() as f64 * 1000.0 / sample_rate as f64
}

/// Compute RMS (root mean square) level of an f32 PCM buffer.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}
