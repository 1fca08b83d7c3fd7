//! Speech playback and the speaking-animation driver.
//!
//! The actual audio device is an injected [`AudioSink`] capability; the
//! simulator never probes the environment at runtime. While a payload
//! plays, a level meter samples the PCM window at the playhead on a fixed
//! tick and publishes a normalized volume scalar through
//! [`SpeakingState`], which drives the jaw-offset animation and the
//! visual speaking indicator.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use super::pcm;
use crate::config::AudioConfig;

/// Normalization ceiling for the animation volume, in the 0-255 level
/// domain. Empirically chosen; levels at or above this map to full
/// jaw extension.
pub const VOLUME_CEILING: f32 = 110.0;

/// Default interval of the level meter (roughly one display refresh).
pub const METER_TICK: Duration = Duration::from_millis(16);

/// Audio output capability. Playback resolves when the buffer has been
/// fully delivered.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, samples: &[f32], sample_rate: u32) -> Result<()>;

    /// Human-readable sink name.
    fn name(&self) -> &str;
}

/// Sink that discards samples but takes the real playback duration, so
/// speaking-state timing stays faithful in front-ends without an audio
/// device.
pub struct NullSink;

#[async_trait]
impl AudioSink for NullSink {
    async fn play(&self, samples: &[f32], sample_rate: u32) -> Result<()> {
        let ms = pcm::duration_ms(samples, sample_rate);
        tokio::time::sleep(Duration::from_millis(ms as u64)).await;
        Ok(())
    }

    fn name(&self) -> &str {
        "null"
    }
}

#[derive(Debug, Default)]
struct SpeakingInner {
    speaking: bool,
    volume: f32,
}

/// Shared speaking-animation state: indicator flag plus a volume scalar
/// in 0.0..=1.0.
#[derive(Clone, Default)]
pub struct SpeakingState {
    inner: Arc<Mutex<SpeakingInner>>,
}

impl SpeakingState {
    pub fn is_speaking(&self) -> bool {
        self.inner.lock().expect("speaking lock poisoned").speaking
    }

    pub fn volume(&self) -> f32 {
        self.inner.lock().expect("speaking lock poisoned").volume
    }

    /// Jaw displacement for the current volume, scaled to `max` units.
    pub fn jaw_offset(&self, max: f32) -> f32 {
        self.volume() * max
    }

    fn set_speaking(&self, speaking: bool) {
        self.inner.lock().expect("speaking lock poisoned").speaking = speaking;
    }

    fn set_volume(&self, volume: f32) {
        self.inner.lock().expect("speaking lock poisoned").volume = volume;
    }

    fn clear(&self) {
        let mut inner = self.inner.lock().expect("speaking lock poisoned");
        inner.speaking = false;
        inner.volume = 0.0;
    }
}

/// Window amplitude in the 0-255 byte domain.
pub fn frame_level(window: &[f32]) -> u8 {
    (pcm::rms(window) * 255.0).clamp(0.0, 255.0) as u8
}

/// Normalize a byte-domain level against the animation ceiling.
pub fn volume_from_level(level: u8, ceiling: f32) -> f32 {
    (level as f32 / ceiling).min(1.0)
}

/// Clears the speaking state exactly once, on every exit path.
struct SpeakingGuard(SpeakingState);

impl Drop for SpeakingGuard {
    fn drop(&mut self) {
        self.0.clear();
    }
}

/// Aborts the meter task when dropped. The one disposal handle for the
/// sampling loop.
struct MeterHandle(tokio::task::JoinHandle<()>);

impl Drop for MeterHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn spawn_meter(
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    tick: Duration,
    ceiling: f32,
    state: SpeakingState,
) -> MeterHandle {
    MeterHandle(tokio::spawn(async move {
        let window = ((sample_rate as f64 * tick.as_secs_f64()) as usize).max(1);
        let mut interval = tokio::time::interval(tick);
        let mut pos = 0usize;
        loop {
            interval.tick().await;
            if pos >= samples.len() {
                state.set_volume(0.0);
                break;
            }
            let end = (pos + window).min(samples.len());
            let level = frame_level(&samples[pos..end]);
            state.set_volume(volume_from_level(level, ceiling));
            pos = end;
        }
    }))
}

/// Plays synthesized speech payloads and drives [`SpeakingState`].
#[derive(Clone)]
pub struct SpeechPlayer {
    sink: Arc<dyn AudioSink>,
    state: SpeakingState,
    meter_tick: Duration,
    volume_ceiling: f32,
}

impl SpeechPlayer {
    pub fn new(sink: Arc<dyn AudioSink>, state: SpeakingState) -> Self {
        Self {
            sink,
            state,
            meter_tick: METER_TICK,
            volume_ceiling: VOLUME_CEILING,
        }
    }

    pub fn from_config(sink: Arc<dyn AudioSink>, state: SpeakingState, config: &AudioConfig) -> Self {
        Self {
            sink,
            state,
            meter_tick: Duration::from_millis(config.meter_tick_ms),
            volume_ceiling: config.volume_ceiling,
        }
    }

    pub fn speaking_state(&self) -> SpeakingState {
        self.state.clone()
    }

    /// Play one payload to completion.
    ///
    /// A malformed or empty payload completes immediately without error.
    /// The speaking flag and volume are cleared exactly once whether
    /// playback ends normally, the sink fails, or the future is dropped.
    pub async fn speak(&self, payload: &str) {
        let samples = match pcm::decode_payload(payload) {
            Ok(samples) if !samples.is_empty() => Arc::new(samples),
            Ok(_) => {
                debug!("empty speech payload, skipping playback");
                return;
            }
            Err(e) => {
                warn!(error = %e, "malformed speech payload, skipping playback");
                return;
            }
        };

        self.state.set_speaking(true);
        let _guard = SpeakingGuard(self.state.clone());
        let _meter = spawn_meter(
            samples.clone(),
            pcm::SAMPLE_RATE,
            self.meter_tick,
            self.volume_ceiling,
            self.state.clone(),
        );

        if let Err(e) = self.sink.play(&samples, pcm::SAMPLE_RATE).await {
            warn!(error = %e, sink = self.sink.name(), "audio playback failed");
        }
    }
}
