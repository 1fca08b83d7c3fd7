//! Speech audio: payload decoding, playback, and the speaking-animation
//! level meter.

pub mod pcm;
pub mod playback;

pub use playback::{AudioSink, NullSink, SpeakingState, SpeechPlayer};
