//! Voice input: recognizer capability traits and the capture state
//! machine that feeds dictated text into the message composer.

pub mod capture;
pub mod mock;

pub use capture::VoiceCapture;

use anyhow::Result;
use async_trait::async_trait;

/// Events produced by a speech recognizer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerEvent {
    /// Interim (unstable) recognition result. Never committed.
    Partial { text: String },

    /// Final (stable) recognition result for one utterance.
    Final { text: String },

    /// The recognizer stopped on its own; the capture loop may restart it.
    Ended,

    /// Permission or hardware failure. Terminal for the capture session.
    Error { message: String },
}

/// One live recognition session.
#[async_trait]
pub trait RecognizerSession: Send {
    /// Receive the next event. Returns `None` when the session is closed.
    async fn next_event(&mut self) -> Result<Option<RecognizerEvent>>;

    /// Close the session.
    async fn stop(&mut self) -> Result<()>;
}

/// Factory for recognition sessions. Injected at construction; a
/// front-end without speech input wires `None` instead of probing the
/// environment at runtime.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Open a new continuous-recognition session.
    async fn listen(&self) -> Result<Box<dyn RecognizerSession>>;

    /// Human-readable recognizer name.
    fn name(&self) -> &str;
}
