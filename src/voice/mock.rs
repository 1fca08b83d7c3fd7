//! Mock speech recognizer for testing.
//!
//! Replays scripted event sequences, one script per opened session, so
//! tests can exercise the auto-restart path deterministically.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::{RecognizerEvent, RecognizerSession, SpeechRecognizer};

/// Mock [`SpeechRecognizer`] replaying one scripted session per `listen`.
pub struct MockRecognizer {
    scripts: std::sync::Mutex<VecDeque<Vec<RecognizerEvent>>>,
    sessions_opened: Arc<AtomicUsize>,
    event_delay: Duration,
}

impl MockRecognizer {
    /// Each inner vector is the event sequence of one session, in order.
    pub fn new(scripts: Vec<Vec<RecognizerEvent>>) -> Self {
        Self {
            scripts: std::sync::Mutex::new(scripts.into()),
            sessions_opened: Arc::new(AtomicUsize::new(0)),
            event_delay: Duration::ZERO,
        }
    }

    /// Add recognition latency before each event, so tests can observe
    /// events landing while other futures are mid-await.
    pub fn with_event_delay(mut self, delay: Duration) -> Self {
        self.event_delay = delay;
        self
    }

    /// How many sessions have been opened so far.
    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::Acquire)
    }
}

#[async_trait]
impl SpeechRecognizer for MockRecognizer {
    async fn listen(&self) -> Result<Box<dyn RecognizerSession>> {
        self.sessions_opened.fetch_add(1, Ordering::AcqRel);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow!("mock: no scripted session left"))?;
        Ok(Box::new(MockSession {
            events: script.into(),
            event_delay: self.event_delay,
        }))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

struct MockSession {
    events: VecDeque<RecognizerEvent>,
    event_delay: Duration,
}

#[async_trait]
impl RecognizerSession for MockSession {
    async fn next_event(&mut self) -> Result<Option<RecognizerEvent>> {
        if self.event_delay.is_zero() {
            // Yield so the capture loop stays cooperative even with an
            // instantaneous script.
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.event_delay).await;
        }
        match self.events.pop_front() {
            Some(event) => Ok(Some(event)),
            // Script exhausted: keep listening, like a live microphone
            // with nobody speaking. Sessions end via an explicit `Ended`.
            None => std::future::pending().await,
        }
    }

    async fn stop(&mut self) -> Result<()> {
        self.events.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_events_in_order() {
        let recognizer = MockRecognizer::new(vec![vec![
            RecognizerEvent::Partial {
                text: "i".to_string(),
            },
            RecognizerEvent::Final {
                text: "I have".to_string(),
            },
            RecognizerEvent::Ended,
        ]]);

        let mut session = recognizer.listen().await.unwrap();
        assert!(matches!(
            session.next_event().await.unwrap(),
            Some(RecognizerEvent::Partial { .. })
        ));
        assert!(matches!(
            session.next_event().await.unwrap(),
            Some(RecognizerEvent::Final { .. })
        ));
        assert_eq!(session.next_event().await.unwrap(), Some(RecognizerEvent::Ended));
        assert_eq!(recognizer.sessions_opened(), 1);
    }

    #[tokio::test]
    async fn listen_past_last_script_is_err() {
        let recognizer = MockRecognizer::new(vec![]);
        assert!(recognizer.listen().await.is_err());
    }
}
