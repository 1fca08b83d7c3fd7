//! Voice capture state machine.
//!
//! Runs a continuous recognition session, committing only finalized
//! transcript segments into the compose buffer. A session that ends on
//! its own while capture is still intended restarts automatically; a
//! recognizer error forces the intent off and suppresses the restart, so
//! a persistent permission or hardware failure cannot loop forever.
//! Toggling capture off waits a short settle delay (so the last final
//! segment can land) and then hands the accumulated text back for
//! sending.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::{RecognizerEvent, SpeechRecognizer};

pub struct VoiceCapture {
    recognizer: Arc<dyn SpeechRecognizer>,
    buffer: Arc<Mutex<String>>,
    recording: Arc<AtomicBool>,
    settle: Duration,
    task: Option<JoinHandle<()>>,
}

impl VoiceCapture {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>, settle: Duration) -> Self {
        Self {
            recognizer,
            buffer: Arc::new(Mutex::new(String::new())),
            recording: Arc::new(AtomicBool::new(false)),
            settle,
            task: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Acquire)
    }

    /// The text accumulated so far, as the compose field would show it.
    pub fn compose_text(&self) -> String {
        self.buffer.lock().expect("compose lock poisoned").clone()
    }

    /// Begin capturing. Clears the compose buffer. No-op while already
    /// recording.
    pub fn start(&mut self) {
        if self.recording.swap(true, Ordering::AcqRel) {
            return;
        }
        self.buffer.lock().expect("compose lock poisoned").clear();

        let recognizer = self.recognizer.clone();
        let buffer = self.buffer.clone();
        let recording = self.recording.clone();
        self.task = Some(tokio::spawn(async move {
            run_capture(recognizer, buffer, recording).await;
        }));
    }

    /// Stop capturing and, after the settle delay, return the accumulated
    /// text if any. Returns `None` when capture was not running or nothing
    /// was dictated.
    pub async fn stop(&mut self) -> Option<String> {
        if !self.recording.swap(false, Ordering::AcqRel) {
            return None;
        }
        // Let the final recognition event land before reading the buffer.
        tokio::time::sleep(self.settle).await;
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let text = {
            let mut buffer = self.buffer.lock().expect("compose lock poisoned");
            std::mem::take(&mut *buffer)
        };
        let text = text.trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

/// Session loop: commit finals, restart on `Ended`, bail on errors.
async fn run_capture(
    recognizer: Arc<dyn SpeechRecognizer>,
    buffer: Arc<Mutex<String>>,
    recording: Arc<AtomicBool>,
) {
    while recording.load(Ordering::Acquire) {
        let mut session = match recognizer.listen().await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "speech recognition unavailable");
                recording.store(false, Ordering::Release);
                return;
            }
        };
        debug!(recognizer = recognizer.name(), "recognition session opened");

        loop {
            match session.next_event().await {
                Ok(Some(RecognizerEvent::Final { text })) => {
                    let segment = text.trim();
                    if !segment.is_empty() {
                        let mut buffer = buffer.lock().expect("compose lock poisoned");
                        if !buffer.is_empty() {
                            buffer.push(' ');
                        }
                        buffer.push_str(segment);
                    }
                }
                Ok(Some(RecognizerEvent::Partial { .. })) => {
                    // Interim results are never committed.
                }
                Ok(Some(RecognizerEvent::Ended)) | Ok(None) => {
                    // Restart if capture is still intended.
                    break;
                }
                Ok(Some(RecognizerEvent::Error { message })) => {
                    error!(message, "speech recognition error, stopping capture");
                    recording.store(false, Ordering::Release);
                    return;
                }
                Err(e) => {
                    error!(error = %e, "speech recognition stream failed");
                    recording.store(false, Ordering::Release);
                    return;
                }
            }
        }
        info!("recognition session ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::mock::MockRecognizer;

    fn final_event(text: &str) -> RecognizerEvent {
        RecognizerEvent::Final {
            text: text.to_string(),
        }
    }

    fn partial_event(text: &str) -> RecognizerEvent {
        RecognizerEvent::Partial {
            text: text.to_string(),
        }
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn finals_accumulate_single_space_joined() {
        let recognizer = Arc::new(MockRecognizer::new(vec![vec![
            final_event(" I have "),
            final_event("  pain"),
        ]]));
        let mut capture = VoiceCapture::new(recognizer, Duration::from_millis(5));

        capture.start();
        settle().await;

        assert_eq!(capture.compose_text(), "I have pain");
        assert_eq!(capture.stop().await, Some("I have pain".to_string()));
    }

    #[tokio::test]
    async fn partials_are_never_committed() {
        let recognizer = Arc::new(MockRecognizer::new(vec![vec![
            partial_event("i"),
            partial_event("i ha"),
            final_event("I have"),
            partial_event("pa"),
        ]]));
        let mut capture = VoiceCapture::new(recognizer, Duration::from_millis(5));

        capture.start();
        settle().await;

        assert_eq!(capture.compose_text(), "I have");
    }

    #[tokio::test]
    async fn session_end_restarts_while_recording() {
        let recognizer = Arc::new(MockRecognizer::new(vec![
            vec![final_event("where does"), RecognizerEvent::Ended],
            vec![final_event("it hurt")],
        ]));
        let mut capture = VoiceCapture::new(recognizer.clone(), Duration::from_millis(5));

        capture.start();
        settle().await;

        assert_eq!(recognizer.sessions_opened(), 2);
        assert!(capture.is_recording());
        assert_eq!(capture.stop().await, Some("where does it hurt".to_string()));
    }

    #[tokio::test]
    async fn error_stops_capture_and_suppresses_restart() {
        let recognizer = Arc::new(MockRecognizer::new(vec![
            vec![
                final_event("ow"),
                RecognizerEvent::Error {
                    message: "not-allowed".to_string(),
                },
            ],
            // A second script exists, but the error must prevent its use.
            vec![final_event("never reached")],
        ]));
        let mut capture = VoiceCapture::new(recognizer.clone(), Duration::from_millis(5));

        capture.start();
        settle().await;

        assert!(!capture.is_recording());
        assert_eq!(recognizer.sessions_opened(), 1);
        assert_eq!(capture.compose_text(), "ow");
    }

    #[tokio::test]
    async fn exhausted_recognizer_stops_cleanly() {
        // First session ends; no second session can be opened.
        let recognizer = Arc::new(MockRecognizer::new(vec![vec![
            final_event("hello"),
            RecognizerEvent::Ended,
        ]]));
        let mut capture = VoiceCapture::new(recognizer, Duration::from_millis(5));

        capture.start();
        settle().await;

        assert!(!capture.is_recording());
        assert_eq!(capture.compose_text(), "hello");
    }

    #[tokio::test]
    async fn stop_without_start_is_none() {
        let recognizer = Arc::new(MockRecognizer::new(vec![]));
        let mut capture = VoiceCapture::new(recognizer, Duration::from_millis(5));
        assert_eq!(capture.stop().await, None);
    }

    #[tokio::test]
    async fn stop_with_empty_buffer_is_none() {
        let recognizer = Arc::new(MockRecognizer::new(vec![vec![partial_event("mm")]]));
        let mut capture = VoiceCapture::new(recognizer, Duration::from_millis(5));

        capture.start();
        settle().await;
        assert_eq!(capture.stop().await, None);
    }

    #[tokio::test]
    async fn final_landing_during_settle_window_is_committed() {
        // 20 ms recognition latency per event: the second final arrives
        // only after the stop toggle, inside the settle window.
        let recognizer = Arc::new(
            MockRecognizer::new(vec![vec![
                final_event("I have"),
                final_event("severe pain"),
            ]])
            .with_event_delay(Duration::from_millis(20)),
        );
        let mut capture = VoiceCapture::new(recognizer, Duration::from_millis(60));

        capture.start();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(capture.compose_text(), "I have");

        // stop() clears the intent immediately but reads the buffer only
        // after the settle delay, so the in-flight final still lands.
        assert_eq!(capture.stop().await, Some("I have severe pain".to_string()));
    }

    #[tokio::test]
    async fn restart_after_stop_clears_previous_text() {
        let recognizer = Arc::new(MockRecognizer::new(vec![
            vec![final_event("first question")],
            vec![final_event("second question")],
        ]));
        let mut capture = VoiceCapture::new(recognizer, Duration::from_millis(5));

        capture.start();
        settle().await;
        assert_eq!(capture.stop().await, Some("first question".to_string()));

        capture.start();
        settle().await;
        assert_eq!(capture.compose_text(), "second question");
        assert_eq!(capture.stop().await, Some("second question".to_string()));
    }
}
