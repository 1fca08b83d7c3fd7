//! Scripted mock gateway for testing.
//!
//! Replays queued chat replies, serves deterministic data panels, and
//! records every call so tests can assert on call counts, requested
//! categories, and the exact text sent to speech synthesis. Failure
//! injection is per-operation and switchable mid-test.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::time::sleep;

use crate::error::GatewayError;
use crate::sim::evaluation::{CriticalTask, EvaluationReport};
use crate::sim::store::DataCategory;

use super::{ChatSession, PatientGateway};

/// One queued outcome for a chat turn.
#[derive(Debug, Clone)]
enum ScriptedReply {
    Text(String),
    Failure,
}

/// Mock [`PatientGateway`] with scripted replies and call recording.
pub struct MockGateway {
    replies: Mutex<VecDeque<ScriptedReply>>,
    report: Mutex<Option<EvaluationReport>>,
    data_delay: Duration,
    fail_data: AtomicBool,
    fail_evaluation: AtomicBool,
    fail_speech: AtomicBool,
    chat_calls: AtomicUsize,
    data_calls: AtomicUsize,
    eval_calls: AtomicUsize,
    speech_calls: AtomicUsize,
    portrait_calls: AtomicUsize,
    data_requests: Mutex<Vec<DataCategory>>,
    spoken: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            report: Mutex::new(None),
            data_delay: Duration::ZERO,
            fail_data: AtomicBool::new(false),
            fail_evaluation: AtomicBool::new(false),
            fail_speech: AtomicBool::new(false),
            chat_calls: AtomicUsize::new(0),
            data_calls: AtomicUsize::new(0),
            eval_calls: AtomicUsize::new(0),
            speech_calls: AtomicUsize::new(0),
            portrait_calls: AtomicUsize::new(0),
            data_requests: Mutex::new(Vec::new()),
            spoken: Mutex::new(Vec::new()),
        }
    }

    /// Add simulated latency to data generation (for single-flight tests).
    pub fn with_data_delay(mut self, delay: Duration) -> Self {
        self.data_delay = delay;
        self
    }

    /// Queue the next patient reply.
    pub fn queue_reply(&self, text: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Text(text.to_string()));
    }

    /// Queue a chat transport failure.
    pub fn queue_chat_failure(&self) {
        self.replies
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Failure);
    }

    /// Set the report returned by the next evaluation calls.
    pub fn set_report(&self, report: EvaluationReport) {
        *self.report.lock().unwrap() = Some(report);
    }

    pub fn set_fail_data(&self, fail: bool) {
        self.fail_data.store(fail, Ordering::Release);
    }

    pub fn set_fail_evaluation(&self, fail: bool) {
        self.fail_evaluation.store(fail, Ordering::Release);
    }

    pub fn set_fail_speech(&self, fail: bool) {
        self.fail_speech.store(fail, Ordering::Release);
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::Acquire)
    }

    pub fn data_calls(&self) -> usize {
        self.data_calls.load(Ordering::Acquire)
    }

    pub fn eval_calls(&self) -> usize {
        self.eval_calls.load(Ordering::Acquire)
    }

    pub fn speech_calls(&self) -> usize {
        self.speech_calls.load(Ordering::Acquire)
    }

    pub fn portrait_calls(&self) -> usize {
        self.portrait_calls.load(Ordering::Acquire)
    }

    /// Categories for which data generation actually reached the gateway.
    pub fn data_requests(&self) -> Vec<DataCategory> {
        self.data_requests.lock().unwrap().clone()
    }

    /// Every text passed to speech synthesis, in call order.
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PatientGateway for MockGateway {
    async fn chat_turn(&self, session: &mut ChatSession, user_text: &str) -> Result<String> {
        self.chat_calls.fetch_add(1, Ordering::AcqRel);
        let scripted = self.replies.lock().unwrap().pop_front();
        match scripted {
            Some(ScriptedReply::Text(reply)) => {
                session.push_user(user_text);
                session.push_model(reply.clone());
                Ok(reply)
            }
            Some(ScriptedReply::Failure) => Err(anyhow!("mock: scripted chat failure")),
            None => Err(anyhow!("mock: no scripted reply queued")),
        }
    }

    async fn generate_category_data(
        &self,
        category: DataCategory,
        _prompt: &str,
    ) -> Result<String> {
        self.data_calls.fetch_add(1, Ordering::AcqRel);
        self.data_requests.lock().unwrap().push(category);
        if !self.data_delay.is_zero() {
            sleep(self.data_delay).await;
        }
        if self.fail_data.load(Ordering::Acquire) {
            return Err(anyhow!("mock: data generation unavailable"));
        }
        Ok(format!("## {}\n\nGenerated panel.", category.label()))
    }

    async fn evaluate(&self, _rubric: &str, _submission: &str) -> Result<EvaluationReport> {
        self.eval_calls.fetch_add(1, Ordering::AcqRel);
        if self.fail_evaluation.load(Ordering::Acquire) {
            return Err(
                GatewayError::MalformedReport("mock: unparseable response".to_string()).into(),
            );
        }
        let report = self.report.lock().unwrap().clone();
        Ok(report.unwrap_or_else(|| sample_report(85)))
    }

    async fn synthesize_speech(&self, text: &str, _voice: &str) -> Result<String> {
        self.speech_calls.fetch_add(1, Ordering::AcqRel);
        if self.fail_speech.load(Ordering::Acquire) {
            return Err(anyhow!("mock: speech synthesis unavailable"));
        }
        self.spoken.lock().unwrap().push(text.to_string());
        // 240 samples of silence at 24 kHz.
        Ok(BASE64.encode(vec![0u8; 480]))
    }

    async fn generate_portrait(&self, _prompt: &str) -> Result<Vec<u8>> {
        self.portrait_calls.fetch_add(1, Ordering::AcqRel);
        Ok(vec![0xFF, 0xD8, 0xFF, 0xE0])
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A plausible evaluation report with the given score.
pub fn sample_report(score: u8) -> EvaluationReport {
    EvaluationReport {
        score,
        overall_summary: "Solid diagnostic reasoning with minor gaps in perioperative care."
            .to_string(),
        critical_checklist: vec![
            CriticalTask {
                task: "Correct diagnosis of acute appendicitis".to_string(),
                status: true,
                feedback: "Identified from migratory pain and exam findings.".to_string(),
            },
            CriticalTask {
                task: "NPO status ordered".to_string(),
                status: score >= 80,
                feedback: "Required before appendectomy.".to_string(),
            },
        ],
        missed_opportunities: vec!["Did not mention analgesia timing.".to_string()],
        textbook_insight: "Luminal obstruction drives the classic visceral-to-somatic pain shift."
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_replies_in_order() {
        let gateway = MockGateway::new();
        gateway.queue_reply("first");
        gateway.queue_reply("second");

        let mut session = ChatSession::new("persona");
        assert_eq!(gateway.chat_turn(&mut session, "a").await.unwrap(), "first");
        assert_eq!(gateway.chat_turn(&mut session, "b").await.unwrap(), "second");
        assert_eq!(gateway.chat_calls(), 2);
        assert_eq!(session.history().len(), 4);
    }

    #[tokio::test]
    async fn unscripted_chat_is_err() {
        let gateway = MockGateway::new();
        let mut session = ChatSession::new("persona");
        assert!(gateway.chat_turn(&mut session, "a").await.is_err());
        // Failed turns do not touch the history.
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn speech_records_exact_text() {
        let gateway = MockGateway::new();
        let payload = gateway.synthesize_speech("hello", "Kore").await.unwrap();
        assert!(!payload.is_empty());
        assert_eq!(gateway.spoken(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn evaluation_failure_injection() {
        let gateway = MockGateway::new();
        gateway.set_fail_evaluation(true);
        assert!(gateway.evaluate("rubric", "dx").await.is_err());
        gateway.set_fail_evaluation(false);
        assert!(gateway.evaluate("rubric", "dx").await.is_ok());
        assert_eq!(gateway.eval_calls(), 2);
    }

    #[test]
    fn sample_report_score_carries_through() {
        assert_eq!(sample_report(64).score, 64);
    }
}
