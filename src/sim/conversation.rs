//! Conversation controller.
//!
//! Owns the turn-taking cycle: append the student's message, await the
//! patient reply, extract unlock directives, and fan out the side effects
//! (data generation, speech playback, system notices). One persistent
//! [`ChatSession`] carries the whole conversation; it is created in the
//! constructor and never recreated.

use std::sync::Arc;

use tokio::sync::OwnedSemaphorePermit;
use tracing::{error, info, warn};

use crate::audio::SpeechPlayer;
use crate::case::CaseDefinition;
use crate::error::SimError;
use crate::gateway::{ChatSession, PatientGateway};
use crate::sim::directive;
use crate::sim::reply_gate::ReplyGate;
use crate::sim::store::{ClinicalDataStore, DataCategory};
use crate::sim::transcript::{Sender, Transcript};

/// Fallback shown when the chat backend cannot be reached.
pub const CHAT_ERROR_NOTICE: &str = "Communication error. Check your connection.";

/// One-per-turn notice that clinical data became available.
pub const DATA_UNLOCK_NOTICE: &str =
    "\u{2728} Clinical insight achieved: New medical data generated.";

pub struct ConversationController {
    gateway: Arc<dyn PatientGateway>,
    case: Arc<CaseDefinition>,
    transcript: Transcript,
    store: ClinicalDataStore,
    speech: Option<SpeechPlayer>,
    session: ChatSession,
    gate: ReplyGate,
}

impl ConversationController {
    /// Build the controller and its one persistent chat session. Speech is
    /// an optional capability; without it, replies are silent.
    pub fn new(
        gateway: Arc<dyn PatientGateway>,
        case: Arc<CaseDefinition>,
        transcript: Transcript,
        store: ClinicalDataStore,
        speech: Option<SpeechPlayer>,
    ) -> Self {
        let session = ChatSession::new(case.persona_prompt.clone());
        Self {
            gateway,
            case,
            transcript,
            store,
            speech,
            session,
            gate: ReplyGate::new(),
        }
    }

    /// Open the session: post the briefing and kick off the History panel,
    /// which is available from the start rather than directive-gated.
    pub fn start(&mut self) {
        info!(patient = %self.case.profile.name, "session started");
        self.transcript
            .push(Sender::System, self.case.briefing.clone());

        let store = self.store.clone();
        tokio::spawn(async move {
            store.request(DataCategory::History).await;
        });
    }

    /// Shared gate handle, for the presentation layer's send affordance.
    pub fn reply_gate(&self) -> ReplyGate {
        self.gate.clone()
    }

    /// Returns `true` while a patient reply is in flight.
    pub fn is_awaiting_reply(&self) -> bool {
        self.gate.is_pending()
    }

    /// Send one student message and process the patient's reply.
    ///
    /// Rejects empty input and reentrant sends; a gateway failure is
    /// handled internally (System notice in the transcript) and still
    /// returns `Ok`. Directive-triggered data fetches and speech playback
    /// are fire-and-forget with no ordering guarantee relative to the
    /// appended messages.
    pub async fn send_user_message(&mut self, text: &str) -> Result<(), SimError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SimError::EmptyInput);
        }
        let _permit: OwnedSemaphorePermit =
            self.gate.try_acquire().ok_or(SimError::ReplyPending)?;

        self.transcript.push(Sender::User, text);

        let raw = match self.gateway.chat_turn(&mut self.session, text).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(error = %e, "chat turn failed");
                self.transcript.push(Sender::System, CHAT_ERROR_NOTICE);
                return Ok(());
            }
        };

        let (clean, unlocked) = directive::extract(&raw);

        for category in &unlocked {
            info!(category = category.label(), "unlock directive received");
            let store = self.store.clone();
            let category = *category;
            tokio::spawn(async move {
                store.request(category).await;
            });
        }

        if !clean.is_empty() {
            self.transcript.push(Sender::Patient, clean.clone());
            if let Some(player) = &self.speech {
                self.spawn_speech(player.clone(), clean);
            }
        }

        if !unlocked.is_empty() {
            self.transcript.push(Sender::System, DATA_UNLOCK_NOTICE);
        }

        Ok(())
    }

    /// Synthesize and play the reply text. Failures are logged and the
    /// conversation continues without audio.
    fn spawn_speech(&self, player: SpeechPlayer, text: String) {
        let gateway = self.gateway.clone();
        let voice = self.case.voice_name();
        tokio::spawn(async move {
            match gateway.synthesize_speech(&text, voice).await {
                Ok(payload) => player.speak(&payload).await,
                Err(e) => warn!(error = %e, "speech synthesis failed, continuing silently"),
            }
        });
    }
}
