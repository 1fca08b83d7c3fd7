//! Gateway to the external generative service.
//!
//! The simulation core talks to exactly one opaque boundary:
//! [`PatientGateway`], with one operation per capability (chat turn, data
//! panel generation, structured evaluation, speech synthesis, portrait
//! generation). The real implementation lives in [`gemini`]; a scripted
//! [`mock`] backs every simulation test.

pub mod gemini;
pub mod mock;

use anyhow::Result;
use async_trait::async_trait;

use crate::sim::evaluation::EvaluationReport;
use crate::sim::store::DataCategory;

/// Role of a chat history entry, in the wire vocabulary of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Model,
}

/// One prior turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

/// Explicit conversation state for the one persistent chat session.
///
/// Created once at session start by the conversation controller, passed
/// by reference into every [`PatientGateway::chat_turn`] call, and never
/// recreated mid-session. Implementations append both sides of a
/// completed turn so the next call carries the full history.
#[derive(Debug, Clone)]
pub struct ChatSession {
    system_instruction: String,
    history: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            history: Vec::new(),
        }
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.history.push(ChatTurn {
            role: ChatRole::User,
            text: text.into(),
        });
    }

    pub fn push_model(&mut self, text: impl Into<String>) {
        self.history.push(ChatTurn {
            role: ChatRole::Model,
            text: text.into(),
        });
    }
}

/// The four-plus-one operations of the generative backend.
///
/// Pure request/response; no state beyond what the caller passes in.
#[async_trait]
pub trait PatientGateway: Send + Sync {
    /// One conversational turn. On success the raw reply text is returned
    /// (directive markers included) and the session history is extended
    /// with both sides of the turn.
    async fn chat_turn(&self, session: &mut ChatSession, user_text: &str) -> Result<String>;

    /// Generate the markdown panel for a data category from its fixed
    /// prompt.
    async fn generate_category_data(&self, category: DataCategory, prompt: &str)
    -> Result<String>;

    /// Score a diagnosis submission against the rubric. Implementations
    /// must return a fully parsed report; a reply that does not conform to
    /// the report shape is an error, never a partial result.
    async fn evaluate(&self, rubric: &str, submission: &str) -> Result<EvaluationReport>;

    /// Synthesize speech for the given text. Returns a base64-encoded raw
    /// PCM payload (little-endian i16, mono, 24 kHz).
    async fn synthesize_speech(&self, text: &str, voice: &str) -> Result<String>;

    /// Generate the patient portrait. Returns encoded image bytes.
    async fn generate_portrait(&self, prompt: &str) -> Result<Vec<u8>>;

    /// Human-readable gateway name.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_starts_empty() {
        let session = ChatSession::new("persona");
        assert_eq!(session.system_instruction(), "persona");
        assert!(session.history().is_empty());
    }

    #[test]
    fn session_history_alternates() {
        let mut session = ChatSession::new("persona");
        session.push_user("where does it hurt?");
        session.push_model("my lower right side");

        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[1].role, ChatRole::Model);
        assert_eq!(history[1].text, "my lower right side");
    }
}
