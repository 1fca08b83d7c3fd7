//! Session transcript.
//!
//! An append-only, insertion-ordered message log shared between the
//! conversation controller, the data store (for error notices), and the
//! presentation layer. Messages are immutable once appended and are never
//! removed; the transcript grows monotonically for the session.

use std::sync::{Arc, Mutex};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Patient,
    System,
}

/// One transcript entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
}

/// Cheaply clonable shared handle to the session transcript.
#[derive(Clone, Default)]
pub struct Transcript {
    inner: Arc<Mutex<Vec<ChatMessage>>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. The only mutation the transcript supports.
    pub fn push(&self, sender: Sender, text: impl Into<String>) {
        let message = ChatMessage {
            sender,
            text: text.into(),
        };
        self.inner
            .lock()
            .expect("transcript lock poisoned")
            .push(message);
    }

    /// A point-in-time copy of the full message log.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.inner.lock().expect("transcript lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("transcript lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<ChatMessage> {
        self.inner
            .lock()
            .expect("transcript lock poisoned")
            .last()
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_preserves_insertion_order() {
        let transcript = Transcript::new();
        transcript.push(Sender::System, "briefing");
        transcript.push(Sender::User, "hello?");
        transcript.push(Sender::Patient, "it hurts");

        let log = transcript.snapshot();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].sender, Sender::System);
        assert_eq!(log[1].text, "hello?");
        assert_eq!(log[2].sender, Sender::Patient);
    }

    #[test]
    fn clone_shares_state() {
        let a = Transcript::new();
        let b = a.clone();
        a.push(Sender::User, "from a");
        b.push(Sender::Patient, "from b");

        assert_eq!(a.len(), 2);
        assert_eq!(b.snapshot(), a.snapshot());
    }

    #[test]
    fn last_returns_most_recent() {
        let transcript = Transcript::new();
        assert!(transcript.last().is_none());
        transcript.push(Sender::User, "one");
        transcript.push(Sender::User, "two");
        assert_eq!(transcript.last().unwrap().text, "two");
    }

    #[test]
    fn empty_transcript() {
        let transcript = Transcript::new();
        assert!(transcript.is_empty());
        assert_eq!(transcript.len(), 0);
    }
}
