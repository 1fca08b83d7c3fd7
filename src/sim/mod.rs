//! Simulation core.
//!
//! The turn-based conversation / data-unlock / evaluation state machine:
//! transcript, directive protocol, clinical data store, and the two
//! controllers that drive a session.

pub mod celebration;
pub mod conversation;
pub mod directive;
pub mod evaluation;
pub mod reply_gate;
pub mod store;
pub mod transcript;

pub use conversation::ConversationController;
pub use evaluation::{EvaluationController, EvaluationReport};
pub use store::{ClinicalDataStore, DataCategory, SlotStatus};
pub use transcript::{ChatMessage, Sender, Transcript};
