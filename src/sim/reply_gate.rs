//! Single-permit gate for the conversational turn cycle.
//!
//! While a patient reply is in flight the send affordance is blocked;
//! the gate makes that state observable to the presentation layer and
//! guarantees the pending flag clears on every exit path (the permit is
//! released by RAII drop).

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A single-permit gate that serializes conversational turns.
///
/// The conversation controller calls `try_acquire()` at the top of a send
/// and holds the permit for the whole turn; a second send while the reply
/// is pending gets `None` and is rejected.
#[derive(Clone)]
pub struct ReplyGate {
    semaphore: Arc<Semaphore>,
}

impl ReplyGate {
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    /// Non-blocking acquire. Returns `None` if a reply is already pending.
    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.semaphore.clone().try_acquire_owned().ok()
    }

    /// Returns `true` while a patient reply is in flight.
    pub fn is_pending(&self) -> bool {
        self.semaphore.available_permits() == 0
    }
}

impl Default for ReplyGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_pending_reflects_permit_state() {
        let gate = ReplyGate::new();
        assert!(!gate.is_pending());

        let permit = gate.try_acquire().unwrap();
        assert!(gate.is_pending());

        drop(permit);
        assert!(!gate.is_pending());
    }

    #[test]
    fn try_acquire_returns_none_while_pending() {
        let gate = ReplyGate::new();
        let _permit = gate.try_acquire().unwrap();
        assert!(gate.try_acquire().is_none());
    }

    #[test]
    fn clone_shares_state() {
        let gate1 = ReplyGate::new();
        let gate2 = gate1.clone();

        let _permit = gate1.try_acquire().unwrap();
        assert!(gate2.is_pending());
        assert!(gate2.try_acquire().is_none());
    }
}
