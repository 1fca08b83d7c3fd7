//! Clinical data store.
//!
//! One slot per data category, populated on demand through the gateway.
//! A slot is either empty-and-idle, loading, or populated-and-idle; a
//! populated slot is never overwritten, and at most one generation request
//! is in flight per category. The guard check happens synchronously under
//! the lock before any request is issued, which is all the enforcement a
//! single-process event loop needs.

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use tracing::{debug, error, info};

use crate::case::CaseDefinition;
use crate::gateway::PatientGateway;
use crate::sim::transcript::{Sender, Transcript};

/// The closed set of clinical data panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataCategory {
    History,
    Exam,
    Labs,
    Imaging,
}

impl DataCategory {
    pub const ALL: [DataCategory; 4] = [
        DataCategory::History,
        DataCategory::Exam,
        DataCategory::Labs,
        DataCategory::Imaging,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DataCategory::History => "Medical History",
            DataCategory::Exam => "Physical Exam",
            DataCategory::Labs => "Lab Results",
            DataCategory::Imaging => "Imaging",
        }
    }

    /// The directive marker that unlocks this category mid-conversation.
    /// History has none: it is populated once at session start.
    pub fn unlock_token(&self) -> Option<&'static str> {
        match self {
            DataCategory::History => None,
            DataCategory::Exam => Some("[UNLOCK_EXAM]"),
            DataCategory::Labs => Some("[UNLOCK_LABS]"),
            DataCategory::Imaging => Some("[UNLOCK_IMAGING]"),
        }
    }

    fn index(&self) -> usize {
        match self {
            DataCategory::History => 0,
            DataCategory::Exam => 1,
            DataCategory::Labs => 2,
            DataCategory::Imaging => 3,
        }
    }
}

impl FromStr for DataCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "history" => Ok(DataCategory::History),
            "exam" => Ok(DataCategory::Exam),
            "labs" => Ok(DataCategory::Labs),
            "imaging" => Ok(DataCategory::Imaging),
            other => Err(format!("unknown data category: {other}")),
        }
    }
}

/// Lifecycle state of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Empty,
    Loading,
    Populated,
}

#[derive(Debug, Default)]
struct Slot {
    text: Option<String>,
    loading: bool,
}

/// Shared handle to the per-category data slots.
#[derive(Clone)]
pub struct ClinicalDataStore {
    slots: Arc<Mutex<[Slot; 4]>>,
    gateway: Arc<dyn PatientGateway>,
    case: Arc<CaseDefinition>,
    transcript: Transcript,
}

impl ClinicalDataStore {
    pub fn new(
        gateway: Arc<dyn PatientGateway>,
        case: Arc<CaseDefinition>,
        transcript: Transcript,
    ) -> Self {
        Self {
            slots: Arc::new(Mutex::new(Default::default())),
            gateway,
            case,
            transcript,
        }
    }

    /// Request generation of a category panel.
    ///
    /// No-op if the slot is already populated or a request is in flight.
    /// On failure the slot returns to empty so a later retry can succeed,
    /// and a System notice is appended to the transcript.
    pub async fn request(&self, category: DataCategory) {
        {
            let mut slots = self.slots.lock().expect("store lock poisoned");
            let slot = &mut slots[category.index()];
            if slot.text.is_some() || slot.loading {
                debug!(category = category.label(), "data request short-circuited");
                return;
            }
            slot.loading = true;
        }

        let prompt = self.case.data_prompt(category);
        let result = self.gateway.generate_category_data(category, prompt).await;

        let mut slots = self.slots.lock().expect("store lock poisoned");
        let slot = &mut slots[category.index()];
        slot.loading = false;
        match result {
            Ok(text) => {
                info!(category = category.label(), "data panel generated");
                if slot.text.is_none() {
                    slot.text = Some(text);
                }
            }
            Err(e) => {
                error!(category = category.label(), error = %e, "data generation failed");
                self.transcript.push(
                    Sender::System,
                    format!("Could not retrieve {} data. Please try again.", category.label()),
                );
            }
        }
    }

    pub fn status(&self, category: DataCategory) -> SlotStatus {
        let slots = self.slots.lock().expect("store lock poisoned");
        let slot = &slots[category.index()];
        if slot.text.is_some() {
            SlotStatus::Populated
        } else if slot.loading {
            SlotStatus::Loading
        } else {
            SlotStatus::Empty
        }
    }

    pub fn is_loading(&self, category: DataCategory) -> bool {
        self.status(category) == SlotStatus::Loading
    }

    /// The panel text, if generated.
    pub fn get(&self, category: DataCategory) -> Option<String> {
        let slots = self.slots.lock().expect("store lock poisoned");
        slots[category.index()].text.clone()
    }
}
