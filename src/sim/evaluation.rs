//! Diagnosis evaluation.
//!
//! The student submits a free-text diagnosis and management plan; the
//! gateway scores it against the case rubric and returns a structured
//! report. The report is stored wholesale and replaced on resubmission,
//! never merged. High scores fire a purely decorative confetti burst.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::case::CaseDefinition;
use crate::error::{GatewayError, SimError};
use crate::gateway::PatientGateway;
use crate::sim::celebration::Celebration;

/// Score threshold at or above which the celebration fires.
pub const CELEBRATION_THRESHOLD: u8 = 80;

/// One rubric checklist item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalTask {
    pub task: String,
    pub status: bool,
    pub feedback: String,
}

/// Structured scoring report. All fields are required; a response missing
/// any of them fails to parse and is rejected outright.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub score: u8,
    pub overall_summary: String,
    pub critical_checklist: Vec<CriticalTask>,
    pub missed_opportunities: Vec<String>,
    pub textbook_insight: String,
}

/// Owns the submit cycle and the latest report.
pub struct EvaluationController {
    gateway: Arc<dyn PatientGateway>,
    case: Arc<CaseDefinition>,
    report: Option<EvaluationReport>,
    evaluating: bool,
    celebration: Celebration,
}

impl EvaluationController {
    pub fn new(gateway: Arc<dyn PatientGateway>, case: Arc<CaseDefinition>) -> Self {
        Self {
            gateway,
            case,
            report: None,
            evaluating: false,
            celebration: Celebration::new(),
        }
    }

    /// Submit a diagnosis for scoring.
    ///
    /// Rejects empty submissions and reentrant submits. Any prior report
    /// is cleared before the gateway call; on failure no report is set and
    /// the student may resubmit. The evaluating flag clears on every path.
    pub async fn submit(&mut self, text: &str) -> Result<(), SimError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SimError::EmptyInput);
        }
        if self.evaluating {
            return Err(SimError::EvaluationPending);
        }

        self.evaluating = true;
        self.report = None;
        let result = self
            .gateway
            .evaluate(&self.case.evaluation_prompt, text)
            .await;
        self.evaluating = false;

        let report = result.map_err(|e| {
            error!(error = %e, "evaluation failed");
            SimError::Evaluation(e)
        })?;

        if report.score > 100 {
            error!(score = report.score, "evaluation score out of range");
            return Err(SimError::Evaluation(
                GatewayError::MalformedReport(format!("score {} out of range", report.score))
                    .into(),
            ));
        }

        info!(score = report.score, "evaluation complete");
        if report.score >= CELEBRATION_THRESHOLD {
            self.celebration.trigger();
        }
        self.report = Some(report);
        Ok(())
    }

    pub fn is_evaluating(&self) -> bool {
        self.evaluating
    }

    pub fn report(&self) -> Option<&EvaluationReport> {
        self.report.as_ref()
    }

    pub fn celebration(&mut self) -> &mut Celebration {
        &mut self.celebration
    }
}
