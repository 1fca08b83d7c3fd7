//! Error types shared across the gateway and simulation layers.

use thiserror::Error;

/// Failures reported by a [`crate::gateway::PatientGateway`] implementation.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response contained no usable candidate")]
    EmptyResponse,

    /// The evaluation service replied, but not with the required report
    /// shape. Treated exactly like a transport failure: no partial report
    /// is ever accepted.
    #[error("evaluation report did not match the required shape: {0}")]
    MalformedReport(String),
}

/// Precondition violations surfaced to the caller of the simulation
/// controllers. Gateway failures during a turn are handled internally
/// (degraded to a transcript notice) and are not represented here.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("message text is empty")]
    EmptyInput,

    #[error("a patient reply is already pending")]
    ReplyPending,

    #[error("an evaluation is already in progress")]
    EvaluationPending,

    #[error("evaluation failed: {0}")]
    Evaluation(#[source] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_report_message() {
        let err = GatewayError::MalformedReport("missing field `score`".to_string());
        assert!(err.to_string().contains("missing field `score`"));
    }

    #[test]
    fn status_error_message() {
        let err = GatewayError::Status {
            status: 429,
            body: "quota".to_string(),
        };
        assert!(err.to_string().contains("429"));
    }

    #[test]
    fn sim_error_messages() {
        assert_eq!(SimError::EmptyInput.to_string(), "message text is empty");
        assert!(SimError::ReplyPending.to_string().contains("pending"));
    }
}
