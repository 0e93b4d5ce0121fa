use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Difficulty, QuestionId, SessionId};

/// Schema version stamped into persisted agent blobs so readers can detect
/// shape changes instead of guessing at untyped maps.
pub const AGENT_RECORD_SCHEMA_VERSION: u16 = 1;

/// What the agent said about an answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentFeedback {
    pub version: u16,
    pub message: String,
    pub reflection_prompt: Option<String>,
    pub strategy_tip: Option<String>,
}

impl AgentFeedback {
    #[must_use]
    pub fn new(
        message: impl Into<String>,
        reflection_prompt: Option<String>,
        strategy_tip: Option<String>,
    ) -> Self {
        Self {
            version: AGENT_RECORD_SCHEMA_VERSION,
            message: message.into(),
            reflection_prompt,
            strategy_tip,
        }
    }
}

/// Raw request/response pair of one agent call, kept for audit.
///
/// Both sides are stored as serialized JSON text; the version field
/// documents the envelope, not the agent's own payload schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTrace {
    pub version: u16,
    pub request: String,
    pub response: String,
}

impl AgentTrace {
    #[must_use]
    pub fn new(request: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            version: AGENT_RECORD_SCHEMA_VERSION,
            request: request.into(),
            response: response.into(),
        }
    }
}

/// Write-once audit row for one agent invocation.
///
/// Read back only to reconstruct "why was this question chosen" when the
/// session's current question is served.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentDecision {
    /// Storage-assigned row id; `None` until persisted.
    pub id: Option<i64>,
    pub session_id: SessionId,
    pub prev_question_id: Option<QuestionId>,
    pub next_question_id: Option<QuestionId>,
    pub next_difficulty: Option<Difficulty>,
    /// Scalar proficiency estimate in 0..=1.
    pub mastery: f32,
    pub reason: String,
    pub trace: AgentTrace,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_is_stamped_with_schema_version() {
        let feedback = AgentFeedback::new("Nice work", None, Some("chunk it".into()));
        assert_eq!(feedback.version, AGENT_RECORD_SCHEMA_VERSION);
        assert_eq!(feedback.message, "Nice work");
        assert_eq!(feedback.strategy_tip.as_deref(), Some("chunk it"));
    }

    #[test]
    fn trace_serializes_roundtrip() {
        let trace = AgentTrace::new(r#"{"questionId":"q-1"}"#, r#"{"nextQuestionId":"q-2"}"#);
        let json = serde_json::to_string(&trace).unwrap();
        let back: AgentTrace = serde_json::from_str(&json).unwrap();
        assert_eq!(back, trace);
    }
}
