use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;

const DEFAULT_AGENT_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_AGENT_TIMEOUT_SECS: u64 = 10;

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl AgentConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let base_url =
            env::var("AGENT_BASE_URL").unwrap_or_else(|_| DEFAULT_AGENT_BASE_URL.into());
        let timeout = env::var("AGENT_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or(
                Duration::from_secs(DEFAULT_AGENT_TIMEOUT_SECS),
                Duration::from_secs,
            );
        Self { base_url, timeout }
    }
}

/// Outbound payload describing the question just answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest {
    pub question_id: String,
    pub topic: String,
    pub sub_topic: Option<String>,
    pub difficulty: u8,
    pub was_correct: bool,
    /// Seconds the learner actually spent.
    pub time_taken: u32,
    /// Seconds the question was estimated to take.
    pub estimated_time: Option<u32>,
    pub answer: Option<String>,
    pub session_id: String,
    pub user_id: String,
}

/// What the agent answers with. Only `nextQuestionId` drives progression;
/// the rest enriches the response and the audit trail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentReply {
    #[serde(default)]
    pub next_question_id: Option<String>,
    #[serde(default)]
    pub next_difficulty: Option<u8>,
    #[serde(default)]
    pub mastery: Option<f32>,
    #[serde(default)]
    pub strategy_tip: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub reflection_prompt: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Client for the remote question-selection service.
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Ask the agent for the next question given the last answer.
    ///
    /// # Errors
    ///
    /// Returns `AgentError` on connect/timeout, non-2xx status, or a body
    /// that does not decode.
    async fn suggest_next(&self, request: &AgentRequest) -> Result<AgentReply, AgentError>;
}

/// Synchronous HTTP implementation with a bounded timeout.
///
/// A hung agent surfaces as `AgentError::Unavailable` after the configured
/// timeout instead of blocking the request indefinitely.
#[derive(Clone)]
pub struct HttpAgentClient {
    client: Client,
    config: AgentConfig,
}

impl HttpAgentClient {
    /// Build a client for the given agent endpoint.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Http` if the underlying client cannot be built.
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(AgentError::Http)?;
        Ok(Self { client, config })
    }

    /// Build a client from `AGENT_BASE_URL` / `AGENT_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Http` if the underlying client cannot be built.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::new(AgentConfig::from_env())
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/agent/suggest-next",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn suggest_next(&self, request: &AgentRequest) -> Result<AgentReply, AgentError> {
        let response = self
            .client
            .post(self.endpoint())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    AgentError::Unavailable
                } else {
                    AgentError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::HttpStatus(status));
        }

        let body = response.text().await.map_err(AgentError::Http)?;
        serde_json::from_str(&body).map_err(|e| AgentError::MalformedResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_decodes_the_wire_contract() {
        let body = r#"{
            "nextQuestionId": "q-ari-3-1",
            "nextDifficulty": 3,
            "strategyTip": "Use chunking.",
            "message": "Nice work - keep going!",
            "reflectionPrompt": null
        }"#;
        let reply: AgentReply = serde_json::from_str(body).unwrap();
        assert_eq!(reply.next_question_id.as_deref(), Some("q-ari-3-1"));
        assert_eq!(reply.next_difficulty, Some(3));
        assert_eq!(reply.mastery, None);
        assert_eq!(reply.reflection_prompt, None);
    }

    #[test]
    fn reply_tolerates_extra_and_missing_fields() {
        let reply: AgentReply = serde_json::from_str(r#"{"unknown": true}"#).unwrap();
        assert!(reply.next_question_id.is_none());
        assert!(reply.message.is_none());
    }

    #[test]
    fn request_serializes_camel_case() {
        let request = AgentRequest {
            question_id: "q-1".into(),
            topic: "arithmetic".into(),
            sub_topic: None,
            difficulty: 2,
            was_correct: true,
            time_taken: 17,
            estimated_time: Some(60),
            answer: Some("42".into()),
            session_id: "s-1".into(),
            user_id: "u-1".into(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"questionId\":\"q-1\""));
        assert!(json.contains("\"wasCorrect\":true"));
        assert!(json.contains("\"timeTaken\":17"));
        assert!(json.contains("\"estimatedTime\":60"));
    }

    #[test]
    fn config_defaults_are_bounded() {
        let config = AgentConfig {
            base_url: DEFAULT_AGENT_BASE_URL.into(),
            timeout: Duration::from_secs(DEFAULT_AGENT_TIMEOUT_SECS),
        };
        let client = HttpAgentClient::new(config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:5000/agent/suggest-next");
    }
}
