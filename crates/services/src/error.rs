//! Shared error types for the services crate.

use thiserror::Error;

use practice_core::model::{QuestionId, SessionError, SessionId, TopicSlug, UserId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the agent client.
///
/// Agent failures are fatal to the enclosing request: they are never
/// retried, cached, or masked with a guessed question.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AgentError {
    #[error("agent unavailable (connect/timeout)")]
    Unavailable,

    #[error("agent request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("agent returned a malformed response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Http(reqwest::Error),
}

/// Errors emitted by `SessionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionServiceError {
    #[error("user with id {0} not found")]
    UserNotFound(UserId),

    #[error("session with id {0} not found")]
    SessionNotFound(SessionId),

    #[error("question with id {0} not found")]
    QuestionNotFound(QuestionId),

    #[error("topics not found: {}", format_slugs(.0))]
    TopicsNotFound(Vec<TopicSlug>),

    #[error("no questions available for topic {0}")]
    NoQuestionsForTopic(TopicSlug),

    #[error("no current question found in session")]
    NoCurrentQuestion,

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn format_slugs(slugs: &[TopicSlug]) -> String {
    slugs
        .iter()
        .map(TopicSlug::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics_not_found_lists_every_missing_slug() {
        let err = SessionServiceError::TopicsNotFound(vec![
            TopicSlug::new("arithmetic"),
            TopicSlug::new("geometry"),
        ]);
        assert_eq!(err.to_string(), "topics not found: arithmetic, geometry");
    }
}
