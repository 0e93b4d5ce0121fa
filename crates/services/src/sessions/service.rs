use std::sync::Arc;

use tracing::{info, warn};

use practice_core::Clock;
use practice_core::model::{
    AgentDecision, AgentFeedback, AgentTrace, Difficulty, Question, QuestionId, QuestionSession,
    Session, SessionId, TopicSlug, UserId, UserSummary,
};
use storage::repository::{
    AgentDecisionRepository, QuestionCatalog, SessionRepository, Storage, StorageError,
    TopicCatalog, UserRepository,
};

use crate::agent::{AgentClient, AgentRequest};
use crate::error::SessionServiceError;
use super::dashboard::{Dashboard, build_dashboard};
use super::locks::SessionLocks;

/// How many sessions feed the dashboard aggregates.
pub const DASHBOARD_SESSION_LIMIT: u32 = 10;

/// Result of creating a session: the aggregate plus everything the client
/// needs to render the first question immediately.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub session: Session,
    pub user: UserSummary,
    pub question: Question,
}

/// The session's active question with its enrichment.
///
/// `question` is `None` when the catalog no longer resolves the stored id;
/// `decision` is `None` when no agent chose this question (e.g. the first
/// one of the run).
#[derive(Debug, Clone)]
pub struct CurrentQuestionView {
    pub session: Session,
    pub current: QuestionSession,
    pub question: Option<Question>,
    pub decision: Option<AgentDecision>,
}

/// Result of one answer submission.
#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub session: Session,
    pub answered: QuestionSession,
    pub next_question: Option<Question>,
    pub message: Option<String>,
    pub reflection_prompt: Option<String>,
    pub strategy_tip: Option<String>,
}

/// Orchestrates practice runs: creation, the current question, answer
/// progression through the agent, and dashboard aggregation.
pub struct SessionService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
    topics: Arc<dyn TopicCatalog>,
    questions: Arc<dyn QuestionCatalog>,
    sessions: Arc<dyn SessionRepository>,
    decisions: Arc<dyn AgentDecisionRepository>,
    agent: Arc<dyn AgentClient>,
    locks: SessionLocks,
}

impl SessionService {
    #[must_use]
    pub fn new(clock: Clock, storage: &Storage, agent: Arc<dyn AgentClient>) -> Self {
        Self {
            clock,
            users: Arc::clone(&storage.users),
            topics: Arc::clone(&storage.topics),
            questions: Arc::clone(&storage.questions),
            sessions: Arc::clone(&storage.sessions),
            decisions: Arc::clone(&storage.decisions),
            agent,
            locks: SessionLocks::new(),
        }
    }

    /// Start a session for the learner over the requested topics.
    ///
    /// Every slug must resolve to an existing topic; the initial question
    /// is the easiest one available for the first topic. The session and
    /// its first attempt entry are persisted atomically.
    ///
    /// # Errors
    ///
    /// `UserNotFound` for an unknown learner, `TopicsNotFound` naming every
    /// missing slug, `NoQuestionsForTopic` when the catalog has nothing for
    /// the first topic, plus storage failures.
    pub async fn create(
        &self,
        user_id: UserId,
        topic_order: Vec<TopicSlug>,
    ) -> Result<CreatedSession, SessionServiceError> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(SessionServiceError::UserNotFound(user_id))?;

        let existing = self.topics.existing_slugs(&topic_order).await?;
        let missing: Vec<TopicSlug> = topic_order
            .iter()
            .filter(|slug| !existing.contains(*slug))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(SessionServiceError::TopicsNotFound(missing));
        }

        let Some(first_topic) = topic_order.first() else {
            return Err(practice_core::model::SessionError::EmptyTopicOrder.into());
        };
        let question = self
            .questions
            .easiest_question_for_topic(first_topic)
            .await?
            .ok_or_else(|| SessionServiceError::NoQuestionsForTopic(first_topic.clone()))?;

        let now = self.clock.now();
        let session = Session::start(
            SessionId::generate(),
            user.id(),
            topic_order,
            question.id.clone(),
            now,
        )?;
        self.sessions.create_session(&session).await?;

        info!(
            target: "sessions",
            session_id = %session.id(),
            user_id = %user.id(),
            first_question = %question.id,
            "session created"
        );

        Ok(CreatedSession {
            session,
            user: user.summary(),
            question,
        })
    }

    /// Load a session with children, newest-entry-is-current semantics.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` when the id does not resolve.
    pub async fn find(&self, session_id: SessionId) -> Result<Session, SessionServiceError> {
        self.sessions
            .get_session(session_id)
            .await?
            .ok_or(SessionServiceError::SessionNotFound(session_id))
    }

    /// List all sessions with children loaded.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub async fn list(&self) -> Result<Vec<Session>, SessionServiceError> {
        Ok(self.sessions.list_sessions().await?)
    }

    /// Delete a session and its attempt log.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` when the id does not resolve.
    pub async fn delete(&self, session_id: SessionId) -> Result<(), SessionServiceError> {
        match self.sessions.delete_session(session_id).await {
            Ok(()) => {
                self.locks.forget(session_id);
                Ok(())
            }
            Err(StorageError::NotFound) => Err(SessionServiceError::SessionNotFound(session_id)),
            Err(e) => Err(e.into()),
        }
    }

    /// The current question with its catalog document and the agent
    /// decision that chose it.
    ///
    /// The catalog lookup fails softly: a stale question id surfaces as
    /// `question: None`, not an error. A missing decision is normal for the
    /// session's very first question.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` when the id does not resolve; `NoCurrentQuestion`
    /// when the attempt log is empty.
    pub async fn current_question(
        &self,
        session_id: SessionId,
    ) -> Result<CurrentQuestionView, SessionServiceError> {
        let session = self.find(session_id).await?;
        let current = session
            .current_question_session()
            .cloned()
            .ok_or(SessionServiceError::NoCurrentQuestion)?;

        let question = self.questions.get_question(current.question_id()).await?;
        if question.is_none() {
            warn!(
                target: "sessions",
                session_id = %session_id,
                question_id = %current.question_id(),
                "current question no longer resolves in catalog"
            );
        }

        let decision = self
            .decisions
            .latest_for_next_question(session_id, current.question_id())
            .await?;

        Ok(CurrentQuestionView {
            session,
            current,
            question,
            decision,
        })
    }

    /// Submit the answer for the session's current question.
    ///
    /// Serialized per session id. Correctness is exact string equality with
    /// the canonical answer. The answered entry is persisted before the
    /// agent is consulted; an incorrect answer short-circuits with no agent
    /// call and no new entry. On a correct answer the agent's choice is
    /// appended as a fresh entry and audited as an `AgentDecision`.
    ///
    /// # Errors
    ///
    /// `SessionNotFound` / `NoCurrentQuestion` / `QuestionNotFound` for
    /// lookup failures, `Agent` when the agent call fails (the recorded
    /// answer stands), plus storage failures.
    pub async fn answer_current(
        &self,
        session_id: SessionId,
        response: String,
        time_taken: u32,
    ) -> Result<AnswerOutcome, SessionServiceError> {
        let lock = self.locks.lock_for(session_id);
        let _serialized = lock.lock().await;

        let mut session = self.find(session_id).await?;
        let current = session
            .current_question_session()
            .ok_or(SessionServiceError::NoCurrentQuestion)?;
        let question = self
            .questions
            .get_question(current.question_id())
            .await?
            .ok_or_else(|| {
                SessionServiceError::QuestionNotFound(current.question_id().clone())
            })?;

        let correct = question.check_answer(&response);
        session.record_answer(response, time_taken, correct)?;
        let answered = session
            .current_question_session()
            .cloned()
            .ok_or(SessionServiceError::NoCurrentQuestion)?;
        self.sessions
            .update_question_session(session_id, &answered)
            .await?;

        info!(
            target: "sessions",
            session_id = %session_id,
            question_id = %question.id,
            correct,
            time_taken,
            "answer recorded"
        );

        if !correct {
            return Ok(AnswerOutcome {
                session,
                answered,
                next_question: None,
                message: None,
                reflection_prompt: None,
                strategy_tip: None,
            });
        }

        let request = AgentRequest {
            question_id: question.id.to_string(),
            topic: question.topic.to_string(),
            sub_topic: question.subtopic.clone(),
            difficulty: question.difficulty.value(),
            was_correct: correct,
            time_taken,
            estimated_time: Some(question.estimated_time),
            answer: Some(answered.response().to_string()),
            session_id: session_id.to_string(),
            user_id: session.user_id().to_string(),
        };
        let reply = self.agent.suggest_next(&request).await?;

        let now = self.clock.now();
        let trace = AgentTrace::new(
            serde_json::to_string(&request)
                .map_err(|e| StorageError::Serialization(e.to_string()))?,
            serde_json::to_string(&reply)
                .map_err(|e| StorageError::Serialization(e.to_string()))?,
        );

        if reply.message.is_some() || reply.reflection_prompt.is_some() {
            session.record_agent_feedback(AgentFeedback::new(
                reply.message.clone().unwrap_or_default(),
                reply.reflection_prompt.clone(),
                reply.strategy_tip.clone(),
            ))?;
            let enriched = session
                .current_question_session()
                .cloned()
                .ok_or(SessionServiceError::NoCurrentQuestion)?;
            self.sessions
                .update_question_session(session_id, &enriched)
                .await?;
        }
        let answered = session
            .current_question_session()
            .cloned()
            .ok_or(SessionServiceError::NoCurrentQuestion)?;

        let next_id = reply.next_question_id.as_deref().map(QuestionId::new);
        let mut next_question = match &next_id {
            Some(id) => {
                let resolved = self.questions.get_question(id).await?;
                if resolved.is_none() {
                    warn!(
                        target: "sessions",
                        session_id = %session_id,
                        question_id = %id,
                        "agent chose a question the catalog does not resolve"
                    );
                }
                resolved
            }
            None => None,
        };

        if let Some(id) = &next_id {
            let entry = session
                .append_question(id.clone(), next_question.as_ref(), now)
                .clone();
            self.sessions
                .append_question_session(&session, &entry)
                .await?;
        } else {
            warn!(
                target: "sessions",
                session_id = %session_id,
                "agent declined to pick a next question"
            );
        }

        let decision = AgentDecision {
            id: None,
            session_id,
            prev_question_id: Some(question.id.clone()),
            next_question_id: next_id,
            next_difficulty: reply
                .next_difficulty
                .and_then(|d| Difficulty::new(d).ok()),
            mastery: reply.mastery.unwrap_or(0.0),
            reason: reply
                .reason
                .clone()
                .unwrap_or_else(|| "next-question".into()),
            trace,
            created_at: now,
        };
        self.decisions.append_decision(&decision).await?;

        if let Some(question) = next_question.as_mut() {
            if reply.strategy_tip.is_some() {
                question.strategy_tip = reply.strategy_tip.clone();
            }
        }

        Ok(AnswerOutcome {
            session,
            answered,
            next_question,
            message: reply.message,
            reflection_prompt: reply.reflection_prompt,
            strategy_tip: reply.strategy_tip,
        })
    }

    /// Aggregate the learner's recent sessions for charting.
    ///
    /// # Errors
    ///
    /// `UserNotFound` for an unknown learner, plus storage failures.
    pub async fn dashboard(
        &self,
        user_id: UserId,
        topic: Option<TopicSlug>,
    ) -> Result<Dashboard, SessionServiceError> {
        if self.users.get_user(user_id).await?.is_none() {
            return Err(SessionServiceError::UserNotFound(user_id));
        }

        let sessions = self
            .sessions
            .recent_sessions_for_user(user_id, topic.as_ref(), DASHBOARD_SESSION_LIMIT)
            .await?;
        Ok(build_dashboard(&sessions))
    }
}
