use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::{
    AgentFeedback, Question, QuestionId, QuestionSessionId, SessionId, TopicSlug, UserId,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("topic order must not be empty")]
    EmptyTopicOrder,

    #[error("no current question in session")]
    NoCurrentQuestion,
}

/// Soft deadline applied to every practice run.
#[must_use]
pub fn session_duration() -> Duration {
    Duration::hours(1)
}

/// One attempt record within a session: one question, one answer.
///
/// Entries are append-only. Answering mutates the current (last) entry in
/// place; history before it is never touched.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionSession {
    id: QuestionSessionId,
    question_id: QuestionId,
    response: String,
    correct: bool,
    time_taken: u32,
    timestamp: DateTime<Utc>,
    attempt_number: Option<u32>,
    agent_feedback: Option<AgentFeedback>,
    strategy_tip: Option<String>,
    answer_variants: Vec<String>,
}

impl QuestionSession {
    fn fresh(question_id: QuestionId, now: DateTime<Utc>) -> Self {
        Self {
            id: QuestionSessionId::generate(),
            question_id,
            response: String::new(),
            correct: false,
            time_taken: 0,
            timestamp: now,
            attempt_number: None,
            agent_feedback: None,
            strategy_tip: None,
            answer_variants: Vec::new(),
        }
    }

    /// Rehydrate an attempt record from persisted storage.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_persisted(
        id: QuestionSessionId,
        question_id: QuestionId,
        response: String,
        correct: bool,
        time_taken: u32,
        timestamp: DateTime<Utc>,
        attempt_number: Option<u32>,
        agent_feedback: Option<AgentFeedback>,
        strategy_tip: Option<String>,
        answer_variants: Vec<String>,
    ) -> Self {
        Self {
            id,
            question_id,
            response,
            correct,
            time_taken,
            timestamp,
            attempt_number,
            agent_feedback,
            strategy_tip,
            answer_variants,
        }
    }

    #[must_use]
    pub fn id(&self) -> QuestionSessionId {
        self.id
    }

    #[must_use]
    pub fn question_id(&self) -> &QuestionId {
        &self.question_id
    }

    #[must_use]
    pub fn response(&self) -> &str {
        &self.response
    }

    #[must_use]
    pub fn correct(&self) -> bool {
        self.correct
    }

    /// Seconds the learner spent on this question.
    #[must_use]
    pub fn time_taken(&self) -> u32 {
        self.time_taken
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn attempt_number(&self) -> Option<u32> {
        self.attempt_number
    }

    #[must_use]
    pub fn agent_feedback(&self) -> Option<&AgentFeedback> {
        self.agent_feedback.as_ref()
    }

    #[must_use]
    pub fn strategy_tip(&self) -> Option<&str> {
        self.strategy_tip.as_deref()
    }

    #[must_use]
    pub fn answer_variants(&self) -> &[String] {
        &self.answer_variants
    }

    /// An entry counts as answered once a response has been recorded.
    #[must_use]
    pub fn is_answered(&self) -> bool {
        !self.response.is_empty()
    }
}

/// One learner's timed practice run across an ordered set of topics.
///
/// Owns the append-only `QuestionSession` log; the last entry is the
/// current question, everywhere (retrieval, answering, dashboards).
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: SessionId,
    user_id: UserId,
    topic_order: Vec<TopicSlug>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    questions: Vec<QuestionSession>,
    total_score: Option<u32>,
    total_correct: Option<u32>,
    total_questions: Option<u32>,
}

impl Session {
    /// Start a session with its first, unanswered question.
    ///
    /// The end time is fixed at start + [`session_duration`].
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptyTopicOrder` if no topics were requested.
    pub fn start(
        id: SessionId,
        user_id: UserId,
        topic_order: Vec<TopicSlug>,
        first_question: QuestionId,
        now: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if topic_order.is_empty() {
            return Err(SessionError::EmptyTopicOrder);
        }

        Ok(Self {
            id,
            user_id,
            topic_order,
            start_time: now,
            end_time: now + session_duration(),
            questions: vec![QuestionSession::fresh(first_question, now)],
            total_score: None,
            total_correct: None,
            total_questions: None,
        })
    }

    /// Rehydrate a session from persisted storage.
    ///
    /// `questions` must already be in append order.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn from_persisted(
        id: SessionId,
        user_id: UserId,
        topic_order: Vec<TopicSlug>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        questions: Vec<QuestionSession>,
        total_score: Option<u32>,
        total_correct: Option<u32>,
        total_questions: Option<u32>,
    ) -> Self {
        Self {
            id,
            user_id,
            topic_order,
            start_time,
            end_time,
            questions,
            total_score,
            total_correct,
            total_questions,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn topic_order(&self) -> &[TopicSlug] {
        &self.topic_order
    }

    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    #[must_use]
    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    #[must_use]
    pub fn questions(&self) -> &[QuestionSession] {
        &self.questions
    }

    #[must_use]
    pub fn total_score(&self) -> Option<u32> {
        self.total_score
    }

    #[must_use]
    pub fn total_correct(&self) -> Option<u32> {
        self.total_correct
    }

    #[must_use]
    pub fn total_questions(&self) -> Option<u32> {
        self.total_questions
    }

    /// The active attempt: the most recently appended log entry.
    #[must_use]
    pub fn current_question_session(&self) -> Option<&QuestionSession> {
        self.questions.last()
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.questions.iter().filter(|q| q.correct).count()
    }

    /// Total seconds spent across all answered questions.
    #[must_use]
    pub fn total_time_secs(&self) -> u64 {
        self.questions.iter().map(|q| u64::from(q.time_taken)).sum()
    }

    /// Wall-clock length of the run in whole minutes.
    #[must_use]
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// Record the learner's answer on the current question.
    ///
    /// Mutates the last log entry in place and bumps its attempt counter;
    /// re-answering an already answered current entry overwrites it, which
    /// is the only escape from an incorrect answer since the agent is not
    /// consulted on failure.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoCurrentQuestion` if the log is empty.
    pub fn record_answer(
        &mut self,
        response: impl Into<String>,
        time_taken: u32,
        correct: bool,
    ) -> Result<&QuestionSession, SessionError> {
        let current = self
            .questions
            .last_mut()
            .ok_or(SessionError::NoCurrentQuestion)?;

        current.response = response.into();
        current.time_taken = time_taken;
        current.correct = correct;
        current.attempt_number = Some(current.attempt_number.map_or(1, |n| n + 1));

        Ok(&*current)
    }

    /// Attach the agent's feedback to the current (just answered) entry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoCurrentQuestion` if the log is empty.
    pub fn record_agent_feedback(
        &mut self,
        feedback: AgentFeedback,
    ) -> Result<(), SessionError> {
        let current = self
            .questions
            .last_mut()
            .ok_or(SessionError::NoCurrentQuestion)?;
        current.agent_feedback = Some(feedback);
        Ok(())
    }

    /// Append a fresh, unanswered attempt for the given question id.
    ///
    /// The id is a weak reference into the catalog store; when the question
    /// resolved, pass it to snapshot its accepted variants and strategy tip.
    pub fn append_question(
        &mut self,
        question_id: QuestionId,
        resolved: Option<&Question>,
        now: DateTime<Utc>,
    ) -> &QuestionSession {
        let mut entry = QuestionSession::fresh(question_id, now);
        if let Some(question) = resolved {
            entry.answer_variants = question.answer_variants.clone();
            entry.strategy_tip = question.strategy_tip.clone();
        }
        self.questions.push(entry);
        self.refresh_totals();
        &self.questions[self.questions.len() - 1]
    }

    /// Recompute the denormalized rollup counters from the log.
    pub fn refresh_totals(&mut self) {
        self.total_questions = u32::try_from(self.question_count()).ok();
        self.total_correct = u32::try_from(self.correct_count()).ok();
    }
}
