use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use practice_core::model::{
    AgentDecision, Difficulty, Question, QuestionId, QuestionSession, Session, SessionId, Topic,
    TopicSlug, User, UserId,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for the user directory.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist a new user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id or email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StorageError>;

    /// Fetch a user by id. `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// Look a user up by unique email.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;

    /// Persist profile changes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    async fn update_user(&self, user: &User) -> Result<(), StorageError>;

    /// Remove a user (explicit admin removal only).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    async fn delete_user(&self, id: UserId) -> Result<(), StorageError>;
}

/// Catalog contract for topics.
#[async_trait]
pub trait TopicCatalog: Send + Sync {
    /// Insert or replace a topic document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the topic cannot be stored.
    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError>;

    /// Fetch a topic by slug. `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_topic(&self, slug: &TopicSlug) -> Result<Option<Topic>, StorageError>;

    /// Of the given slugs, return those that exist in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn existing_slugs(&self, slugs: &[TopicSlug]) -> Result<Vec<TopicSlug>, StorageError>;

    /// List all topics.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_topics(&self) -> Result<Vec<Topic>, StorageError>;
}

/// Catalog contract for questions.
///
/// Question ids are weak references: callers must tolerate `None` from
/// lookups, since session history and the catalog are not transactionally
/// linked.
#[async_trait]
pub trait QuestionCatalog: Send + Sync {
    /// Insert or replace a question document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// Fetch a question by opaque id. `None` when absent or stale.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_question(&self, id: &QuestionId) -> Result<Option<Question>, StorageError>;

    /// Pick a question for the topic at the lowest available difficulty.
    ///
    /// The tie-break among equally easy questions is arbitrary and not
    /// guaranteed stable across calls.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn easiest_question_for_topic(
        &self,
        topic: &TopicSlug,
    ) -> Result<Option<Question>, StorageError>;

    /// Randomly sample a question at the given topic and difficulty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn sample_question(
        &self,
        topic: &TopicSlug,
        difficulty: Difficulty,
    ) -> Result<Option<Question>, StorageError>;

    /// List every question tagged with the topic.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_questions_for_topic(
        &self,
        topic: &TopicSlug,
    ) -> Result<Vec<Question>, StorageError>;
}

/// Repository contract for the session aggregate.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a new session together with its first attempt entry.
    ///
    /// The session row and its child are written in one transaction; a
    /// crash can never leave a session without its first question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the session id is taken.
    async fn create_session(&self, session: &Session) -> Result<(), StorageError>;

    /// Load a session with its children in append order. `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StorageError>;

    /// List all sessions with children loaded.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_sessions(&self) -> Result<Vec<Session>, StorageError>;

    /// Persist an in-place mutation of one attempt entry (the answer).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the entry does not exist.
    async fn update_question_session(
        &self,
        session_id: SessionId,
        entry: &QuestionSession,
    ) -> Result<(), StorageError>;

    /// Persist a newly appended attempt entry and the session's rollups.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist.
    async fn append_question_session(
        &self,
        session: &Session,
        entry: &QuestionSession,
    ) -> Result<(), StorageError>;

    /// The user's most recent sessions, newest first, children loaded.
    ///
    /// With a topic filter, only sessions whose topic order contains the
    /// slug are returned.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn recent_sessions_for_user(
        &self,
        user_id: UserId,
        topic: Option<&TopicSlug>,
        limit: u32,
    ) -> Result<Vec<Session>, StorageError>;

    /// Remove a session and its children. The only path that shrinks an
    /// attempt log.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist.
    async fn delete_session(&self, id: SessionId) -> Result<(), StorageError>;
}

/// Repository contract for the agent audit trail.
#[async_trait]
pub trait AgentDecisionRepository: Send + Sync {
    /// Append a write-once decision row, returning its storage id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn append_decision(&self, decision: &AgentDecision) -> Result<i64, StorageError>;

    /// The most recent decision that chose the given question for the
    /// session, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn latest_for_next_question(
        &self,
        session_id: SessionId,
        next_question_id: &QuestionId,
    ) -> Result<Option<AgentDecision>, StorageError>;

    /// All decisions recorded for a session, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AgentDecision>, StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

/// Simple in-memory store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    users: Arc<Mutex<HashMap<UserId, User>>>,
    topics: Arc<Mutex<HashMap<TopicSlug, Topic>>>,
    questions: Arc<Mutex<HashMap<QuestionId, Question>>>,
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
    decisions: Arc<Mutex<Vec<AgentDecision>>>,
}

impl InMemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock<'a, T>(
        mutex: &'a Mutex<T>,
    ) -> Result<std::sync::MutexGuard<'a, T>, StorageError> {
        mutex
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl UserRepository for InMemoryStorage {
    async fn insert_user(&self, user: &User) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.users)?;
        if guard.contains_key(&user.id()) || guard.values().any(|u| u.email() == user.email()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(user.id(), user.clone());
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        Ok(Self::lock(&self.users)?.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        Ok(Self::lock(&self.users)?
            .values()
            .find(|u| u.email() == email)
            .cloned())
    }

    async fn update_user(&self, user: &User) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.users)?;
        if !guard.contains_key(&user.id()) {
            return Err(StorageError::NotFound);
        }
        guard.insert(user.id(), user.clone());
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StorageError> {
        Self::lock(&self.users)?
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl TopicCatalog for InMemoryStorage {
    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError> {
        Self::lock(&self.topics)?.insert(topic.slug.clone(), topic.clone());
        Ok(())
    }

    async fn get_topic(&self, slug: &TopicSlug) -> Result<Option<Topic>, StorageError> {
        Ok(Self::lock(&self.topics)?.get(slug).cloned())
    }

    async fn existing_slugs(&self, slugs: &[TopicSlug]) -> Result<Vec<TopicSlug>, StorageError> {
        let guard = Self::lock(&self.topics)?;
        Ok(slugs
            .iter()
            .filter(|slug| guard.contains_key(*slug))
            .cloned()
            .collect())
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, StorageError> {
        let mut topics: Vec<Topic> = Self::lock(&self.topics)?.values().cloned().collect();
        topics.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(topics)
    }
}

#[async_trait]
impl QuestionCatalog for InMemoryStorage {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        Self::lock(&self.questions)?.insert(question.id.clone(), question.clone());
        Ok(())
    }

    async fn get_question(&self, id: &QuestionId) -> Result<Option<Question>, StorageError> {
        Ok(Self::lock(&self.questions)?.get(id).cloned())
    }

    async fn easiest_question_for_topic(
        &self,
        topic: &TopicSlug,
    ) -> Result<Option<Question>, StorageError> {
        let guard = Self::lock(&self.questions)?;
        Ok(guard
            .values()
            .filter(|q| &q.topic == topic)
            .min_by_key(|q| q.difficulty)
            .cloned())
    }

    async fn sample_question(
        &self,
        topic: &TopicSlug,
        difficulty: Difficulty,
    ) -> Result<Option<Question>, StorageError> {
        let guard = Self::lock(&self.questions)?;
        Ok(guard
            .values()
            .find(|q| &q.topic == topic && q.difficulty == difficulty)
            .cloned())
    }

    async fn list_questions_for_topic(
        &self,
        topic: &TopicSlug,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = Self::lock(&self.questions)?;
        let mut questions: Vec<Question> =
            guard.values().filter(|q| &q.topic == topic).cloned().collect();
        questions.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(questions)
    }
}

#[async_trait]
impl SessionRepository for InMemoryStorage {
    async fn create_session(&self, session: &Session) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.sessions)?;
        if guard.contains_key(&session.id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(session.id(), session.clone());
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StorageError> {
        Ok(Self::lock(&self.sessions)?.get(&id).cloned())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, StorageError> {
        let mut sessions: Vec<Session> = Self::lock(&self.sessions)?.values().cloned().collect();
        sessions.sort_by_key(|s| (s.start_time(), s.id()));
        Ok(sessions)
    }

    async fn update_question_session(
        &self,
        session_id: SessionId,
        entry: &QuestionSession,
    ) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.sessions)?;
        let session = guard.get_mut(&session_id).ok_or(StorageError::NotFound)?;

        let questions: Vec<QuestionSession> = session
            .questions()
            .iter()
            .map(|q| {
                if q.id() == entry.id() {
                    entry.clone()
                } else {
                    q.clone()
                }
            })
            .collect();
        if !questions.iter().any(|q| q.id() == entry.id()) {
            return Err(StorageError::NotFound);
        }

        *session = rebuild_with_questions(session, questions);
        Ok(())
    }

    async fn append_question_session(
        &self,
        session: &Session,
        entry: &QuestionSession,
    ) -> Result<(), StorageError> {
        let mut guard = Self::lock(&self.sessions)?;
        let stored = guard.get_mut(&session.id()).ok_or(StorageError::NotFound)?;
        let mut questions: Vec<QuestionSession> = stored.questions().to_vec();
        questions.push(entry.clone());
        *stored = rebuild_with_questions(session, questions);
        Ok(())
    }

    async fn recent_sessions_for_user(
        &self,
        user_id: UserId,
        topic: Option<&TopicSlug>,
        limit: u32,
    ) -> Result<Vec<Session>, StorageError> {
        let guard = Self::lock(&self.sessions)?;
        let mut sessions: Vec<Session> = guard
            .values()
            .filter(|s| s.user_id() == user_id)
            .filter(|s| topic.is_none_or(|slug| s.topic_order().contains(slug)))
            .cloned()
            .collect();
        sessions.sort_by_key(|s| std::cmp::Reverse(s.start_time()));
        sessions.truncate(limit as usize);
        Ok(sessions)
    }

    async fn delete_session(&self, id: SessionId) -> Result<(), StorageError> {
        Self::lock(&self.sessions)?
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

fn rebuild_with_questions(session: &Session, questions: Vec<QuestionSession>) -> Session {
    let mut rebuilt = Session::from_persisted(
        session.id(),
        session.user_id(),
        session.topic_order().to_vec(),
        session.start_time(),
        session.end_time(),
        questions,
        session.total_score(),
        session.total_correct(),
        session.total_questions(),
    );
    rebuilt.refresh_totals();
    rebuilt
}

#[async_trait]
impl AgentDecisionRepository for InMemoryStorage {
    async fn append_decision(&self, decision: &AgentDecision) -> Result<i64, StorageError> {
        let mut guard = Self::lock(&self.decisions)?;
        let id = i64::try_from(guard.len() + 1)
            .map_err(|_| StorageError::Serialization("decision id overflow".into()))?;
        let mut stored = decision.clone();
        stored.id = Some(id);
        guard.push(stored);
        Ok(id)
    }

    async fn latest_for_next_question(
        &self,
        session_id: SessionId,
        next_question_id: &QuestionId,
    ) -> Result<Option<AgentDecision>, StorageError> {
        let guard = Self::lock(&self.decisions)?;
        Ok(guard
            .iter()
            .filter(|d| {
                d.session_id == session_id
                    && d.next_question_id.as_ref() == Some(next_question_id)
            })
            .max_by_key(|d| (d.created_at, d.id))
            .cloned())
    }

    async fn list_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AgentDecision>, StorageError> {
        let guard = Self::lock(&self.decisions)?;
        Ok(guard
            .iter()
            .filter(|d| d.session_id == session_id)
            .cloned()
            .collect())
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub topics: Arc<dyn TopicCatalog>,
    pub questions: Arc<dyn QuestionCatalog>,
    pub sessions: Arc<dyn SessionRepository>,
    pub decisions: Arc<dyn AgentDecisionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryStorage::new();
        Self {
            users: Arc::new(repo.clone()),
            topics: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            sessions: Arc::new(repo.clone()),
            decisions: Arc::new(repo),
        }
    }
}
