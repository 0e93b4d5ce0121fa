use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{TopicSlug, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("full name must not be empty")]
    EmptyName,

    #[error("invalid email: {0}")]
    InvalidEmail(String),
}

/// Account role. Ordering is by weight, so role checks compare ordinals
/// rather than matching on concrete variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Teacher,
    SystemAgent,
    Learner,
    Guest,
}

impl UserRole {
    /// Ordinal weight used for minimum-role checks. Higher grants more.
    #[must_use]
    pub fn weight(&self) -> u8 {
        match self {
            UserRole::Admin => 50,
            UserRole::Teacher => 40,
            UserRole::SystemAgent => 30,
            UserRole::Learner => 20,
            UserRole::Guest => 10,
        }
    }

    /// Returns true if this role meets or exceeds the given minimum.
    #[must_use]
    pub fn at_least(&self, min: UserRole) -> bool {
        self.weight() >= min.weight()
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Teacher => "teacher",
            UserRole::SystemAgent => "system_agent",
            UserRole::Learner => "learner",
            UserRole::Guest => "guest",
        }
    }

    /// Parses the storage representation produced by [`UserRole::as_str`].
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(UserRole::Admin),
            "teacher" => Some(UserRole::Teacher),
            "system_agent" => Some(UserRole::SystemAgent),
            "learner" => Some(UserRole::Learner),
            "guest" => Some(UserRole::Guest),
            _ => None,
        }
    }
}

/// Directory record for an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    full_name: String,
    age: u8,
    email: String,
    password_hash: String,
    role: UserRole,
    topics_history: Vec<TopicSlug>,
}

impl User {
    /// Create a user, validating name and email shape.
    ///
    /// # Errors
    ///
    /// Returns `UserError::EmptyName` or `UserError::InvalidEmail`.
    pub fn new(
        id: UserId,
        full_name: impl Into<String>,
        age: u8,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        role: UserRole,
    ) -> Result<Self, UserError> {
        let full_name = full_name.into();
        if full_name.trim().is_empty() {
            return Err(UserError::EmptyName);
        }
        let email = email.into();
        if !email.contains('@') {
            return Err(UserError::InvalidEmail(email));
        }

        Ok(Self {
            id,
            full_name,
            age,
            email,
            password_hash: password_hash.into(),
            role,
            topics_history: Vec::new(),
        })
    }

    /// Rehydrate a user from persisted storage without re-validating.
    #[must_use]
    pub fn from_persisted(
        id: UserId,
        full_name: String,
        age: u8,
        email: String,
        password_hash: String,
        role: UserRole,
        topics_history: Vec<TopicSlug>,
    ) -> Self {
        Self {
            id,
            full_name,
            age,
            email,
            password_hash,
            role,
            topics_history,
        }
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    #[must_use]
    pub fn age(&self) -> u8 {
        self.age
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    #[must_use]
    pub fn role(&self) -> UserRole {
        self.role
    }

    #[must_use]
    pub fn topics_history(&self) -> &[TopicSlug] {
        &self.topics_history
    }

    /// Record that the user practiced a topic. Keeps duplicates; history is
    /// a sequence of runs, not a set.
    pub fn push_topic_history(&mut self, slug: TopicSlug) {
        self.topics_history.push(slug);
    }

    /// Denormalized view returned alongside created sessions.
    #[must_use]
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Compact user view for session payloads. Never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
}
