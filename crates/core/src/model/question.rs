use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{QuestionId, TopicSlug};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("difficulty {0} is outside 1..=5")]
    DifficultyOutOfRange(u8),

    #[error("question text must not be empty")]
    EmptyText,
}

/// Difficulty level, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Difficulty(u8);

impl Difficulty {
    pub const MIN: Difficulty = Difficulty(1);
    pub const MAX: Difficulty = Difficulty(5);

    /// Create a difficulty level.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::DifficultyOutOfRange` for values outside 1..=5.
    pub fn new(value: u8) -> Result<Self, QuestionError> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(QuestionError::DifficultyOutOfRange(value))
        }
    }

    #[must_use]
    pub fn value(&self) -> u8 {
        self.0
    }
}

/// How a question expects to be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice,
    FreeText,
    Numeric,
    TrueFalse,
}

impl QuestionKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple-choice",
            QuestionKind::FreeText => "free-text",
            QuestionKind::Numeric => "numeric",
            QuestionKind::TrueFalse => "true-false",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "multiple-choice" => Some(QuestionKind::MultipleChoice),
            "free-text" => Some(QuestionKind::FreeText),
            "numeric" => Some(QuestionKind::Numeric),
            "true-false" => Some(QuestionKind::TrueFalse),
            _ => None,
        }
    }
}

/// Where a question came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    Programmatic,
    Curated,
    LlmAssisted,
}

impl Provenance {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Programmatic => "programmatic",
            Provenance::Curated => "curated",
            Provenance::LlmAssisted => "llm-assisted",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "programmatic" => Some(Provenance::Programmatic),
            "curated" => Some(Provenance::Curated),
            "llm-assisted" => Some(Provenance::LlmAssisted),
            _ => None,
        }
    }
}

/// Default estimated solve time when a question does not carry one.
pub const DEFAULT_ESTIMATED_TIME_SECS: u32 = 60;

/// Catalog document for a single practice question.
///
/// Lives in the catalog store with a lifecycle independent of sessions;
/// session history references it by opaque id only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub topic: TopicSlug,
    pub subtopic: Option<String>,
    pub difficulty: Difficulty,
    pub kind: QuestionKind,
    /// Choices for multiple-choice questions; empty otherwise.
    pub options: Vec<String>,
    pub correct_answer: String,
    /// Accepted alternative spellings of the canonical answer.
    pub answer_variants: Vec<String>,
    pub tags: Vec<String>,
    pub mental_skills: Vec<String>,
    pub hints: Vec<String>,
    pub strategy_tip: Option<String>,
    /// Estimated seconds to solve.
    pub estimated_time: u32,
    pub provenance: Provenance,
    pub added_by_id: String,
    pub added_by_name: Option<String>,
    pub last_modified_by_id: Option<String>,
}

impl Question {
    /// Create a question with the common defaults.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` if the prompt text is blank.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        topic: TopicSlug,
        difficulty: Difficulty,
        kind: QuestionKind,
        correct_answer: impl Into<String>,
        added_by_id: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }

        Ok(Self {
            id,
            text,
            topic,
            subtopic: None,
            difficulty,
            kind,
            options: Vec::new(),
            correct_answer: correct_answer.into(),
            answer_variants: Vec::new(),
            tags: Vec::new(),
            mental_skills: Vec::new(),
            hints: Vec::new(),
            strategy_tip: None,
            estimated_time: DEFAULT_ESTIMATED_TIME_SECS,
            provenance: Provenance::Curated,
            added_by_id: added_by_id.into(),
            added_by_name: None,
            last_modified_by_id: None,
        })
    }

    /// Judge a submitted response against the canonical answer.
    ///
    /// Exact string equality. No trimming, no case folding, no numeric
    /// equivalence; `"42"` and `"42 "` do not match.
    #[must_use]
    pub fn check_answer(&self, response: &str) -> bool {
        response == self.correct_answer
    }
}
