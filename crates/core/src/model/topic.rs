use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Difficulty, TopicSlug};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopicError {
    #[error("topic slug must not be empty")]
    EmptySlug,

    #[error("topic title must not be empty")]
    EmptyTitle,

    #[error("invalid difficulty range: min {min} > max {max}")]
    InvalidDifficultyRange { min: u8, max: u8 },
}

/// Catalog document describing a subject area questions are tagged with.
///
/// The slug is the topic's identity and is referenced by value from
/// questions and from `Session::topic_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub slug: TopicSlug,
    pub title: String,
    pub description: Option<String>,
    /// Ordered, e.g. ["Multiplication", "Estimation"].
    pub subtopics: Vec<String>,
    /// Canonical mental-skill tags, e.g. ["chunking", "complements"].
    pub canonical_mental_skills: Vec<String>,
    pub min_difficulty: Difficulty,
    pub max_difficulty: Difficulty,
    /// Synonyms or alternate groupings.
    pub tags: Vec<String>,
    pub created_by: String,
    pub updated_by: Option<String>,
}

impl Topic {
    /// Create a topic, validating the slug, title and difficulty range.
    ///
    /// # Errors
    ///
    /// Returns `TopicError` when the slug/title is empty or min > max.
    pub fn new(
        slug: TopicSlug,
        title: impl Into<String>,
        min_difficulty: Difficulty,
        max_difficulty: Difficulty,
        created_by: impl Into<String>,
    ) -> Result<Self, TopicError> {
        if slug.is_empty() {
            return Err(TopicError::EmptySlug);
        }
        let title = title.into();
        if title.trim().is_empty() {
            return Err(TopicError::EmptyTitle);
        }
        if min_difficulty.value() > max_difficulty.value() {
            return Err(TopicError::InvalidDifficultyRange {
                min: min_difficulty.value(),
                max: max_difficulty.value(),
            });
        }

        Ok(Self {
            slug,
            title,
            description: None,
            subtopics: Vec::new(),
            canonical_mental_skills: Vec::new(),
            min_difficulty,
            max_difficulty,
            tags: Vec::new(),
            created_by: created_by.into(),
            updated_by: None,
        })
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_subtopics(mut self, subtopics: Vec<String>) -> Self {
        self.subtopics = subtopics;
        self
    }

    #[must_use]
    pub fn with_mental_skills(mut self, skills: Vec<String>) -> Self {
        self.canonical_mental_skills = skills;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_topic_with_defaults() {
        let topic = Topic::new(
            TopicSlug::new("arithmetic"),
            "Arithmetic",
            Difficulty::new(1).unwrap(),
            Difficulty::new(5).unwrap(),
            "system",
        )
        .unwrap();

        assert_eq!(topic.slug.as_str(), "arithmetic");
        assert!(topic.subtopics.is_empty());
        assert_eq!(topic.updated_by, None);
    }

    #[test]
    fn rejects_inverted_difficulty_range() {
        let err = Topic::new(
            TopicSlug::new("algebra"),
            "Algebra",
            Difficulty::new(4).unwrap(),
            Difficulty::new(2).unwrap(),
            "system",
        )
        .unwrap_err();

        assert_eq!(err, TopicError::InvalidDifficultyRange { min: 4, max: 2 });
    }

    #[test]
    fn rejects_empty_slug() {
        let err = Topic::new(
            TopicSlug::new(""),
            "Mystery",
            Difficulty::new(1).unwrap(),
            Difficulty::new(5).unwrap(),
            "system",
        )
        .unwrap_err();
        assert_eq!(err, TopicError::EmptySlug);
    }
}
