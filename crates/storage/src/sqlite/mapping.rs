use sqlx::Row;

use practice_core::model::{
    AgentDecision, AgentFeedback, AgentTrace, Difficulty, Provenance, Question, QuestionId,
    QuestionKind, QuestionSession, QuestionSessionId, SessionId, Topic, TopicSlug, User, UserId,
    UserRole,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u8_from_i64(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn difficulty_from_i64(v: i64) -> Result<Difficulty, StorageError> {
    Difficulty::new(u8_from_i64("difficulty", v)?).map_err(ser)
}

pub(crate) fn user_id_from_str(s: &str) -> Result<UserId, StorageError> {
    s.parse::<UserId>().map_err(ser)
}

pub(crate) fn session_id_from_str(s: &str) -> Result<SessionId, StorageError> {
    s.parse::<SessionId>().map_err(ser)
}

pub(crate) fn question_session_id_from_str(s: &str) -> Result<QuestionSessionId, StorageError> {
    s.parse::<QuestionSessionId>().map_err(ser)
}

/// List-shaped fields are stored as JSON text columns.
pub(crate) fn strings_to_json(values: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(values).map_err(ser)
}

pub(crate) fn strings_from_json(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn slugs_to_json(slugs: &[TopicSlug]) -> Result<String, StorageError> {
    serde_json::to_string(slugs).map_err(ser)
}

pub(crate) fn slugs_from_json(raw: &str) -> Result<Vec<TopicSlug>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn parse_role(s: &str) -> Result<UserRole, StorageError> {
    UserRole::parse(s).ok_or_else(|| StorageError::Serialization(format!("invalid role: {s}")))
}

pub(crate) fn parse_kind(s: &str) -> Result<QuestionKind, StorageError> {
    QuestionKind::parse(s)
        .ok_or_else(|| StorageError::Serialization(format!("invalid question kind: {s}")))
}

pub(crate) fn parse_provenance(s: &str) -> Result<Provenance, StorageError> {
    Provenance::parse(s)
        .ok_or_else(|| StorageError::Serialization(format!("invalid provenance: {s}")))
}

pub(crate) fn map_user_row(row: &sqlx::sqlite::SqliteRow) -> Result<User, StorageError> {
    let id = user_id_from_str(row.try_get::<String, _>("id").map_err(ser)?.as_str())?;
    let role = parse_role(row.try_get::<String, _>("role").map_err(ser)?.as_str())?;
    let topics_history =
        slugs_from_json(row.try_get::<String, _>("topics_history").map_err(ser)?.as_str())?;

    Ok(User::from_persisted(
        id,
        row.try_get("full_name").map_err(ser)?,
        u8_from_i64("age", row.try_get::<i64, _>("age").map_err(ser)?)?,
        row.try_get("email").map_err(ser)?,
        row.try_get("password_hash").map_err(ser)?,
        role,
        topics_history,
    ))
}

pub(crate) fn map_topic_row(row: &sqlx::sqlite::SqliteRow) -> Result<Topic, StorageError> {
    let slug = TopicSlug::new(row.try_get::<String, _>("slug").map_err(ser)?);
    let min = difficulty_from_i64(row.try_get::<i64, _>("min_difficulty").map_err(ser)?)?;
    let max = difficulty_from_i64(row.try_get::<i64, _>("max_difficulty").map_err(ser)?)?;

    Ok(Topic {
        slug,
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        subtopics: strings_from_json(row.try_get::<String, _>("subtopics").map_err(ser)?.as_str())?,
        canonical_mental_skills: strings_from_json(
            row.try_get::<String, _>("canonical_mental_skills")
                .map_err(ser)?
                .as_str(),
        )?,
        min_difficulty: min,
        max_difficulty: max,
        tags: strings_from_json(row.try_get::<String, _>("tags").map_err(ser)?.as_str())?,
        created_by: row.try_get("created_by").map_err(ser)?,
        updated_by: row.try_get("updated_by").map_err(ser)?,
    })
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    Ok(Question {
        id: QuestionId::new(row.try_get::<String, _>("id").map_err(ser)?),
        text: row.try_get("text").map_err(ser)?,
        topic: TopicSlug::new(row.try_get::<String, _>("topic").map_err(ser)?),
        subtopic: row.try_get("subtopic").map_err(ser)?,
        difficulty: difficulty_from_i64(row.try_get::<i64, _>("difficulty").map_err(ser)?)?,
        kind: parse_kind(row.try_get::<String, _>("kind").map_err(ser)?.as_str())?,
        options: strings_from_json(row.try_get::<String, _>("options").map_err(ser)?.as_str())?,
        correct_answer: row.try_get("correct_answer").map_err(ser)?,
        answer_variants: strings_from_json(
            row.try_get::<String, _>("answer_variants").map_err(ser)?.as_str(),
        )?,
        tags: strings_from_json(row.try_get::<String, _>("tags").map_err(ser)?.as_str())?,
        mental_skills: strings_from_json(
            row.try_get::<String, _>("mental_skills").map_err(ser)?.as_str(),
        )?,
        hints: strings_from_json(row.try_get::<String, _>("hints").map_err(ser)?.as_str())?,
        strategy_tip: row.try_get("strategy_tip").map_err(ser)?,
        estimated_time: u32_from_i64(
            "estimated_time",
            row.try_get::<i64, _>("estimated_time").map_err(ser)?,
        )?,
        provenance: parse_provenance(
            row.try_get::<String, _>("provenance").map_err(ser)?.as_str(),
        )?,
        added_by_id: row.try_get("added_by_id").map_err(ser)?,
        added_by_name: row.try_get("added_by_name").map_err(ser)?,
        last_modified_by_id: row.try_get("last_modified_by_id").map_err(ser)?,
    })
}

pub(crate) fn map_question_session_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<QuestionSession, StorageError> {
    let id = question_session_id_from_str(row.try_get::<String, _>("id").map_err(ser)?.as_str())?;
    let correct: i64 = row.try_get("correct").map_err(ser)?;
    let attempt_number = row
        .try_get::<Option<i64>, _>("attempt_number")
        .map_err(ser)?
        .map(|n| u32_from_i64("attempt_number", n))
        .transpose()?;
    let agent_feedback = row
        .try_get::<Option<String>, _>("agent_feedback")
        .map_err(ser)?
        .map(|raw| serde_json::from_str::<AgentFeedback>(&raw).map_err(ser))
        .transpose()?;

    Ok(QuestionSession::from_persisted(
        id,
        QuestionId::new(row.try_get::<String, _>("question_id").map_err(ser)?),
        row.try_get("response").map_err(ser)?,
        correct != 0,
        u32_from_i64("time_taken", row.try_get::<i64, _>("time_taken").map_err(ser)?)?,
        row.try_get("timestamp").map_err(ser)?,
        attempt_number,
        agent_feedback,
        row.try_get("strategy_tip").map_err(ser)?,
        strings_from_json(row.try_get::<String, _>("answer_variants").map_err(ser)?.as_str())?,
    ))
}

pub(crate) fn map_decision_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<AgentDecision, StorageError> {
    let session_id =
        session_id_from_str(row.try_get::<String, _>("session_id").map_err(ser)?.as_str())?;
    let next_difficulty = row
        .try_get::<Option<i64>, _>("next_difficulty")
        .map_err(ser)?
        .map(difficulty_from_i64)
        .transpose()?;
    let trace: AgentTrace =
        serde_json::from_str(row.try_get::<String, _>("trace").map_err(ser)?.as_str())
            .map_err(ser)?;

    #[allow(clippy::cast_possible_truncation)]
    let mastery = row.try_get::<f64, _>("mastery").map_err(ser)? as f32;

    Ok(AgentDecision {
        id: Some(row.try_get("id").map_err(ser)?),
        session_id,
        prev_question_id: row
            .try_get::<Option<String>, _>("prev_question_id")
            .map_err(ser)?
            .map(QuestionId::new),
        next_question_id: row
            .try_get::<Option<String>, _>("next_question_id")
            .map_err(ser)?
            .map(QuestionId::new),
        next_difficulty,
        mastery,
        reason: row.try_get("reason").map_err(ser)?,
        trace,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}
