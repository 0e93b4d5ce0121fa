use practice_core::model::{Difficulty, Question, QuestionId, TopicSlug};

use super::{SqliteRepository, mapping};
use crate::repository::{QuestionCatalog, StorageError};

const QUESTION_COLUMNS: &str = r"
    id, text, topic, subtopic, difficulty, kind, options, correct_answer,
    answer_variants, tags, mental_skills, hints, strategy_tip,
    estimated_time, provenance, added_by_id, added_by_name, last_modified_by_id
";

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait::async_trait]
impl QuestionCatalog for SqliteRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO questions (
                id, text, topic, subtopic, difficulty, kind, options,
                correct_answer, answer_variants, tags, mental_skills, hints,
                strategy_tip, estimated_time, provenance, added_by_id,
                added_by_name, last_modified_by_id
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
            ON CONFLICT(id) DO UPDATE SET
                text = excluded.text,
                topic = excluded.topic,
                subtopic = excluded.subtopic,
                difficulty = excluded.difficulty,
                kind = excluded.kind,
                options = excluded.options,
                correct_answer = excluded.correct_answer,
                answer_variants = excluded.answer_variants,
                tags = excluded.tags,
                mental_skills = excluded.mental_skills,
                hints = excluded.hints,
                strategy_tip = excluded.strategy_tip,
                estimated_time = excluded.estimated_time,
                provenance = excluded.provenance,
                last_modified_by_id = excluded.last_modified_by_id
            ",
        )
        .bind(question.id.as_str())
        .bind(&question.text)
        .bind(question.topic.as_str())
        .bind(&question.subtopic)
        .bind(i64::from(question.difficulty.value()))
        .bind(question.kind.as_str())
        .bind(mapping::strings_to_json(&question.options)?)
        .bind(&question.correct_answer)
        .bind(mapping::strings_to_json(&question.answer_variants)?)
        .bind(mapping::strings_to_json(&question.tags)?)
        .bind(mapping::strings_to_json(&question.mental_skills)?)
        .bind(mapping::strings_to_json(&question.hints)?)
        .bind(&question.strategy_tip)
        .bind(i64::from(question.estimated_time))
        .bind(question.provenance.as_str())
        .bind(&question.added_by_id)
        .bind(&question.added_by_name)
        .bind(&question.last_modified_by_id)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_question(&self, id: &QuestionId) -> Result<Option<Question>, StorageError> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.map(|r| mapping::map_question_row(&r)).transpose()
    }

    async fn easiest_question_for_topic(
        &self,
        topic: &TopicSlug,
    ) -> Result<Option<Question>, StorageError> {
        // RANDOM() gives the arbitrary tie-break among equally easy rows.
        let sql = format!(
            r"
            SELECT {QUESTION_COLUMNS}
            FROM questions
            WHERE topic = ?1
            ORDER BY difficulty ASC, RANDOM()
            LIMIT 1
            "
        );
        let row = sqlx::query(&sql)
            .bind(topic.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.map(|r| mapping::map_question_row(&r)).transpose()
    }

    async fn sample_question(
        &self,
        topic: &TopicSlug,
        difficulty: Difficulty,
    ) -> Result<Option<Question>, StorageError> {
        let sql = format!(
            r"
            SELECT {QUESTION_COLUMNS}
            FROM questions
            WHERE topic = ?1 AND difficulty = ?2
            ORDER BY RANDOM()
            LIMIT 1
            "
        );
        let row = sqlx::query(&sql)
            .bind(topic.as_str())
            .bind(i64::from(difficulty.value()))
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.map(|r| mapping::map_question_row(&r)).transpose()
    }

    async fn list_questions_for_topic(
        &self,
        topic: &TopicSlug,
    ) -> Result<Vec<Question>, StorageError> {
        let sql = format!(
            r"
            SELECT {QUESTION_COLUMNS}
            FROM questions
            WHERE topic = ?1
            ORDER BY difficulty ASC, id ASC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(topic.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in rows {
            questions.push(mapping::map_question_row(&row)?);
        }
        Ok(questions)
    }
}
