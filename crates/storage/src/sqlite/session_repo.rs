use sqlx::Row;

use practice_core::model::{QuestionSession, Session, SessionId, TopicSlug, UserId};

use super::{SqliteRepository, mapping};
use crate::repository::{SessionRepository, StorageError};

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

const SESSION_COLUMNS: &str = r"
    id, user_id, topic_order, start_time, end_time,
    total_score, total_correct, total_questions
";

const CHILD_COLUMNS: &str = r"
    id, session_id, question_id, response, correct, time_taken, timestamp,
    attempt_number, agent_feedback, strategy_tip, answer_variants
";

impl SqliteRepository {
    async fn children_for(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<QuestionSession>, StorageError> {
        let sql = format!(
            r"
            SELECT {CHILD_COLUMNS}
            FROM question_sessions
            WHERE session_id = ?1
            ORDER BY seq ASC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(session_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut children = Vec::with_capacity(rows.len());
        for row in rows {
            children.push(mapping::map_question_session_row(&row)?);
        }
        Ok(children)
    }

    fn compose_session(
        row: &sqlx::sqlite::SqliteRow,
        children: Vec<QuestionSession>,
    ) -> Result<Session, StorageError> {
        let id =
            mapping::session_id_from_str(row.try_get::<String, _>("id").map_err(mapping::ser)?.as_str())?;
        let user_id = mapping::user_id_from_str(
            row.try_get::<String, _>("user_id").map_err(mapping::ser)?.as_str(),
        )?;
        let topic_order = mapping::slugs_from_json(
            row.try_get::<String, _>("topic_order").map_err(mapping::ser)?.as_str(),
        )?;

        let optional_u32 = |field: &'static str| -> Result<Option<u32>, StorageError> {
            row.try_get::<Option<i64>, _>(field)
                .map_err(mapping::ser)?
                .map(|v| mapping::u32_from_i64(field, v))
                .transpose()
        };

        Ok(Session::from_persisted(
            id,
            user_id,
            topic_order,
            row.try_get("start_time").map_err(mapping::ser)?,
            row.try_get("end_time").map_err(mapping::ser)?,
            children,
            optional_u32("total_score")?,
            optional_u32("total_correct")?,
            optional_u32("total_questions")?,
        ))
    }

    async fn load_with_children(
        &self,
        rows: Vec<sqlx::sqlite::SqliteRow>,
    ) -> Result<Vec<Session>, StorageError> {
        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            let id = mapping::session_id_from_str(
                row.try_get::<String, _>("id").map_err(mapping::ser)?.as_str(),
            )?;
            let children = self.children_for(id).await?;
            sessions.push(Self::compose_session(&row, children)?);
        }
        Ok(sessions)
    }
}

fn bind_child<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    session_id: SessionId,
    entry: &'q QuestionSession,
) -> Result<sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>, StorageError> {
    let feedback = entry
        .agent_feedback()
        .map(serde_json::to_string)
        .transpose()
        .map_err(mapping::ser)?;

    Ok(query
        .bind(entry.id().to_string())
        .bind(session_id.to_string())
        .bind(entry.question_id().as_str())
        .bind(entry.response())
        .bind(i64::from(entry.correct()))
        .bind(i64::from(entry.time_taken()))
        .bind(entry.timestamp())
        .bind(entry.attempt_number().map(i64::from))
        .bind(feedback)
        .bind(entry.strategy_tip())
        .bind(mapping::strings_to_json(entry.answer_variants())?))
}

const INSERT_CHILD_SQL: &str = r"
    INSERT INTO question_sessions (
        id, session_id, question_id, response, correct, time_taken,
        timestamp, attempt_number, agent_feedback, strategy_tip, answer_variants
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
";

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn create_session(&self, session: &Session) -> Result<(), StorageError> {
        // Session row and its first attempt land in the same transaction.
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO sessions (
                id, user_id, topic_order, start_time, end_time,
                total_score, total_correct, total_questions
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(session.id().to_string())
        .bind(session.user_id().to_string())
        .bind(mapping::slugs_to_json(session.topic_order())?)
        .bind(session.start_time())
        .bind(session.end_time())
        .bind(session.total_score().map(i64::from))
        .bind(session.total_correct().map(i64::from))
        .bind(session.total_questions().map(i64::from))
        .execute(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
            _ => conn(e),
        })?;

        for entry in session.questions() {
            bind_child(sqlx::query(INSERT_CHILD_SQL), session.id(), entry)?
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StorageError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let children = self.children_for(id).await?;
        Ok(Some(Self::compose_session(&row, children)?))
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, StorageError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions ORDER BY start_time ASC, id ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await.map_err(conn)?;
        self.load_with_children(rows).await
    }

    async fn update_question_session(
        &self,
        session_id: SessionId,
        entry: &QuestionSession,
    ) -> Result<(), StorageError> {
        let feedback = entry
            .agent_feedback()
            .map(serde_json::to_string)
            .transpose()
            .map_err(mapping::ser)?;

        let res = sqlx::query(
            r"
            UPDATE question_sessions SET
                response = ?3,
                correct = ?4,
                time_taken = ?5,
                attempt_number = ?6,
                agent_feedback = ?7,
                strategy_tip = ?8,
                answer_variants = ?9
            WHERE id = ?1 AND session_id = ?2
            ",
        )
        .bind(entry.id().to_string())
        .bind(session_id.to_string())
        .bind(entry.response())
        .bind(i64::from(entry.correct()))
        .bind(i64::from(entry.time_taken()))
        .bind(entry.attempt_number().map(i64::from))
        .bind(feedback)
        .bind(entry.strategy_tip())
        .bind(mapping::strings_to_json(entry.answer_variants())?)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn append_question_session(
        &self,
        session: &Session,
        entry: &QuestionSession,
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        bind_child(sqlx::query(INSERT_CHILD_SQL), session.id(), entry)?
            .execute(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    StorageError::NotFound
                }
                _ => conn(e),
            })?;

        sqlx::query(
            r"
            UPDATE sessions SET
                total_score = ?2,
                total_correct = ?3,
                total_questions = ?4
            WHERE id = ?1
            ",
        )
        .bind(session.id().to_string())
        .bind(session.total_score().map(i64::from))
        .bind(session.total_correct().map(i64::from))
        .bind(session.total_questions().map(i64::from))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn recent_sessions_for_user(
        &self,
        user_id: UserId,
        topic: Option<&TopicSlug>,
        limit: u32,
    ) -> Result<Vec<Session>, StorageError> {
        let mut sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = ?1");
        if topic.is_some() {
            // topic_order is a JSON array column; membership via json_each.
            sql.push_str(
                " AND EXISTS (SELECT 1 FROM json_each(sessions.topic_order) WHERE json_each.value = ?2)",
            );
        }
        sql.push_str(" ORDER BY start_time DESC, id DESC LIMIT ");
        sql.push_str(if topic.is_some() { "?3" } else { "?2" });

        let mut query = sqlx::query(&sql).bind(user_id.to_string());
        if let Some(slug) = topic {
            query = query.bind(slug.as_str());
        }
        query = query.bind(i64::from(limit));

        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;
        self.load_with_children(rows).await
    }

    async fn delete_session(&self, id: SessionId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
