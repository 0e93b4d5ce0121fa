use practice_core::model::{AgentDecision, QuestionId, SessionId};

use super::{SqliteRepository, mapping};
use crate::repository::{AgentDecisionRepository, StorageError};

fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

const DECISION_COLUMNS: &str = r"
    id, session_id, prev_question_id, next_question_id, next_difficulty,
    mastery, reason, trace, created_at
";

#[async_trait::async_trait]
impl AgentDecisionRepository for SqliteRepository {
    async fn append_decision(&self, decision: &AgentDecision) -> Result<i64, StorageError> {
        let trace = serde_json::to_string(&decision.trace).map_err(mapping::ser)?;

        let res = sqlx::query(
            r"
            INSERT INTO agent_decisions (
                session_id, prev_question_id, next_question_id,
                next_difficulty, mastery, reason, trace, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(decision.session_id.to_string())
        .bind(decision.prev_question_id.as_ref().map(QuestionId::as_str))
        .bind(decision.next_question_id.as_ref().map(QuestionId::as_str))
        .bind(decision.next_difficulty.map(|d| i64::from(d.value())))
        .bind(f64::from(decision.mastery))
        .bind(&decision.reason)
        .bind(trace)
        .bind(decision.created_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn latest_for_next_question(
        &self,
        session_id: SessionId,
        next_question_id: &QuestionId,
    ) -> Result<Option<AgentDecision>, StorageError> {
        let sql = format!(
            r"
            SELECT {DECISION_COLUMNS}
            FROM agent_decisions
            WHERE session_id = ?1 AND next_question_id = ?2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "
        );
        let row = sqlx::query(&sql)
            .bind(session_id.to_string())
            .bind(next_question_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.map(|r| mapping::map_decision_row(&r)).transpose()
    }

    async fn list_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AgentDecision>, StorageError> {
        let sql = format!(
            r"
            SELECT {DECISION_COLUMNS}
            FROM agent_decisions
            WHERE session_id = ?1
            ORDER BY created_at ASC, id ASC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(session_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut decisions = Vec::with_capacity(rows.len());
        for row in rows {
            decisions.push(mapping::map_decision_row(&row)?);
        }
        Ok(decisions)
    }
}
