use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema: users, topics, questions, sessions,
/// question_sessions, agent_decisions, and indexes.
///
/// `question_sessions.question_id` and the agent_decisions question columns
/// deliberately carry no foreign key into `questions`: catalog documents
/// live an independent lifecycle and ids may go stale.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS users (
                    id TEXT PRIMARY KEY,
                    full_name TEXT NOT NULL,
                    age INTEGER NOT NULL CHECK (age >= 0),
                    email TEXT NOT NULL UNIQUE,
                    password_hash TEXT NOT NULL,
                    role TEXT NOT NULL,
                    topics_history TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS topics (
                    slug TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT,
                    subtopics TEXT NOT NULL,
                    canonical_mental_skills TEXT NOT NULL,
                    min_difficulty INTEGER NOT NULL CHECK (min_difficulty BETWEEN 1 AND 5),
                    max_difficulty INTEGER NOT NULL CHECK (max_difficulty BETWEEN 1 AND 5),
                    tags TEXT NOT NULL,
                    created_by TEXT NOT NULL,
                    updated_by TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    id TEXT PRIMARY KEY,
                    text TEXT NOT NULL,
                    topic TEXT NOT NULL,
                    subtopic TEXT,
                    difficulty INTEGER NOT NULL CHECK (difficulty BETWEEN 1 AND 5),
                    kind TEXT NOT NULL,
                    options TEXT NOT NULL,
                    correct_answer TEXT NOT NULL,
                    answer_variants TEXT NOT NULL,
                    tags TEXT NOT NULL,
                    mental_skills TEXT NOT NULL,
                    hints TEXT NOT NULL,
                    strategy_tip TEXT,
                    estimated_time INTEGER NOT NULL CHECK (estimated_time >= 0),
                    provenance TEXT NOT NULL,
                    added_by_id TEXT NOT NULL,
                    added_by_name TEXT,
                    last_modified_by_id TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS sessions (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    topic_order TEXT NOT NULL,
                    start_time TEXT NOT NULL,
                    end_time TEXT NOT NULL,
                    total_score INTEGER,
                    total_correct INTEGER,
                    total_questions INTEGER,
                    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS question_sessions (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL UNIQUE,
                    session_id TEXT NOT NULL,
                    question_id TEXT NOT NULL,
                    response TEXT NOT NULL,
                    correct INTEGER NOT NULL CHECK (correct IN (0, 1)),
                    time_taken INTEGER NOT NULL CHECK (time_taken >= 0),
                    timestamp TEXT NOT NULL,
                    attempt_number INTEGER,
                    agent_feedback TEXT,
                    strategy_tip TEXT,
                    answer_variants TEXT NOT NULL,
                    FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS agent_decisions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    session_id TEXT NOT NULL,
                    prev_question_id TEXT,
                    next_question_id TEXT,
                    next_difficulty INTEGER CHECK (next_difficulty BETWEEN 1 AND 5),
                    mastery REAL NOT NULL,
                    reason TEXT NOT NULL,
                    trace TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_questions_topic_difficulty
                    ON questions(topic, difficulty);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_sessions_user_start
                    ON sessions(user_id, start_time);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_question_sessions_session_seq
                    ON question_sessions(session_id, seq);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_agent_decisions_session_next
                    ON agent_decisions(session_id, next_question_id, created_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
