use practice_core::model::{Topic, TopicSlug};

use super::{SqliteRepository, mapping};
use crate::repository::{StorageError, TopicCatalog};

const TOPIC_COLUMNS: &str = r"
    slug, title, description, subtopics, canonical_mental_skills,
    min_difficulty, max_difficulty, tags, created_by, updated_by
";

#[async_trait::async_trait]
impl TopicCatalog for SqliteRepository {
    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO topics (
                slug, title, description, subtopics, canonical_mental_skills,
                min_difficulty, max_difficulty, tags, created_by, updated_by
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(slug) DO UPDATE SET
                -- the slug is the topic's identity; everything else may move
                title = excluded.title,
                description = excluded.description,
                subtopics = excluded.subtopics,
                canonical_mental_skills = excluded.canonical_mental_skills,
                min_difficulty = excluded.min_difficulty,
                max_difficulty = excluded.max_difficulty,
                tags = excluded.tags,
                updated_by = excluded.updated_by
            ",
        )
        .bind(topic.slug.as_str())
        .bind(&topic.title)
        .bind(&topic.description)
        .bind(mapping::strings_to_json(&topic.subtopics)?)
        .bind(mapping::strings_to_json(&topic.canonical_mental_skills)?)
        .bind(i64::from(topic.min_difficulty.value()))
        .bind(i64::from(topic.max_difficulty.value()))
        .bind(mapping::strings_to_json(&topic.tags)?)
        .bind(&topic.created_by)
        .bind(&topic.updated_by)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_topic(&self, slug: &TopicSlug) -> Result<Option<Topic>, StorageError> {
        let sql = format!("SELECT {TOPIC_COLUMNS} FROM topics WHERE slug = ?1");
        let row = sqlx::query(&sql)
            .bind(slug.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.map(|r| mapping::map_topic_row(&r)).transpose()
    }

    async fn existing_slugs(&self, slugs: &[TopicSlug]) -> Result<Vec<TopicSlug>, StorageError> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from("SELECT slug FROM topics WHERE slug IN (");
        for i in 0..slugs.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push(')');

        let mut q = sqlx::query_scalar::<_, String>(&sql);
        for slug in slugs {
            q = q.bind(slug.as_str());
        }

        let found = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(found.into_iter().map(TopicSlug::new).collect())
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, StorageError> {
        let sql = format!("SELECT {TOPIC_COLUMNS} FROM topics ORDER BY slug ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut topics = Vec::with_capacity(rows.len());
        for row in rows {
            topics.push(mapping::map_topic_row(&row)?);
        }
        Ok(topics)
    }
}
