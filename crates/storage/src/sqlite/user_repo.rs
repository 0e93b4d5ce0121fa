use practice_core::model::{User, UserId};

use super::{SqliteRepository, mapping};
use crate::repository::{StorageError, UserRepository};

fn conn_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn insert_user(&self, user: &User) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO users (
                id, full_name, age, email, password_hash, role, topics_history
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(user.id().to_string())
        .bind(user.full_name())
        .bind(i64::from(user.age()))
        .bind(user.email())
        .bind(user.password_hash())
        .bind(user.role().as_str())
        .bind(mapping::slugs_to_json(user.topics_history())?)
        .execute(&self.pool)
        .await
        .map_err(conn_err)?;

        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, full_name, age, email, password_hash, role, topics_history
            FROM users
            WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?;

        row.map(|r| mapping::map_user_row(&r)).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, full_name, age, email, password_hash, role, topics_history
            FROM users
            WHERE email = ?1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn_err)?;

        row.map(|r| mapping::map_user_row(&r)).transpose()
    }

    async fn update_user(&self, user: &User) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE users SET
                full_name = ?2,
                age = ?3,
                email = ?4,
                password_hash = ?5,
                role = ?6,
                topics_history = ?7
            WHERE id = ?1
            ",
        )
        .bind(user.id().to_string())
        .bind(user.full_name())
        .bind(i64::from(user.age()))
        .bind(user.email())
        .bind(user.password_hash())
        .bind(user.role().as_str())
        .bind(mapping::slugs_to_json(user.topics_history())?)
        .execute(&self.pool)
        .await
        .map_err(conn_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(conn_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
