//! Admins repository

use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::admin::Admin};

#[derive(Clone)]
pub struct AdminsRepository {
    pool: Pool<Postgres>,
}

impl AdminsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get admin by username
    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<Admin>> {
        let admin = sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(admin)
    }

    /// Create an admin, or reset the name and password of an existing one
    pub async fn upsert(&self, username: &str, name: &str, password_hash: &str) -> AppResult<Admin> {
        let admin = sqlx::query_as::<_, Admin>(
            r#"
            INSERT INTO admins (username, name, password_hash)
            VALUES ($1, $2, $3)
            ON CONFLICT (username)
            DO UPDATE SET name = EXCLUDED.name, password_hash = EXCLUDED.password_hash
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(name)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(admin)
    }
}
