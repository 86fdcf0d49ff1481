//! Items repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::item::{CreateItem, Item},
};

#[derive(Clone)]
pub struct ItemsRepository {
    pool: Pool<Postgres>,
}

impl ItemsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all items
    pub async fn list(&self) -> AppResult<Vec<Item>> {
        let rows = sqlx::query_as::<_, Item>("SELECT * FROM items ORDER BY home_lab, name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Get item by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Item> {
        sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Item {} not found", id)))
    }

    /// Create item; everything starts on hand
    pub async fn create(&self, data: &CreateItem) -> AppResult<Item> {
        let row = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (name, home_lab, total_quantity, quantity_on_hand)
            VALUES ($1, $2, $3, $3)
            RETURNING *
            "#,
        )
        .bind(data.name.trim())
        .bind(data.home_lab.trim())
        .bind(data.total_quantity)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
