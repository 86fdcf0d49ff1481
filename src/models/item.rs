//! Equipment catalog item

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Item record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Item {
    pub id: i32,
    pub name: String,
    /// Lab that owns the item
    pub home_lab: String,
    pub total_quantity: i32,
    /// Units currently in the lab; not adjusted by loans
    pub quantity_on_hand: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create item request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateItem {
    #[validate(length(min = 1, message = "Item name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Home lab is required"))]
    pub home_lab: String,
    #[validate(range(min = 0, message = "Total quantity cannot be negative"))]
    pub total_quantity: i32,
}
