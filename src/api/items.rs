//! Equipment catalog endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::item::{CreateItem, Item},
    AppState,
};

use super::AuthenticatedAdmin;

/// List catalog items
#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    responses(
        (status = 200, description = "List of items", body = Vec<Item>)
    )
)]
pub async fn list_items(State(state): State<AppState>) -> AppResult<Json<Vec<Item>>> {
    let items = state.services.catalog.list().await?;
    Ok(Json(items))
}

/// Get item details by ID
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    params(
        ("id" = i32, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item details", body = Item),
        (status = 404, description = "Item not found")
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Item>> {
    let item = state.services.catalog.get_by_id(id).await?;
    Ok(Json(item))
}

/// Add an item to the catalog
#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    security(("bearer_auth" = [])),
    request_body = CreateItem,
    responses(
        (status = 201, description = "Item created", body = Item),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create_item(
    State(state): State<AppState>,
    AuthenticatedAdmin(_claims): AuthenticatedAdmin,
    Json(item): Json<CreateItem>,
) -> AppResult<(StatusCode, Json<Item>)> {
    let created = state.services.catalog.create(&item).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
