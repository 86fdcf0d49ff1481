//! Equipment catalog service

use validator::Validate;

use crate::{
    error::AppResult,
    models::item::{CreateItem, Item},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Item>> {
        self.repository.items.list().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Item> {
        self.repository.items.get_by_id(id).await
    }

    pub async fn create(&self, data: &CreateItem) -> AppResult<Item> {
        data.validate()?;
        let item = self.repository.items.create(data).await?;
        tracing::info!("Created item {} ({}) in {}", item.id, item.name, item.home_lab);
        Ok(item)
    }
}
