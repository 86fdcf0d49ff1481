//! Business logic services

pub mod auth;
pub mod catalog;
pub mod loans;
pub mod photos;
pub mod sweeper;

use std::sync::Arc;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub photos: photos::PhotoStore,
    pub sweeper: sweeper::DeniedLoanSweeper,
    pub repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let photos = photos::PhotoStore::new(&config.uploads);
        let sweeper = sweeper::DeniedLoanSweeper::new(
            Arc::new(repository.loans.clone()),
            &config.sweeper,
        );

        Self {
            auth: auth::AuthService::new(repository.clone(), config.auth.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone(), photos.clone(), sweeper.clone()),
            photos,
            sweeper,
            repository,
        }
    }
}
