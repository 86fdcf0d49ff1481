//! Retention sweeper for denied borrow requests

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    config::SweeperConfig,
    error::AppResult,
    repository::loans::LoansRepository,
};

/// Store operation the sweeper depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeniedLoanStore: Send + Sync {
    /// Delete loans denied before `cutoff`; returns the number removed
    async fn delete_denied_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}

#[async_trait]
impl DeniedLoanStore for LoansRepository {
    async fn delete_denied_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        LoansRepository::delete_denied_before(self, cutoff).await
    }
}

#[derive(Clone)]
pub struct DeniedLoanSweeper {
    store: Arc<dyn DeniedLoanStore>,
    interval: Duration,
    retention: chrono::Duration,
}

impl DeniedLoanSweeper {
    pub fn new(store: Arc<dyn DeniedLoanStore>, config: &SweeperConfig) -> Self {
        Self {
            store,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            retention: chrono::Duration::hours(config.retention_hours),
        }
    }

    /// Delete loans denied more than the retention period before `now`
    pub async fn sweep(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let removed = self.store.delete_denied_before(now - self.retention).await?;
        if removed > 0 {
            tracing::info!("Removed {} denied loans older than {}h", removed, self.retention.num_hours());
        }
        Ok(removed)
    }

    /// Sweep on every tick until the task is dropped; failures are logged only
    pub async fn run(self) {
        tracing::info!("Starting denied-loan sweeper (every {} seconds)", self.interval.as_secs());

        let mut interval = tokio::time::interval(self.interval);
        interval.tick().await; // Skip the first immediate tick

        loop {
            interval.tick().await;
            if let Err(e) = self.sweep(Utc::now()).await {
                tracing::error!("Denied-loan sweep failed: {}", e);
            }
        }
    }

    /// Spawn [`run`](Self::run) on the runtime
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
