use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::MySqlPool;
use tracing::info;

use crate::config::Config;
use crate::store::{InMemoryLeaveStore, LeaveStore, MySqlLeaveStore};

pub async fn init_db(database_url: &str) -> Result<MySqlPool> {
    let pool = MySqlPool::connect(database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run leave ledger migrations")?;

    Ok(pool)
}

/// Picks the storage backend: MySQL when `DATABASE_URL` is set, memory otherwise.
pub async fn init_store(config: &Config) -> Result<Arc<dyn LeaveStore>> {
    match &config.database_url {
        Some(url) => {
            let pool = init_db(url).await?;
            info!("Leave ledger using MySQL store");
            Ok(Arc::new(MySqlLeaveStore::new(pool, config.allocation_policy())))
        }
        None => {
            info!("DATABASE_URL not set, leave ledger using in-memory store");
            Ok(Arc::new(InMemoryLeaveStore::new(config.allocation_policy())))
        }
    }
}
