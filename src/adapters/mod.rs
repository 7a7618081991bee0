//! Concrete adapter implementations for ports.

#[cfg(feature = "postgres")]
pub mod postgres_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
#[cfg(feature = "web")]
pub mod web;
pub mod file_config_adapter;
pub mod quote_client;

use std::sync::Arc;

use crate::domain::config_validation::{self, Backend};
use crate::domain::error::StockfolioError;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;

/// Open the store selected by `[database] backend`.
pub fn store_from_config(
    config: &dyn ConfigPort,
) -> Result<Arc<dyn StorePort + Send + Sync>, StockfolioError> {
    match config_validation::backend(config)? {
        #[cfg(feature = "sqlite")]
        Backend::Sqlite => Ok(Arc::new(sqlite_adapter::SqliteAdapter::from_config(config)?)),
        #[cfg(feature = "postgres")]
        Backend::Postgres => Ok(Arc::new(postgres_adapter::PostgresAdapter::from_config(
            config,
        )?)),
        #[allow(unreachable_patterns)]
        other => Err(StockfolioError::ConfigInvalid {
            section: "database".to_string(),
            key: "backend".to_string(),
            reason: format!("{other:?} support was not compiled in"),
        }),
    }
}
