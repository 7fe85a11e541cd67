pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod schema;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;
pub use repository::Repository;
pub use schema::{Document, ResourceSchema};
pub use store::{DocumentStore, StoreError};

use std::sync::Arc;
use tracing::info;

use crate::config::DatabaseConfig;

/// Open the store named by `DATABASE_URL`.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    let url = config.url.as_str();
    if url.starts_with("memory://") {
        info!("Using in-memory document store");
        Ok(Arc::new(MemoryStore::new()))
    } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        Ok(Arc::new(PgDocumentStore::connect(config).await?))
    } else {
        Err(StoreError::InvalidDatabaseUrl(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> DatabaseConfig {
        DatabaseConfig { url: url.to_string(), max_connections: 1, connection_timeout: 1 }
    }

    #[tokio::test]
    async fn picks_backend_from_url() {
        let store = connect(&config("memory://")).await.unwrap();
        assert_eq!(store.backend(), "memory");
        assert!(store.health_check().await.is_ok());

        assert!(matches!(
            connect(&config("mysql://localhost/db")).await,
            Err(StoreError::InvalidDatabaseUrl(_))
        ));
    }
}
