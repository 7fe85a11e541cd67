use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::schema::ResourceSchema;
use crate::database::{DocumentStore, Repository};

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, config: AppConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }

    pub fn repository(&self, schema: &'static ResourceSchema) -> Repository {
        Repository::new(self.store.clone(), schema)
    }
}
