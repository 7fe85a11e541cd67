use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::database::schema::{Document, ResourceSchema, ValidationErrors};
use crate::filter::{Filter, FindQuery};

/// Errors from document stores and the repository layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate field value entered")]
    Duplicate { field: String },

    #[error("{}", .0.message())]
    Validation(ValidationErrors),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Schema-keyed document storage.
///
/// Every operation names the collection through its [`ResourceSchema`].
/// Documents are stored whole, including hidden fields; callers decide what
/// leaves the process.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn backend(&self) -> &'static str;

    /// Filtered, sorted, paged and projected read.
    async fn find(&self, schema: &ResourceSchema, query: &FindQuery) -> Result<Vec<Document>, StoreError>;

    async fn count(&self, schema: &ResourceSchema, filter: &Filter) -> Result<u64, StoreError>;

    async fn find_by_id(&self, schema: &ResourceSchema, id: Uuid) -> Result<Option<Document>, StoreError>;

    /// Store a complete document; its `id` must already be set.
    async fn insert(&self, schema: &ResourceSchema, doc: Document) -> Result<Document, StoreError>;

    /// Merge `changes` into the stored document. `None` when the id is absent.
    async fn update_by_id(
        &self,
        schema: &ResourceSchema,
        id: Uuid,
        changes: Document,
    ) -> Result<Option<Document>, StoreError>;

    async fn delete_by_id(&self, schema: &ResourceSchema, id: Uuid) -> Result<bool, StoreError>;

    async fn delete_many(&self, schema: &ResourceSchema, filter: &Filter) -> Result<u64, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;

    async fn close(&self);
}

/// Value of the `id` field of a stored document.
pub(crate) fn document_id(doc: &Document) -> Result<Uuid, StoreError> {
    doc.get(crate::database::schema::ID_FIELD)
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| StoreError::QueryError("document has no valid id".to_string()))
}
