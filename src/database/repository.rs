use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::schema::{Document, ResourceSchema, CREATED_AT_FIELD, ID_FIELD};
use crate::database::store::{DocumentStore, StoreError};
use crate::filter::{Filter, FindQuery};

/// Typed access to one collection.
///
/// Applies schema validation on writes, fills `id` and `createdAt`, and strips
/// hidden fields from everything it returns.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
    schema: &'static ResourceSchema,
}

impl Repository {
    pub fn new(store: Arc<dyn DocumentStore>, schema: &'static ResourceSchema) -> Self {
        Self { store, schema }
    }

    pub fn schema(&self) -> &'static ResourceSchema {
        self.schema
    }

    pub async fn select_any(&self, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let docs = self.store.find(self.schema, query).await?;
        Ok(docs.into_iter().map(|d| self.visible(d)).collect())
    }

    pub async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        self.store.count(self.schema, filter).await
    }

    /// Malformed ids are reported as absent.
    pub async fn select_one(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let Ok(uuid) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        let doc = self.store.find_by_id(self.schema, uuid).await?;
        Ok(doc.map(|d| self.visible(d)))
    }

    pub async fn select_404(&self, id: &str) -> Result<Document, StoreError> {
        self.select_one(id).await?.ok_or_else(|| self.not_found(id))
    }

    /// Validate client input and store it together with server-derived fields.
    pub async fn create(&self, body: &Document, derived: Document) -> Result<Document, StoreError> {
        let prepared = self.schema.prepare_create(body).map_err(StoreError::Validation)?;
        self.insert_prepared(prepared, derived).await
    }

    /// Store an already-validated document. `derived` may carry `id` and
    /// `createdAt`; both are generated when absent.
    pub async fn insert_prepared(&self, mut doc: Document, derived: Document) -> Result<Document, StoreError> {
        doc.extend(derived);

        let id_valid = doc
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .is_some_and(|s| Uuid::parse_str(s).is_ok());
        if !id_valid {
            doc.insert(ID_FIELD.to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        if !doc.get(CREATED_AT_FIELD).is_some_and(Value::is_string) {
            doc.insert(CREATED_AT_FIELD.to_string(), Value::String(now_timestamp()));
        }

        let stored = self.store.insert(self.schema, doc).await?;
        Ok(self.visible(stored))
    }

    /// Validate a partial update and merge it. `None` when the id is absent.
    pub async fn update(&self, id: &str, body: &Document) -> Result<Option<Document>, StoreError> {
        let changes = self.schema.prepare_update(body).map_err(StoreError::Validation)?;
        let Ok(uuid) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        let updated = if changes.is_empty() {
            self.store.find_by_id(self.schema, uuid).await?
        } else {
            self.store.update_by_id(self.schema, uuid, changes).await?
        };
        Ok(updated.map(|d| self.visible(d)))
    }

    pub async fn update_404(&self, id: &str, body: &Document) -> Result<Document, StoreError> {
        self.update(id, body).await?.ok_or_else(|| self.not_found(id))
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let Ok(uuid) = Uuid::parse_str(id) else {
            return Ok(false);
        };
        self.store.delete_by_id(self.schema, uuid).await
    }

    pub async fn delete_many(&self, filter: &Filter) -> Result<u64, StoreError> {
        self.store.delete_many(self.schema, filter).await
    }

    /// Single matching document including hidden fields, for credential checks.
    pub async fn select_with_hidden(&self, filter: Filter) -> Result<Option<Document>, StoreError> {
        let query = FindQuery {
            limit: Some(1),
            ..FindQuery::filtered(filter)
        };
        Ok(self.store.find(self.schema, &query).await?.into_iter().next())
    }

    pub fn not_found(&self, id: &str) -> StoreError {
        StoreError::NotFound(format!("No {} with id of {}", self.schema.label, id))
    }

    fn visible(&self, mut doc: Document) -> Document {
        self.schema.strip_hidden(&mut doc);
        doc
    }
}

/// Creation timestamp in RFC 3339 with millisecond precision, UTC.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
