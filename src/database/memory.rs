use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::database::schema::{Document, ResourceSchema, ID_FIELD};
use crate::database::store::{document_id, DocumentStore, StoreError};
use crate::filter::filter_order::FilterOrder;
use crate::filter::{Filter, FindQuery};

/// In-process store with the same filter, sort and uniqueness semantics as Postgres
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<&'static str, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn has_id(doc: &Document, id: &str) -> bool {
    doc.get(ID_FIELD).and_then(Value::as_str) == Some(id)
}

/// First unique field of `candidate` whose value another document already holds.
fn duplicate_field(
    schema: &ResourceSchema,
    docs: &[Document],
    candidate: &Document,
    skip_id: &str,
) -> Option<String> {
    schema
        .unique_fields()
        .find(|spec| match candidate.get(spec.name) {
            None | Some(Value::Null) => false,
            Some(value) => docs
                .iter()
                .any(|d| !has_id(d, skip_id) && d.get(spec.name) == Some(value)),
        })
        .map(|spec| spec.name.to_string())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn find(&self, schema: &ResourceSchema, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let mut docs: Vec<Document> = collections
            .get(schema.collection)
            .map(|docs| docs.iter().filter(|d| query.filter.matches(d)).cloned().collect())
            .unwrap_or_default();
        drop(collections);

        docs.sort_by(|a, b| FilterOrder::compare(&query.sort, a, b));

        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let take = query
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        Ok(docs
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|d| query.project(d))
            .collect())
    }

    async fn count(&self, schema: &ResourceSchema, filter: &Filter) -> Result<u64, StoreError> {
        let collections = self.collections.read().await;
        let count = collections
            .get(schema.collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn find_by_id(&self, schema: &ResourceSchema, id: Uuid) -> Result<Option<Document>, StoreError> {
        let id = id.to_string();
        let collections = self.collections.read().await;
        Ok(collections
            .get(schema.collection)
            .and_then(|docs| docs.iter().find(|d| has_id(d, &id)).cloned()))
    }

    async fn insert(&self, schema: &ResourceSchema, doc: Document) -> Result<Document, StoreError> {
        let id = document_id(&doc)?.to_string();
        let mut collections = self.collections.write().await;
        let docs = collections.entry(schema.collection).or_default();

        if docs.iter().any(|d| has_id(d, &id)) {
            return Err(StoreError::Duplicate { field: ID_FIELD.to_string() });
        }
        if let Some(field) = duplicate_field(schema, docs, &doc, &id) {
            return Err(StoreError::Duplicate { field });
        }

        docs.push(doc.clone());
        Ok(doc)
    }

    async fn update_by_id(
        &self,
        schema: &ResourceSchema,
        id: Uuid,
        changes: Document,
    ) -> Result<Option<Document>, StoreError> {
        let id = id.to_string();
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(schema.collection) else {
            return Ok(None);
        };
        let Some(pos) = docs.iter().position(|d| has_id(d, &id)) else {
            return Ok(None);
        };

        let mut merged = docs[pos].clone();
        merged.extend(changes);
        if let Some(field) = duplicate_field(schema, docs, &merged, &id) {
            return Err(StoreError::Duplicate { field });
        }

        docs[pos] = merged.clone();
        Ok(Some(merged))
    }

    async fn delete_by_id(&self, schema: &ResourceSchema, id: Uuid) -> Result<bool, StoreError> {
        let id = id.to_string();
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(schema.collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| !has_id(d, &id));
        Ok(docs.len() < before)
    }

    async fn delete_many(&self, schema: &ResourceSchema, filter: &Filter) -> Result<u64, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(schema.collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !filter.matches(d));
        Ok((before - docs.len()) as u64)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self) {
        info!("Closed in-memory document store");
    }
}
