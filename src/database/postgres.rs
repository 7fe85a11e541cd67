use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::database::models;
use crate::database::schema::{Document, ResourceSchema};
use crate::database::store::{document_id, DocumentStore, StoreError};
use crate::filter::filter_order::FilterOrder;
use crate::filter::filter_where::{quote_literal, FilterWhere};
use crate::filter::{Filter, FindQuery};

/// Postgres-backed store: one `(id UUID, data JSONB)` table per collection
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(&config.url)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        info!("Connected Postgres document store");
        Ok(store)
    }

    /// Create collection tables and unique indexes if missing.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for schema in models::ALL {
            let table = quote_identifier(schema.collection);
            sqlx::query(&format!(
                "CREATE TABLE IF NOT EXISTS {} (id UUID PRIMARY KEY, data JSONB NOT NULL)",
                table
            ))
            .execute(&self.pool)
            .await?;

            for spec in schema.unique_fields() {
                sqlx::query(&format!(
                    "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ((data->>{}))",
                    quote_identifier(&unique_index_name(schema, spec.name)),
                    table,
                    quote_literal(spec.name)
                ))
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    fn map_write_error(schema: &ResourceSchema, err: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some("23505") {
                let field = db
                    .constraint()
                    .and_then(|c| {
                        schema
                            .unique_fields()
                            .find(|f| unique_index_name(schema, f.name) == c)
                    })
                    .map(|f| f.name.to_string())
                    .unwrap_or_default();
                return StoreError::Duplicate { field };
            }
        }
        StoreError::Sqlx(err)
    }
}

fn unique_index_name(schema: &ResourceSchema, field: &str) -> String {
    format!("{}_{}_key", schema.collection, field)
}

/// Quote SQL identifier to prevent injection
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn into_document(value: Value) -> Result<Document, StoreError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::QueryError(format!("stored document is not an object: {}", other))),
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn find(&self, schema: &ResourceSchema, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let (where_sql, params) = FilterWhere::generate(&query.filter, 0);
        let mut sql = format!(
            "SELECT data FROM {} WHERE {}",
            quote_identifier(schema.collection),
            where_sql
        );
        let order = FilterOrder::generate(&query.sort);
        if !order.is_empty() {
            sql.push(' ');
            sql.push_str(&order);
        }
        // LIMIT and OFFSET are bigints
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit.min(i64::MAX as u64)));
        }
        if query.skip > 0 {
            sql.push_str(&format!(" OFFSET {}", query.skip.min(i64::MAX as u64)));
        }
        debug!(sql = %sql, "find");

        let mut q = sqlx::query_scalar::<_, Value>(&sql);
        for p in params {
            q = q.bind(p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| into_document(row).map(|doc| query.project(doc)))
            .collect()
    }

    async fn count(&self, schema: &ResourceSchema, filter: &Filter) -> Result<u64, StoreError> {
        let (where_sql, params) = FilterWhere::generate(filter, 0);
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {}",
            quote_identifier(schema.collection),
            where_sql
        );
        let mut q = sqlx::query_scalar::<_, i64>(&sql);
        for p in params {
            q = q.bind(p);
        }
        let count = q.fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn find_by_id(&self, schema: &ResourceSchema, id: Uuid) -> Result<Option<Document>, StoreError> {
        let sql = format!("SELECT data FROM {} WHERE id = $1", quote_identifier(schema.collection));
        let row = sqlx::query_scalar::<_, Value>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(into_document).transpose()
    }

    async fn insert(&self, schema: &ResourceSchema, doc: Document) -> Result<Document, StoreError> {
        let id = document_id(&doc)?;
        let sql = format!(
            "INSERT INTO {} (id, data) VALUES ($1, $2) RETURNING data",
            quote_identifier(schema.collection)
        );
        let row = sqlx::query_scalar::<_, Value>(&sql)
            .bind(id)
            .bind(Value::Object(doc))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(schema, e))?;
        into_document(row)
    }

    async fn update_by_id(
        &self,
        schema: &ResourceSchema,
        id: Uuid,
        changes: Document,
    ) -> Result<Option<Document>, StoreError> {
        let sql = format!(
            "UPDATE {} SET data = data || $2 WHERE id = $1 RETURNING data",
            quote_identifier(schema.collection)
        );
        let row = sqlx::query_scalar::<_, Value>(&sql)
            .bind(id)
            .bind(Value::Object(changes))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(schema, e))?;
        row.map(into_document).transpose()
    }

    async fn delete_by_id(&self, schema: &ResourceSchema, id: Uuid) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", quote_identifier(schema.collection));
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_many(&self, schema: &ResourceSchema, filter: &Filter) -> Result<u64, StoreError> {
        let (where_sql, params) = FilterWhere::generate(filter, 0);
        let sql = format!("DELETE FROM {} WHERE {}", quote_identifier(schema.collection), where_sql);
        let mut q = sqlx::query(&sql);
        for p in params {
            q = q.bind(p);
        }
        let result = q.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed Postgres document store");
    }
}
