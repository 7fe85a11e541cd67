use anyhow::{anyhow, Context};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::auth::hash_password;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::models::user::PASSWORD_FIELD;
use crate::database::models::{BOOTCAMPS, COURSES, USERS};
use crate::database::schema::{Document, ResourceSchema, CREATED_AT_FIELD, ID_FIELD};
use crate::database::{DocumentStore, Repository};
use crate::filter::Filter;

/// Fixture files in load order; owners before what they own.
pub static FIXTURES: &[(&ResourceSchema, &str)] = &[
    (&USERS, "users.json"),
    (&BOOTCAMPS, "bootcamps.json"),
    (&COURSES, "courses.json"),
];

pub async fn handle_import(
    store: Arc<dyn DocumentStore>,
    dir: &Path,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let counts = import(store, dir).await?;
    let summary: serde_json::Map<String, Value> = counts
        .iter()
        .map(|(collection, n)| (collection.to_string(), json!(n)))
        .collect();
    output_success(output_format, "Data imported", Some(json!({ "imported": summary })))
}

pub async fn handle_destroy(store: Arc<dyn DocumentStore>, output_format: OutputFormat) -> anyhow::Result<()> {
    let counts = destroy(store).await?;
    let summary: serde_json::Map<String, Value> = counts
        .iter()
        .map(|(collection, n)| (collection.to_string(), json!(n)))
        .collect();
    output_success(output_format, "Data destroyed", Some(json!({ "deleted": summary })))
}

/// Load every fixture file found in `dir`; returns documents written per collection.
pub async fn import(store: Arc<dyn DocumentStore>, dir: &Path) -> anyhow::Result<Vec<(&'static str, usize)>> {
    let mut counts = Vec::new();
    for &(schema, file) in FIXTURES {
        let path = dir.join(file);
        if !path.exists() {
            info!("Skipping missing fixture {}", path.display());
            continue;
        }

        let raw = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let records: Vec<Value> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let repo = Repository::new(store.clone(), schema);
        for (index, record) in records.iter().enumerate() {
            let Value::Object(record) = record else {
                return Err(anyhow!("{} entry {} is not an object", file, index));
            };
            import_record(&repo, record)
                .await
                .with_context(|| format!("{} entry {}", file, index))?;
        }

        info!("Imported {} {}", records.len(), schema.collection);
        counts.push((schema.collection, records.len()));
    }
    Ok(counts)
}

async fn import_record(repo: &Repository, record: &Document) -> anyhow::Result<()> {
    let schema = repo.schema();
    let mut doc = schema
        .prepare_create(record)
        .map_err(|errors| anyhow!(errors.message()))?;

    if std::ptr::eq(schema, &USERS) {
        if let Some(Value::String(password)) = doc.get(PASSWORD_FIELD) {
            let hashed = hash_password(password)?;
            doc.insert(PASSWORD_FIELD.to_string(), Value::String(hashed));
        }
    }

    // Fixtures carry their own ids and references
    let mut derived = Document::new();
    let carried = [ID_FIELD, CREATED_AT_FIELD]
        .into_iter()
        .chain(schema.fields.iter().filter(|f| f.system).map(|f| f.name));
    for name in carried {
        let (Some(spec), Some(value)) = (schema.field(name), record.get(name)) else {
            continue;
        };
        let value = spec.cast(value).map_err(|e| anyhow!(e))?;
        derived.insert(name.to_string(), value);
    }

    repo.insert_prepared(doc, derived).await?;
    Ok(())
}

/// Remove every document, dependents first.
pub async fn destroy(store: Arc<dyn DocumentStore>) -> anyhow::Result<Vec<(&'static str, u64)>> {
    let mut counts = Vec::new();
    for &(schema, _) in FIXTURES.iter().rev() {
        let deleted = store.delete_many(schema, &Filter::new()).await?;
        info!("Deleted {} {}", deleted, schema.collection);
        counts.push((schema.collection, deleted));
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::database::MemoryStore;
    use crate::filter::{Condition, FindQuery};
    use crate::database::schema::FieldKind;

    const USER_ID: &str = "5d7a514b-5d2c-4c3a-8a1a-000000000001";
    const BOOTCAMP_ID: &str = "5d713995-b721-4c3a-8a1a-000000000002";

    fn write_fixtures(dir: &Path) {
        std::fs::write(
            dir.join("users.json"),
            json!([{ "id": USER_ID, "name": "Pub", "email": "pub@example.com", "role": "publisher", "password": "123456" }]).to_string(),
        )
        .unwrap();
        std::fs::write(
            dir.join("bootcamps.json"),
            json!([{ "id": BOOTCAMP_ID, "user": USER_ID, "name": "Devworks", "description": "d", "careers": ["Business"] }]).to_string(),
        )
        .unwrap();
        std::fs::write(
            dir.join("courses.json"),
            json!([{ "title": "Front End", "description": "d", "weeks": "8", "tuition": 8000,
                     "minimumSkill": "beginner", "bootcamp": BOOTCAMP_ID, "user": USER_ID }]).to_string(),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn import_keeps_ids_and_hashes_passwords() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());

        let counts = import(store.clone(), dir.path()).await.unwrap();
        assert_eq!(counts, vec![("users", 1), ("bootcamps", 1), ("courses", 1)]);

        let bootcamp = Repository::new(store.clone(), &BOOTCAMPS).select_404(BOOTCAMP_ID).await.unwrap();
        assert_eq!(bootcamp["user"], json!(USER_ID));

        let courses = store
            .find(&COURSES, &FindQuery::filtered(Filter::new().with(Condition::eq("bootcamp", FieldKind::Reference, json!(BOOTCAMP_ID)))))
            .await
            .unwrap();
        assert_eq!(courses.len(), 1);

        let user = Repository::new(store.clone(), &USERS)
            .select_with_hidden(Filter::new().with(Condition::eq("email", FieldKind::String, json!("pub@example.com"))))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user["id"], json!(USER_ID));
        assert!(verify_password("123456", user["password"].as_str().unwrap()));
    }

    #[tokio::test]
    async fn destroy_empties_every_collection() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        import(store.clone(), dir.path()).await.unwrap();

        let counts = destroy(store.clone()).await.unwrap();
        assert_eq!(counts, vec![("courses", 1), ("bootcamps", 1), ("users", 1)]);
        for (schema, _) in FIXTURES {
            assert_eq!(store.count(schema, &Filter::new()).await.unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn invalid_fixture_reports_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bootcamps.json"), json!([{ "description": "no name" }]).to_string()).unwrap();
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());

        let err = import(store, dir.path()).await.unwrap_err();
        assert!(format!("{:#}", err).contains("Please add a name"));
    }
}
