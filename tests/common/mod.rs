#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;

use devcamper_api::auth::hash_password;
use devcamper_api::config::AppConfig;
use devcamper_api::database::models::USERS;
use devcamper_api::database::{Document, DocumentStore, MemoryStore, Repository};
use devcamper_api::AppState;

pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: Arc<dyn DocumentStore>,
    pub uploads: TempDir,
}

impl TestServer {
    /// Serve the full router over a fresh in-memory store on an unused port.
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let uploads = tempfile::tempdir().context("failed to create upload dir")?;

        let mut config = AppConfig::development();
        config.server.enable_request_logging = false;
        config.upload.file_upload_path = uploads.path().to_path_buf();
        configure(&mut config);

        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;

        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let app = devcamper_api::app(AppState::new(store.clone(), config));
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let server = Self {
            base_url: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
            store,
            uploads,
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub fn post(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token)
    }

    pub fn put(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.put(self.url(path)).bearer_auth(token)
    }

    pub fn delete(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(token)
    }

    /// Register a user with `role` and return its token.
    pub async fn register(&self, email: &str, role: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/api/v1/auth/register"))
            .json(&json!({ "name": email, "email": email, "password": "123456", "role": role }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());
        let body: Value = res.json().await?;
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("register response has no token")
    }

    /// Admins cannot self-register; write one straight to the store and log in.
    pub async fn admin(&self, email: &str) -> Result<String> {
        let mut user = Document::new();
        user.insert("name".into(), json!("Admin"));
        user.insert("email".into(), json!(email));
        user.insert("role".into(), json!("admin"));
        user.insert("password".into(), json!(hash_password("123456")?));
        Repository::new(self.store.clone(), &USERS)
            .insert_prepared(user, Document::new())
            .await?;

        let res = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .json(&json!({ "email": email, "password": "123456" }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "admin login failed: {}", res.status());
        let body: Value = res.json().await?;
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("login response has no token")
    }

    /// The id of the user behind `token`.
    pub async fn user_id(&self, token: &str) -> Result<String> {
        let body: Value = self
            .client
            .get(self.url("/api/v1/auth/me"))
            .bearer_auth(token)
            .send()
            .await?
            .json()
            .await?;
        body["data"]["id"].as_str().map(str::to_string).context("me response has no id")
    }

    pub async fn create_bootcamp(&self, token: &str, name: &str) -> Result<Value> {
        let res = self
            .post("/api/v1/bootcamps", token)
            .json(&bootcamp_body(name))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "create bootcamp failed: {}", res.status());
        let body: Value = res.json().await?;
        Ok(body["data"].clone())
    }

    pub async fn create_course(&self, token: &str, bootcamp_id: &str, title: &str, tuition: u64) -> Result<Value> {
        let res = self
            .post(&format!("/api/v1/bootcamps/{}/courses", bootcamp_id), token)
            .json(&course_body(title, tuition))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "create course failed: {}", res.status());
        let body: Value = res.json().await?;
        Ok(body["data"].clone())
    }
}

pub fn bootcamp_body(name: &str) -> Value {
    json!({
        "name": name,
        "description": format!("{} teaches full stack web development", name),
        "careers": ["Web Development", "Business"],
        "averageCost": 10000,
        "housing": true
    })
}

pub fn course_body(title: &str, tuition: u64) -> Value {
    json!({
        "title": title,
        "description": "Learn the essentials",
        "weeks": "8",
        "tuition": tuition,
        "minimumSkill": "beginner"
    })
}

pub fn id_of(doc: &Value) -> String {
    doc["id"].as_str().unwrap_or_default().to_string()
}
