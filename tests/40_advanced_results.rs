mod common;

use anyhow::{Context, Result};
use common::{id_of, TestServer};
use devcamper_api::database::models::BOOTCAMPS;
use devcamper_api::database::{Document, Repository};
use reqwest::StatusCode;
use serde_json::{json, Value};

/// Five bootcamps with average costs 1000..=5000, created in that order.
async fn seeded() -> Result<TestServer> {
    let server = TestServer::spawn().await?;
    let token = server.register("john@devcamper.io", "publisher").await?;
    for i in 1..=5u64 {
        let mut body = common::bootcamp_body(&format!("Bootcamp {}", i));
        body["averageCost"] = json!(i * 1000);
        body["housing"] = json!(i % 2 == 0);
        if i == 5 {
            body["careers"] = json!(["Data Science"]);
        }
        let res = server.post("/api/v1/bootcamps", &token).json(&body).send().await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "seed failed: {}", res.status());
    }
    Ok(server)
}

async fn list(server: &TestServer, query: &str) -> Result<Value> {
    let res = server.get(&format!("/api/v1/bootcamps{}", query)).send().await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "list failed: {}", res.status());
    Ok(res.json().await?)
}

fn names(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .map(|items| items.iter().filter_map(|b| b["name"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn comparison_operators_filter_the_page() -> Result<()> {
    let server = seeded().await?;

    let body = list(&server, "?averageCost[lte]=3000&sort=averageCost").await?;
    assert_eq!(names(&body), vec!["Bootcamp 1", "Bootcamp 2", "Bootcamp 3"]);
    assert_eq!(body["count"], json!(3));

    let body = list(&server, "?averageCost[gt]=2000&averageCost[lt]=5000&sort=-averageCost").await?;
    assert_eq!(names(&body), vec!["Bootcamp 4", "Bootcamp 3"]);

    let body = list(&server, "?housing=true&sort=name").await?;
    assert_eq!(names(&body), vec!["Bootcamp 2", "Bootcamp 4"]);
    Ok(())
}

#[tokio::test]
async fn in_operator_matches_array_fields() -> Result<()> {
    let server = seeded().await?;

    let body = list(&server, "?careers[in]=Data%20Science").await?;
    assert_eq!(names(&body), vec!["Bootcamp 5"]);

    let body = list(&server, "?careers[in]=Data%20Science,Business&sort=name").await?;
    assert_eq!(body["count"], json!(5));
    Ok(())
}

#[tokio::test]
async fn select_projects_fields_and_keeps_the_id() -> Result<()> {
    let server = seeded().await?;

    let body = list(&server, "?select=name,averageCost&sort=averageCost&limit=1").await?;
    let first = &body["data"][0];
    assert_eq!(first["name"], json!("Bootcamp 1"));
    assert_eq!(first["averageCost"], json!(1000));
    assert!(!id_of(first).is_empty());
    assert!(first.get("description").is_none());
    assert!(first.get("housing").is_none());
    Ok(())
}

#[tokio::test]
async fn default_sort_is_newest_first() -> Result<()> {
    let server = TestServer::spawn().await?;
    let bootcamps = Repository::new(server.store.clone(), &BOOTCAMPS);
    // inserted out of order so neither insertion order nor its reverse passes
    for (name, created_at) in [
        ("Middle", "2024-03-01T00:00:00.000Z"),
        ("Oldest", "2024-01-01T00:00:00.000Z"),
        ("Newest", "2024-05-01T00:00:00.000Z"),
    ] {
        let body = common::bootcamp_body(name);
        let doc = BOOTCAMPS
            .prepare_create(body.as_object().context("bootcamp body is an object")?)
            .map_err(|e| anyhow::anyhow!(e.message()))?;
        let mut derived = Document::new();
        derived.insert("createdAt".into(), json!(created_at));
        bootcamps.insert_prepared(doc, derived).await?;
    }

    let body = list(&server, "").await?;
    assert_eq!(names(&body), vec!["Newest", "Middle", "Oldest"]);

    let body = list(&server, "?sort=createdAt").await?;
    assert_eq!(names(&body), vec!["Oldest", "Middle", "Newest"]);
    Ok(())
}

#[tokio::test]
async fn pages_link_to_their_neighbours() -> Result<()> {
    let server = seeded().await?;

    let body = list(&server, "?sort=averageCost&limit=2").await?;
    assert_eq!(names(&body), vec!["Bootcamp 1", "Bootcamp 2"]);
    assert_eq!(body["pagination"], json!({ "next": { "page": 2, "limit": 2 } }));

    let body = list(&server, "?sort=averageCost&limit=2&page=2").await?;
    assert_eq!(names(&body), vec!["Bootcamp 3", "Bootcamp 4"]);
    assert_eq!(
        body["pagination"],
        json!({ "next": { "page": 3, "limit": 2 }, "prev": { "page": 1, "limit": 2 } })
    );

    let body = list(&server, "?sort=averageCost&limit=2&page=3").await?;
    assert_eq!(names(&body), vec!["Bootcamp 5"]);
    assert_eq!(body["pagination"], json!({ "prev": { "page": 2, "limit": 2 } }));
    Ok(())
}

#[tokio::test]
async fn pagination_total_counts_the_whole_collection() -> Result<()> {
    let server = seeded().await?;

    // one matching row, but five bootcamps overall
    let body = list(&server, "?careers[in]=Data%20Science&limit=2").await?;
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["pagination"], json!({ "next": { "page": 2, "limit": 2 } }));
    Ok(())
}

#[tokio::test]
async fn unknown_query_fields_are_rejected() -> Result<()> {
    let server = seeded().await?;

    let res = server.get("/api/v1/bootcamps?password=x").send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server.get("/api/v1/bootcamps?sort=nonsense").send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], json!(false));
    Ok(())
}
