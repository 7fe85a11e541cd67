mod common;

use anyhow::Result;
use common::{id_of, TestServer};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn publisher_creates_and_reads_a_bootcamp() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.register("john@devcamper.io", "publisher").await?;
    let user_id = server.user_id(&token).await?;

    let bootcamp = server.create_bootcamp(&token, "Devworks Bootcamp").await?;
    assert_eq!(bootcamp["user"], json!(user_id));
    assert_eq!(bootcamp["photo"], json!("no-photo.jpg"));
    assert_eq!(bootcamp["jobGuarantee"], json!(false));
    assert!(bootcamp["createdAt"].is_string());

    let res = server.get(&format!("/api/v1/bootcamps/{}", id_of(&bootcamp))).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["name"], json!("Devworks Bootcamp"));
    Ok(())
}

#[tokio::test]
async fn plain_users_cannot_publish() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.register("sasha@devcamper.io", "user").await?;

    let res = server
        .post("/api/v1/bootcamps", &token)
        .json(&common::bootcamp_body("Devworks"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], json!("User role user is not authorized to access this route"));
    Ok(())
}

#[tokio::test]
async fn create_rejects_invalid_bodies() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.register("john@devcamper.io", "publisher").await?;

    let res = server
        .post("/api/v1/bootcamps", &token)
        .json(&json!({ "description": "missing a name" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert!(body["error"].as_str().unwrap().contains("Please add a name"));

    let mut bad_career = common::bootcamp_body("Devworks");
    bad_career["careers"] = json!(["Basket Weaving"]);
    let res = server.post("/api/v1/bootcamps", &token).json(&bad_career).send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    server.create_bootcamp(&token, "Devworks").await?;
    let res = server
        .post("/api/v1/bootcamps", &token)
        .json(&common::bootcamp_body("Devworks"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], json!("Duplicate field value entered"));
    Ok(())
}

#[tokio::test]
async fn only_the_owner_or_an_admin_may_change_a_bootcamp() -> Result<()> {
    let server = TestServer::spawn().await?;
    let owner = server.register("john@devcamper.io", "publisher").await?;
    let other = server.register("kevin@devcamper.io", "publisher").await?;
    let bootcamp = server.create_bootcamp(&owner, "Devworks").await?;
    let path = format!("/api/v1/bootcamps/{}", id_of(&bootcamp));

    let res = server.put(&path, &other).json(&json!({ "housing": false })).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server.put(&path, &owner).json(&json!({ "housing": false })).send().await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["housing"], json!(false));
    assert_eq!(body["data"]["name"], json!("Devworks"));

    let res = server.delete(&path, &other).send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn deleting_a_bootcamp_removes_its_courses() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.register("john@devcamper.io", "publisher").await?;
    let bootcamp = server.create_bootcamp(&token, "Devworks").await?;
    let bootcamp_id = id_of(&bootcamp);
    let course = server.create_course(&token, &bootcamp_id, "Front End", 8000).await?;

    let res = server.delete(&format!("/api/v1/bootcamps/{}", bootcamp_id), &token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body, json!({ "success": true, "data": {} }));

    let res = server.get(&format!("/api/v1/bootcamps/{}", bootcamp_id)).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let res = server.get(&format!("/api/v1/courses/{}", id_of(&course))).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_not_found() -> Result<()> {
    let server = TestServer::spawn().await?;

    let missing = "5d725a1b-7b29-4f3c-9d8b-2f5e4c3a1b00";
    let res = server.get(&format!("/api/v1/bootcamps/{}", missing)).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await?;
    assert_eq!(body["error"], json!(format!("No bootcamp with id of {}", missing)));

    let res = server.get("/api/v1/bootcamps/not-an-id").send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn listing_attaches_courses() -> Result<()> {
    let server = TestServer::spawn().await?;
    let token = server.register("john@devcamper.io", "publisher").await?;
    let bootcamp = server.create_bootcamp(&token, "Devworks").await?;
    server.create_course(&token, &id_of(&bootcamp), "Front End", 8000).await?;
    server.create_bootcamp(&token, "ModernTech").await?;

    let body: Value = server.get("/api/v1/bootcamps?sort=name").send().await?.json().await?;
    assert_eq!(body["count"], json!(2));
    assert_eq!(body["pagination"], json!({}));

    let data = body["data"].as_array().unwrap();
    assert_eq!(data[0]["name"], json!("Devworks"));
    let courses = data[0]["courses"].as_array().unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0]["title"], json!("Front End"));
    assert_eq!(data[1]["courses"], json!([]));
    Ok(())
}
