use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::http::StatusCode;
use axum_test::TestServer;
use glider_model::BuildId;
use glider_server::{AppState, create_app, routes::paths};
use serde_json::{Value, json};

mod common;
use common::{test_config, unreachable_url};

async fn test_server() -> Result<TestServer> {
    let addr: SocketAddr = "127.0.0.1:5637".parse()?;
    let config = Arc::new(test_config(addr, unreachable_url().await?));
    let state = AppState::from_config(config)?;
    TestServer::new(create_app(state))
        .map_err(|err| anyhow::anyhow!(err.to_string()))
}

#[tokio::test]
async fn create_returns_the_registered_record() -> Result<()> {
    let server = test_server().await?;

    let response = server
        .post(paths::BUILDS)
        .json(&json!({
            "image": "docker:///busybox",
            "path": "src",
            "script": "make test",
            "env": { "CI": "true" },
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    assert_eq!(body["image"], "docker:///busybox");
    assert_eq!(body["path"], "src");
    assert_eq!(body["script"], "make test");
    assert_eq!(body["env"]["CI"], "true");
    assert_eq!(body["status"], "");
    assert_eq!(body["phase"], "created");
    assert!(body.get("session").is_none());

    let guid = body["guid"].as_str().expect("guid present");
    guid.parse::<BuildId>()?;

    let fetched = server.get(&format!("/builds/{guid}")).await;
    fetched.assert_status_ok();
    let fetched: Value = fetched.json();
    assert_eq!(fetched["guid"], guid);
    assert_eq!(fetched["created_at"], body["created_at"]);

    Ok(())
}

#[tokio::test]
async fn list_is_newest_first() -> Result<()> {
    let server = test_server().await?;

    let mut guids = Vec::new();
    for image in ["docker:///first", "docker:///second", "docker:///third"] {
        let response = server
            .post(paths::BUILDS)
            .json(&json!({ "image": image }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        guids.push(body["guid"].as_str().unwrap_or_default().to_string());
    }

    let listed: Vec<Value> = server.get(paths::BUILDS).await.json();
    let listed: Vec<&str> = listed
        .iter()
        .map(|build| build["guid"].as_str().unwrap_or_default())
        .collect();
    guids.reverse();
    assert_eq!(listed, guids);

    Ok(())
}

#[tokio::test]
async fn submission_without_image_is_rejected() -> Result<()> {
    let server = test_server().await?;

    let response = server
        .post(paths::BUILDS)
        .json(&json!({ "script": "make" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["status"], 400);

    let blank = server
        .post(paths::BUILDS)
        .json(&json!({ "image": "   " }))
        .await;
    blank.assert_status(StatusCode::BAD_REQUEST);

    let listed: Vec<Value> = server.get(paths::BUILDS).await.json();
    assert!(listed.is_empty());

    Ok(())
}

#[tokio::test]
async fn malformed_submission_is_a_client_error() -> Result<()> {
    let server = test_server().await?;

    let response = server.post(paths::BUILDS).text("{\"image\":").await;
    response.assert_status(StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn unknown_builds_are_not_found() -> Result<()> {
    let server = test_server().await?;
    let missing = BuildId::new();

    server
        .get(&format!("/builds/{missing}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get(&format!("/builds/{missing}/result"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .put(&format!("/builds/{missing}/result"))
        .json(&json!({ "status": "succeeded" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get("/builds/not-a-uuid")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn result_is_empty_until_reported() -> Result<()> {
    let server = test_server().await?;

    let created: Value = server
        .post(paths::BUILDS)
        .json(&json!({ "image": "docker:///busybox" }))
        .await
        .json();
    let guid = created["guid"].as_str().unwrap_or_default().to_string();
    let result_path = format!("/builds/{guid}/result");

    let pending: Value = server.get(&result_path).await.json();
    assert_eq!(pending, json!({ "status": "" }));

    server
        .put(&result_path)
        .json(&json!({ "status": "" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let reported = server
        .put(&result_path)
        .json(&json!({ "status": "succeeded" }))
        .await;
    reported.assert_status_ok();
    assert_eq!(reported.json::<Value>(), json!({ "status": "succeeded" }));

    let stored: Value = server.get(&result_path).await.json();
    assert_eq!(stored["status"], "succeeded");

    let build: Value = server.get(&format!("/builds/{guid}")).await.json();
    assert_eq!(build["status"], "succeeded");
    assert_eq!(build["phase"], "completed");

    server
        .put(&result_path)
        .json(&json!({ "status": "failed" }))
        .await
        .assert_status(StatusCode::CONFLICT);
    let unchanged: Value = server.get(&result_path).await.json();
    assert_eq!(unchanged["status"], "succeeded");

    Ok(())
}

#[tokio::test]
async fn health_reports_registered_builds() -> Result<()> {
    let server = test_server().await?;

    let empty: Value = server.get(paths::HEALTH).await.json();
    assert_eq!(empty, json!({ "status": "ok", "builds": 0 }));

    server
        .post(paths::BUILDS)
        .json(&json!({ "image": "docker:///busybox" }))
        .await
        .assert_status(StatusCode::CREATED);

    let one: Value = server.get(paths::HEALTH).await.json();
    assert_eq!(one["builds"], 1);

    Ok(())
}
