use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use glider_model::BuildId;
use glider_server::hijack::proxy_upgrade;
use reqwest::{Client, header::CONTENT_TYPE};
use serde_json::{Value, json};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};

mod common;
use common::{MockExecutor, TestApp, Verdict};

/// Creates a build and pushes its bits so the executor's session
/// endpoints get recorded.
async fn running_build(client: &Client, app: &TestApp) -> Result<BuildId> {
    let created: Value = client
        .post(app.http("/builds"))
        .json(&json!({ "image": "docker:///busybox" }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    let id: BuildId = created["guid"]
        .as_str()
        .context("guid missing")?
        .parse()?;

    client
        .post(app.http(&format!("/builds/{id}/bits")))
        .body("tarball")
        .send()
        .await?
        .error_for_status()?;
    Ok(id)
}

/// Reads until the blank line ending an HTTP/1.1 response head.
async fn read_head(stream: &mut TcpStream) -> Result<String> {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        let n = stream.read(&mut byte).await?;
        anyhow::ensure!(n == 1, "connection closed mid-head");
        head.push(byte[0]);
    }
    Ok(String::from_utf8(head)?)
}

/// Opens a raw hijack connection and reads past the `101` head.
async fn open_session(app: &TestApp, id: &BuildId) -> Result<TcpStream> {
    let mut stream = TcpStream::connect(app.addr).await?;
    let request = format!(
        "POST /builds/{id}/hijack HTTP/1.1\r\n\
         Host: {}\r\n\
         Connection: Upgrade\r\n\
         Upgrade: tcp\r\n\
         \r\n",
        app.addr
    );
    stream.write_all(request.as_bytes()).await?;

    let head = timeout(Duration::from_secs(5), read_head(&mut stream)).await??;
    anyhow::ensure!(
        head.starts_with("HTTP/1.1 101"),
        "unexpected response head: {head}"
    );
    Ok(stream)
}

#[tokio::test]
async fn hijack_without_session_is_a_server_error() -> Result<()> {
    let executor = MockExecutor::spawn(Verdict::Accept).await?;
    let app = TestApp::spawn(executor.url.clone()).await?;
    let client = Client::new();

    let created: Value = client
        .post(app.http("/builds"))
        .json(&json!({ "image": "docker:///busybox" }))
        .send()
        .await?
        .json()
        .await?;
    let guid = created["guid"].as_str().context("guid missing")?;

    let hijack = client
        .post(app.http(&format!("/builds/{guid}/hijack")))
        .send()
        .await?;
    assert_eq!(hijack.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let abort = client
        .post(app.http(&format!("/builds/{guid}/abort")))
        .send()
        .await?;
    assert_eq!(abort.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let unknown = client
        .post(app.http(&format!("/builds/{}/hijack", BuildId::new())))
        .send()
        .await?;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn hijack_splices_caller_to_executor() -> Result<()> {
    let executor = MockExecutor::spawn(Verdict::AcceptAndFetch).await?;
    let app = TestApp::spawn(executor.url.clone()).await?;
    let client = Client::new();
    let id = running_build(&client, &app).await?;

    let mut stream = open_session(&app, &id).await?;

    stream.write_all(b"ls\n").await?;
    let mut echoed = [0u8; 8];
    timeout(Duration::from_secs(5), stream.read_exact(&mut echoed)).await??;
    assert_eq!(&echoed, b"echo:ls\n");

    stream.write_all(b"pwd\n").await?;
    let mut echoed = [0u8; 9];
    timeout(Duration::from_secs(5), stream.read_exact(&mut echoed)).await??;
    assert_eq!(&echoed, b"echo:pwd\n");

    Ok(())
}

#[tokio::test]
async fn executor_hangup_ends_the_callers_session() -> Result<()> {
    let executor = MockExecutor::spawn(Verdict::AcceptAndFetch).await?;
    let app = TestApp::spawn(executor.url.clone()).await?;
    let client = Client::new();
    let id = running_build(&client, &app).await?;
    let mut stream = open_session(&app, &id).await?;

    stream.write_all(b"exit\n").await?;
    let mut rest = Vec::new();
    timeout(Duration::from_secs(5), stream.read_to_end(&mut rest))
        .await
        .context("caller never saw the session end")??;
    assert!(rest.is_empty());

    Ok(())
}

#[tokio::test]
async fn caller_hangup_ends_the_executors_session() -> Result<()> {
    let executor = MockExecutor::spawn(Verdict::AcceptAndFetch).await?;
    let app = TestApp::spawn(executor.url.clone()).await?;
    let client = Client::new();
    let id = running_build(&client, &app).await?;
    let stream = open_session(&app, &id).await?;

    drop(stream);
    let deadline = Instant::now() + Duration::from_secs(5);
    while executor.record.lock().unwrap().sessions_ended == 0 {
        assert!(
            Instant::now() < deadline,
            "executor side stayed open after the caller left"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    Ok(())
}

#[tokio::test]
async fn declined_upgrade_is_relayed_as_is() -> Result<()> {
    let executor = MockExecutor::spawn(Verdict::Accept).await?;

    let request = Request::builder()
        .method("POST")
        .uri("/builds/ignored/hijack")
        .body(Body::empty())?;
    let response =
        proxy_upgrade(&executor.refusing_hijack_url(), request).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = axum::body::to_bytes(response.into_body(), 1024).await?;
    assert_eq!(body.as_ref(), b"container gone");

    Ok(())
}

#[tokio::test]
async fn abort_relays_the_executor_answer() -> Result<()> {
    let executor = MockExecutor::spawn(Verdict::AcceptAndFetch).await?;
    let app = TestApp::spawn(executor.url.clone()).await?;
    let client = Client::new();
    let id = running_build(&client, &app).await?;

    let response = client
        .post(app.http(&format!("/builds/{id}/abort")))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("text/plain")
    );
    assert_eq!(response.text().await?, "build already finished");

    let aborts = executor.record.lock().unwrap().aborts.clone();
    assert_eq!(aborts, vec!["POST".to_string()]);

    Ok(())
}
