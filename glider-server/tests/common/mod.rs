#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    body::Body,
    extract::{Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{any, post},
};
use glider_config::{
    BitsConfig, Config, ConfigMetadata, ExecutorConfig, ServerConfig,
};
use glider_model::ExecutorBuild;
use glider_server::{AppState, create_app, serve};
use hyper_util::rt::TokioIo;
use serde_json::json;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
};
use url::Url;

/// What the mock executor does with a delegated build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// 201 and fetch the bits from the callback URL.
    AcceptAndFetch,
    /// 201 without fetching; the test drives the bits fetch itself.
    Accept,
    /// Refuse with the given status.
    Reject(u16),
}

#[derive(Debug, Default)]
pub struct MockRecord {
    pub builds: Vec<ExecutorBuild>,
    pub fetched: Vec<(Option<String>, Vec<u8>)>,
    pub aborts: Vec<String>,
    /// Hijack sessions whose executor end has shut down.
    pub sessions_ended: usize,
}

#[derive(Debug, Clone)]
struct MockState {
    verdict: Verdict,
    base: Url,
    record: Arc<Mutex<MockRecord>>,
}

/// Stand-in for the executor service, served over real TCP.
#[derive(Debug)]
pub struct MockExecutor {
    pub url: Url,
    pub record: Arc<Mutex<MockRecord>>,
    _task: JoinHandle<()>,
}

impl MockExecutor {
    pub async fn spawn(verdict: Verdict) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let url = Url::parse(&format!("http://{addr}"))?;
        let record = Arc::new(Mutex::new(MockRecord::default()));

        let state = MockState {
            verdict,
            base: url.clone(),
            record: Arc::clone(&record),
        };
        let app = Router::new()
            .route("/builds", post(accept_build))
            .route("/session/hijack", any(hijack_session))
            .route("/session/refuse", any(refuse_hijack))
            .route("/session/abort", any(abort_build))
            .with_state(state);

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            url,
            record,
            _task: task,
        })
    }

    pub fn hijack_url(&self) -> Url {
        self.url.join("/session/hijack").expect("static path")
    }

    pub fn refusing_hijack_url(&self) -> Url {
        self.url.join("/session/refuse").expect("static path")
    }

    pub fn abort_url(&self) -> Url {
        self.url.join("/session/abort").expect("static path")
    }

    pub fn submitted(&self) -> Vec<ExecutorBuild> {
        self.record.lock().unwrap().builds.clone()
    }

    pub fn fetched(&self) -> Vec<(Option<String>, Vec<u8>)> {
        self.record.lock().unwrap().fetched.clone()
    }
}

async fn accept_build(
    State(state): State<MockState>,
    Json(build): Json<ExecutorBuild>,
) -> Response {
    state.record.lock().unwrap().builds.push(build.clone());

    match state.verdict {
        Verdict::Reject(status) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST),
            "no capacity",
        )
            .into_response(),
        Verdict::Accept | Verdict::AcceptAndFetch => {
            if state.verdict == Verdict::AcceptAndFetch {
                let bits_url = build.inputs[0].source.uri.clone();
                let record = Arc::clone(&state.record);
                tokio::spawn(async move {
                    if let Ok(response) = reqwest::get(bits_url).await {
                        let content_type = response
                            .headers()
                            .get(header::CONTENT_TYPE)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        if let Ok(body) = response.bytes().await {
                            record
                                .lock()
                                .unwrap()
                                .fetched
                                .push((content_type, body.to_vec()));
                        }
                    }
                });
            }

            let body = json!({
                "hijack_url": state.base.join("/session/hijack").ok(),
                "abort_url": state.base.join("/session/abort").ok(),
            });
            (StatusCode::CREATED, Json(body)).into_response()
        }
    }
}

/// Upgrades and echoes every byte back prefixed with `echo:`.
/// Echoes every read back with an `echo:` prefix. A line reading `exit`
/// ends the session from the executor side.
async fn hijack_session(
    State(state): State<MockState>,
    mut request: Request,
) -> Response {
    let upgrade = hyper::upgrade::on(&mut request);
    tokio::spawn(async move {
        let Ok(upgraded) = upgrade.await else { return };
        let mut io = TokioIo::new(upgraded);
        let mut buf = [0u8; 1024];
        loop {
            match io.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) if &buf[..n] == b"exit\n" => break,
                Ok(n) => {
                    let mut reply = b"echo:".to_vec();
                    reply.extend_from_slice(&buf[..n]);
                    if io.write_all(&reply).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = io.shutdown().await;
        state.record.lock().unwrap().sessions_ended += 1;
    });

    Response::builder()
        .status(StatusCode::SWITCHING_PROTOCOLS)
        .header(header::CONNECTION, "Upgrade")
        .header(header::UPGRADE, "tcp")
        .body(Body::empty())
        .expect("static response")
}

async fn refuse_hijack() -> Response {
    (StatusCode::FORBIDDEN, "container gone").into_response()
}

async fn abort_build(
    State(state): State<MockState>,
    request: Request,
) -> Response {
    state
        .record
        .lock()
        .unwrap()
        .aborts
        .push(request.method().to_string());
    (
        StatusCode::CONFLICT,
        [(header::CONTENT_TYPE, "text/plain")],
        "build already finished",
    )
        .into_response()
}

/// A Glider server listening on an ephemeral port.
#[derive(Debug)]
pub struct TestApp {
    pub addr: SocketAddr,
    pub state: AppState,
    _task: JoinHandle<()>,
}

impl TestApp {
    pub async fn spawn(executor_url: Url) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let config = Arc::new(test_config(addr, executor_url));
        let state = AppState::from_config(config)
            .context("failed to wire app state")?;
        let app = create_app(state.clone());

        let task = tokio::spawn(async move {
            let _ = serve(listener, app, std::future::pending()).await;
        });

        Ok(Self {
            addr,
            state,
            _task: task,
        })
    }

    pub fn http(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn ws(&self, path: &str) -> String {
        format!("ws://{}{path}", self.addr)
    }
}

pub fn test_config(addr: SocketAddr, executor_url: Url) -> Config {
    Config {
        server: ServerConfig {
            listen_addr: addr,
            peer_addr: addr.to_string(),
        },
        executor: ExecutorConfig {
            url: executor_url,
            request_timeout: Duration::from_secs(5),
        },
        bits: BitsConfig {
            fetch_timeout: Duration::from_secs(2),
            pickup_timeout: Duration::from_secs(5),
        },
        metadata: ConfigMetadata::default(),
    }
}

/// URL of a local port nothing listens on.
pub async fn unreachable_url() -> Result<Url> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(Url::parse(&format!("http://{addr}"))?)
}
