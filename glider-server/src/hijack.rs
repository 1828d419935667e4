//! Interactive session tunnel into a running build.
//!
//! The caller's request is replayed to the executor's hijack endpoint over a
//! dedicated HTTP/1.1 connection. When the executor switches protocols both
//! connections are upgraded and spliced into one raw byte pipe; no HTTP is
//! spoken past that point. Any other executor answer is relayed as is.

use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::{
        HeaderValue, StatusCode, Uri,
        header::{self, HOST},
    },
    response::Response,
};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, copy, split},
    net::TcpStream,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    handlers::parse_build_id,
    infra::{
        app_state::AppState,
        errors::{AppError, AppResult},
    },
};

#[derive(Debug, Error)]
pub enum HijackError {
    #[error("hijack endpoint {0} has no host")]
    MissingHost(Url),
    #[error("failed to connect to executor: {0}")]
    Connect(#[source] std::io::Error),
    #[error("executor handshake failed: {0}")]
    Handshake(#[source] hyper::Error),
    #[error("invalid upstream request: {0}")]
    Request(#[from] axum::http::Error),
}

impl From<HijackError> for AppError {
    fn from(err: HijackError) -> Self {
        match err {
            HijackError::MissingHost(_) | HijackError::Request(_) => {
                AppError::internal(err.to_string())
            }
            HijackError::Connect(_) | HijackError::Handshake(_) => {
                AppError::bad_gateway(err.to_string())
            }
        }
    }
}

pub async fn hijack_build(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> AppResult<Response> {
    let id = parse_build_id(&id)?;
    let target = state.coordinator().hijack_endpoint(&id)?;
    info!(build_id = %id, %target, "hijacking build");
    Ok(proxy_upgrade(&target, request).await?)
}

/// Replays `request` against `target` and, on `101 Switching Protocols`,
/// splices the caller's upgraded connection to the executor's.
pub async fn proxy_upgrade(
    target: &Url,
    mut request: Request,
) -> Result<Response, HijackError> {
    let host = target
        .host_str()
        .ok_or_else(|| HijackError::MissingHost(target.clone()))?;
    let port = target.port_or_known_default().unwrap_or(80);
    let authority = match target.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let stream = TcpStream::connect((host, port))
        .await
        .map_err(HijackError::Connect)?;
    let (mut sender, connection) = http1::handshake(TokioIo::new(stream))
        .await
        .map_err(HijackError::Handshake)?;
    tokio::spawn(async move {
        if let Err(err) = connection.with_upgrades().await {
            debug!(error = %err, "executor hijack connection ended");
        }
    });

    let caller_upgrade = hyper::upgrade::on(&mut request);
    let (mut parts, body) = request.into_parts();
    parts.uri = origin_form(target)?;
    if let Ok(value) = HeaderValue::from_str(&authority) {
        parts.headers.insert(HOST, value);
    }
    let outbound = Request::from_parts(parts, body);

    let mut upstream = sender
        .send_request(outbound)
        .await
        .map_err(HijackError::Handshake)?;

    if upstream.status() != StatusCode::SWITCHING_PROTOCOLS {
        debug!(status = %upstream.status(), "executor declined hijack");
        return Ok(upstream.map(Body::new));
    }

    let executor_upgrade = hyper::upgrade::on(&mut upstream);
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
    for (name, value) in upstream.headers() {
        if name != header::CONTENT_LENGTH {
            response.headers_mut().append(name.clone(), value.clone());
        }
    }

    tokio::spawn(async move {
        match tokio::try_join!(caller_upgrade, executor_upgrade) {
            Ok((caller, executor)) => {
                splice(TokioIo::new(caller), TokioIo::new(executor)).await;
            }
            Err(err) => warn!(error = %err, "hijack upgrade failed"),
        }
    });

    Ok(response)
}

fn origin_form(target: &Url) -> Result<Uri, HijackError> {
    let path_and_query = match target.query() {
        Some(query) => format!("{}?{query}", target.path()),
        None => target.path().to_string(),
    };
    Ok(Uri::builder().path_and_query(path_and_query).build()?)
}

/// Full-duplex copy between the caller (`a`) and the executor (`b`). The
/// session ends as soon as either direction reaches end of stream or fails:
/// both write halves are shut down and both streams dropped, so neither peer
/// is left holding a half-open connection.
pub async fn splice<A, B>(a: A, b: B)
where
    A: AsyncRead + AsyncWrite,
    B: AsyncRead + AsyncWrite,
{
    let (mut a_read, mut a_write) = split(a);
    let (mut b_read, mut b_write) = split(b);

    let (ended_by, copied) = tokio::select! {
        copied = copy(&mut a_read, &mut b_write) => ("caller", copied),
        copied = copy(&mut b_read, &mut a_write) => ("executor", copied),
    };
    match copied {
        Ok(bytes) => debug!(ended_by, bytes, "hijack session closed"),
        Err(err) => debug!(ended_by, error = %err, "hijack session aborted"),
    }

    let _ = a_write.shutdown().await;
    let _ = b_write.shutdown().await;
}
