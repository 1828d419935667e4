//! Outbound client for the executor service.

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use glider_config::ExecutorConfig;
use glider_model::{ExecutorAcceptance, ExecutorBuild};
use reqwest::{Client, Method, StatusCode, header::CONTENT_TYPE};
use tracing::{debug, warn};
use url::Url;

use crate::error::ExecutorError;

/// Caller request relayed to an executor endpoint.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub method: Method,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Executor reply passed back to the caller unchanged.
#[derive(Debug, Clone)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[async_trait]
pub trait Executor: Send + Sync + Debug {
    /// Delegates a build. `Ok` means the executor answered 201.
    async fn submit(
        &self,
        build: &ExecutorBuild,
    ) -> Result<ExecutorAcceptance, ExecutorError>;

    /// Forwards `request` to a session endpoint the executor handed out.
    async fn relay(
        &self,
        url: &Url,
        request: RelayRequest,
    ) -> Result<RelayResponse, ExecutorError>;
}

#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
    builds_url: Url,
}

impl HttpExecutor {
    pub fn new(config: &ExecutorConfig) -> Result<Self, ExecutorError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_client(client, config.builds_url()))
    }

    pub fn with_client(client: Client, builds_url: Url) -> Self {
        Self { client, builds_url }
    }

    pub fn builds_url(&self) -> &Url {
        &self.builds_url
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn submit(
        &self,
        build: &ExecutorBuild,
    ) -> Result<ExecutorAcceptance, ExecutorError> {
        let response = self
            .client
            .post(self.builds_url.clone())
            .json(build)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if status != StatusCode::CREATED {
            return Err(ExecutorError::Rejected {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(ExecutorAcceptance::default());
        }
        match serde_json::from_slice(&body) {
            Ok(acceptance) => Ok(acceptance),
            Err(err) => {
                warn!(
                    build_id = %build.guid,
                    error = %err,
                    "executor accepted build with an unreadable body"
                );
                Ok(ExecutorAcceptance::default())
            }
        }
    }

    async fn relay(
        &self,
        url: &Url,
        request: RelayRequest,
    ) -> Result<RelayResponse, ExecutorError> {
        debug!(%url, method = %request.method, "relaying to executor");
        let mut outbound = self
            .client
            .request(request.method, url.clone())
            .body(request.body);
        if let Some(content_type) = request.content_type {
            outbound = outbound.header(CONTENT_TYPE, content_type);
        }

        let response = outbound.send().await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        Ok(RelayResponse {
            status,
            content_type,
            body,
        })
    }
}
