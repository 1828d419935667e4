//! Documents exchanged with the downstream executor service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    build::{BuildSubmission, SessionEndpoints},
    error::ModelError,
    ids::BuildId,
};

/// Addresses on this server the executor calls back into for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackUrls {
    pub logs: Url,
    pub bits: Url,
    pub result: Url,
}

impl CallbackUrls {
    /// Builds the callback set from the externally reachable `host:port`
    /// the executor uses to reach us.
    pub fn for_build(peer_addr: &str, id: &BuildId) -> Result<Self, ModelError> {
        let peer = peer_addr.trim().trim_end_matches('/');
        if peer.is_empty() {
            return Err(ModelError::InvalidUrl(
                "peer address cannot be empty".to_string(),
            ));
        }

        let parse = |raw: String| {
            Url::parse(&raw)
                .map_err(|err| ModelError::InvalidUrl(format!("{raw}: {err}")))
        };

        Ok(Self {
            logs: parse(format!("ws://{peer}/builds/{id}/log/input"))?,
            bits: parse(format!("http://{peer}/builds/{id}/bits"))?,
            result: parse(format!("http://{peer}/builds/{id}/result"))?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorBuildConfig {
    pub image: String,
    #[serde(default)]
    pub script: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorInputSource {
    pub uri: Url,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorInput {
    /// Always `raw`: the executor fetches the bytes from `source.uri`.
    #[serde(rename = "type")]
    pub kind: String,
    pub source: ExecutorInputSource,
    #[serde(default)]
    pub destination_path: String,
}

/// Delegation request POSTed to `{executor_url}/builds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorBuild {
    pub guid: BuildId,
    pub logs_url: Url,
    pub callback: Url,
    pub config: ExecutorBuildConfig,
    pub inputs: Vec<ExecutorInput>,
}

impl ExecutorBuild {
    pub const RAW_INPUT: &'static str = "raw";

    pub fn new(
        id: BuildId,
        submission: &BuildSubmission,
        callbacks: CallbackUrls,
    ) -> Self {
        Self {
            guid: id,
            logs_url: callbacks.logs,
            callback: callbacks.result,
            config: ExecutorBuildConfig {
                image: submission.image.clone(),
                script: submission.script.clone(),
                env: submission.env.clone(),
            },
            inputs: vec![ExecutorInput {
                kind: Self::RAW_INPUT.to_string(),
                source: ExecutorInputSource { uri: callbacks.bits },
                destination_path: submission.path.clone(),
            }],
        }
    }
}

/// Optional body of the executor's 201 response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorAcceptance {
    #[serde(default)]
    pub abort_url: Option<Url>,
    #[serde(default)]
    pub hijack_url: Option<Url>,
}

impl From<ExecutorAcceptance> for SessionEndpoints {
    fn from(value: ExecutorAcceptance) -> Self {
        SessionEndpoints {
            abort_url: value.abort_url,
            hijack_url: value.hijack_url,
        }
    }
}
