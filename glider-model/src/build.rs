use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{error::ModelError, ids::BuildId};

/// What a caller posts to `/builds`. Fixed once the build is registered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSubmission {
    /// Execution image handed to the executor. Required.
    #[serde(default)]
    pub image: String,
    /// Destination path of the uploaded bits inside the build.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub script: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl BuildSubmission {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = script.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_env(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Rejects submissions the executor could never run.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.image.trim().is_empty() {
            return Err(ModelError::MissingField("image"));
        }
        Ok(())
    }
}

/// Where a build sits in its lifecycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BuildPhase {
    /// Registered; nothing uploaded yet.
    #[default]
    Created,
    /// Upload received, delegation to the executor being prepared.
    BitsPending,
    /// Delegation request in flight to the executor.
    BitsInFlight,
    /// Executor accepted the build; bits are being handed over.
    Accepted,
    /// Executor refused the build or could not be reached.
    Rejected,
    /// Bits handed off; the executor owns the build.
    Running,
    /// A terminal status has been recorded and the log is closed.
    Completed,
}

impl BuildPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildPhase::Rejected | BuildPhase::Completed)
    }
}

/// Executor-provided addresses for controlling a running build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEndpoints {
    pub abort_url: Option<Url>,
    pub hijack_url: Option<Url>,
}

impl SessionEndpoints {
    pub fn is_empty(&self) -> bool {
        self.abort_url.is_none() && self.hijack_url.is_none()
    }
}

/// The registry's view of one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub guid: BuildId,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub submission: BuildSubmission,
    /// Unset until the executor reports; empty string on the wire.
    #[serde(default, with = "blank_as_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub phase: BuildPhase,
    /// Executor internals; kept off the wire.
    #[serde(skip)]
    pub session: Option<SessionEndpoints>,
}

impl BuildRecord {
    pub fn new(submission: BuildSubmission) -> Self {
        Self {
            guid: BuildId::new(),
            created_at: Utc::now(),
            submission,
            status: None,
            phase: BuildPhase::Created,
            session: None,
        }
    }

    pub fn image(&self) -> &str {
        &self.submission.image
    }

    pub fn hijack_url(&self) -> Option<&Url> {
        self.session.as_ref().and_then(|s| s.hijack_url.as_ref())
    }

    pub fn abort_url(&self) -> Option<&Url> {
        self.session.as_ref().and_then(|s| s.abort_url.as_ref())
    }
}

/// Terminal status reported by the executor and echoed back to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResult {
    #[serde(default)]
    pub status: String,
}

impl BuildResult {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.status.trim().is_empty() {
            return Err(ModelError::MissingField("status"));
        }
        Ok(())
    }
}

mod blank_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or_default())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.filter(|s| !s.is_empty()))
    }
}
