use crate::error::ModelError;
use std::str::FromStr;
use uuid::Uuid;

/// Server-assigned identifier of a build. Serialized as the bare UUID string
/// (the `guid` field on the wire).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct BuildId(pub Uuid);

impl Default for BuildId {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildId {
    /// Fresh random identifier. Never reused within a process.
    pub fn new() -> Self {
        BuildId(Uuid::new_v4())
    }

    pub fn as_str(&self) -> String {
        self.0.to_string()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn to_uuid(&self) -> Uuid {
        self.0
    }
}

impl AsRef<Uuid> for BuildId {
    fn as_ref(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for BuildId {
    fn from(value: Uuid) -> Self {
        BuildId(value)
    }
}

impl FromStr for BuildId {
    type Err = ModelError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ModelError::InvalidId(
                "build id cannot be empty".to_string(),
            ));
        }
        Uuid::parse_str(trimmed)
            .map(BuildId)
            .map_err(|err| ModelError::InvalidId(format!("{trimmed}: {err}")))
    }
}

impl std::fmt::Display for BuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
