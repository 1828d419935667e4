use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::{
    constants::{
        BITS_FETCH_TIMEOUT_ENV, BITS_PICKUP_TIMEOUT_ENV, CONFIG_PATH_ENV,
        EXECUTOR_TIMEOUT_ENV, EXECUTOR_URL_ENV, LISTEN_ADDR_ENV, PEER_ADDR_ENV,
    },
    util::{non_blank, parse_millis},
};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub executor: FileExecutorConfig,
    #[serde(default)]
    pub bits: FileBitsConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_addr: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileExecutorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileBitsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_timeout_ms: Option<u64>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub listen_addr: Option<String>,
    pub peer_addr: Option<String>,
    pub executor_url: Option<String>,
    pub executor_timeout: Option<Duration>,
    pub bits_fetch_timeout: Option<Duration>,
    pub bits_pickup_timeout: Option<Duration>,
    /// Variables that were set but could not be parsed.
    pub unparsed: Vec<&'static str>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the env layer from an arbitrary lookup so callers (and tests)
    /// need not touch the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut unparsed = Vec::new();
        let mut millis = |name: &'static str| {
            let raw = non_blank(lookup(name))?;
            let parsed = parse_millis(&raw);
            if parsed.is_none() {
                unparsed.push(name);
            }
            parsed
        };

        let executor_timeout = millis(EXECUTOR_TIMEOUT_ENV);
        let bits_fetch_timeout = millis(BITS_FETCH_TIMEOUT_ENV);
        let bits_pickup_timeout = millis(BITS_PICKUP_TIMEOUT_ENV);

        Self {
            config_path: non_blank(lookup(CONFIG_PATH_ENV)).map(PathBuf::from),
            listen_addr: non_blank(lookup(LISTEN_ADDR_ENV)),
            peer_addr: non_blank(lookup(PEER_ADDR_ENV)),
            executor_url: non_blank(lookup(EXECUTOR_URL_ENV)),
            executor_timeout,
            bits_fetch_timeout,
            bits_pickup_timeout,
            unparsed,
        }
    }
}
