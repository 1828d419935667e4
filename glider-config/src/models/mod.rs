pub mod sources;

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use url::Url;

/// Effective configuration of a Glider server process.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub executor: ExecutorConfig,
    pub bits: BitsConfig,
    pub metadata: ConfigMetadata,
}

impl Config {
    pub fn listen_addr(&self) -> SocketAddr {
        self.server.listen_addr
    }

    pub fn peer_addr(&self) -> &str {
        &self.server.peer_addr
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// `host:port` the executor uses to reach this server. Every callback
    /// URL handed to the executor is built from it.
    pub peer_addr: String,
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub url: Url,
    pub request_timeout: Duration,
}

impl ExecutorConfig {
    /// Endpoint that accepts delegated builds.
    pub fn builds_url(&self) -> Url {
        let mut url = self.url.clone();
        let path = format!("{}/builds", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url
    }
}

#[derive(Debug, Clone)]
pub struct BitsConfig {
    /// How long an executor fetch waits for an upload to arrive.
    pub fetch_timeout: Duration,
    /// How long an upload waits for the executor to start fetching.
    pub pickup_timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
