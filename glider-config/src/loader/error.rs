use std::{net::AddrParseError, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("config file {path} does not exist")]
    ConfigFileNotFound { path: PathBuf },
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to load env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
    #[error(
        "peer address is required (set --peer-addr, GLIDER_PEER_ADDR, or \
         [server].peer_addr)"
    )]
    MissingPeerAddr,
    #[error("invalid listen address `{value}`: {source}")]
    InvalidListenAddr {
        value: String,
        #[source]
        source: AddrParseError,
    },
    #[error("invalid executor url `{value}`: {source}")]
    InvalidExecutorUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("executor url `{value}` must use http or https")]
    UnsupportedExecutorScheme { value: String },
    #[error("{name} must be greater than zero")]
    ZeroTimeout { name: &'static str },
}
