pub mod error;

use std::{
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use once_cell::sync::Lazy;
use tracing::debug;
use url::Url;

use crate::{
    constants::{
        BITS_FETCH_TIMEOUT_ENV, BITS_PICKUP_TIMEOUT_ENV,
        DEFAULT_BITS_FETCH_TIMEOUT, DEFAULT_BITS_PICKUP_TIMEOUT,
        DEFAULT_EXECUTOR_TIMEOUT, DEFAULT_EXECUTOR_URL, DEFAULT_LISTEN_ADDR,
        EXECUTOR_TIMEOUT_ENV,
    },
    models::{
        BitsConfig, Config, ConfigMetadata, ExecutorConfig, ServerConfig,
        sources::{EnvConfig, FileConfig},
    },
    util::non_blank,
    validation::{ConfigWarning, ConfigWarnings},
};

use error::ConfigLoadError;

static DEFAULT_CONFIG_CANDIDATES: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("glider.toml"),
        PathBuf::from("config").join("glider.toml"),
    ]
});

#[derive(Debug, Clone, Default)]
pub struct ConfigLoaderOptions {
    /// Explicit TOML file. Missing files are an error when set.
    pub config_path: Option<PathBuf>,
    /// Explicit `.env` file. Without it `.env` is loaded from the working
    /// directory when one exists.
    pub env_file: Option<PathBuf>,
}

/// Highest-precedence values, normally taken from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub listen_addr: Option<String>,
    pub peer_addr: Option<String>,
    pub executor_url: Option<String>,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
    overrides: ConfigOverrides,
    env: Option<EnvConfig>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Use a pre-gathered environment layer instead of reading `.env` and
    /// the process environment.
    pub fn env(mut self, env: EnvConfig) -> Self {
        self.env = Some(env);
        self
    }

    pub fn load(self) -> Result<ConfigLoad, ConfigLoadError> {
        let mut metadata = ConfigMetadata::default();

        let env = match self.env {
            Some(env) => env,
            None => {
                metadata.env_file_loaded =
                    load_env_file(self.options.env_file.as_deref())?;
                EnvConfig::gather()
            }
        };

        let explicit_path =
            self.options.config_path.clone().or(env.config_path.clone());
        let file = match resolve_config_path(explicit_path)? {
            Some(path) => {
                let file = read_file_config(&path)?;
                metadata.config_path = Some(path);
                file
            }
            None => FileConfig::default(),
        };

        compose(self.overrides, env, file, metadata)
    }
}

fn load_env_file(path: Option<&Path>) -> Result<bool, ConfigLoadError> {
    match path {
        Some(path) => {
            dotenvy::from_path(path).map_err(|source| {
                ConfigLoadError::EnvFile {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            Ok(true)
        }
        None => Ok(dotenvy::dotenv().is_ok()),
    }
}

fn resolve_config_path(
    explicit: Option<PathBuf>,
) -> Result<Option<PathBuf>, ConfigLoadError> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(ConfigLoadError::ConfigFileNotFound { path });
        }
        return Ok(Some(path));
    }

    Ok(DEFAULT_CONFIG_CANDIDATES
        .iter()
        .find(|candidate| candidate.is_file())
        .cloned())
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| {
        ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?;
    debug!(path = %path.display(), "loaded config file");
    toml::from_str(&raw).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn compose(
    overrides: ConfigOverrides,
    env: EnvConfig,
    file: FileConfig,
    metadata: ConfigMetadata,
) -> Result<ConfigLoad, ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    for name in &env.unparsed {
        warnings.push(
            ConfigWarning::new(format!("{name} is not a millisecond count"))
                .with_hint("falling back to the file or default value"),
        );
    }

    let listen_raw = non_blank(overrides.listen_addr)
        .or(env.listen_addr)
        .or(non_blank(file.server.listen_addr))
        .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
    let listen_addr: SocketAddr = listen_raw.parse().map_err(|source| {
        ConfigLoadError::InvalidListenAddr {
            value: listen_raw.clone(),
            source,
        }
    })?;

    let peer_addr = non_blank(overrides.peer_addr)
        .or(env.peer_addr)
        .or(non_blank(file.server.peer_addr))
        .ok_or(ConfigLoadError::MissingPeerAddr)?;
    if peer_is_local(&peer_addr) {
        warnings.push(
            ConfigWarning::new(format!(
                "peer address `{peer_addr}` is local to this host"
            ))
            .with_hint("remote executors will not be able to call back"),
        );
    }

    let executor_raw = non_blank(overrides.executor_url)
        .or(env.executor_url)
        .or(non_blank(file.executor.url))
        .unwrap_or_else(|| DEFAULT_EXECUTOR_URL.to_string());
    let executor_url = Url::parse(&executor_raw).map_err(|source| {
        ConfigLoadError::InvalidExecutorUrl {
            value: executor_raw.clone(),
            source,
        }
    })?;
    if !matches!(executor_url.scheme(), "http" | "https") {
        return Err(ConfigLoadError::UnsupportedExecutorScheme {
            value: executor_raw,
        });
    }

    let request_timeout = non_zero(
        EXECUTOR_TIMEOUT_ENV,
        env.executor_timeout
            .or(file.executor.timeout_ms.map(Duration::from_millis))
            .unwrap_or(DEFAULT_EXECUTOR_TIMEOUT),
    )?;
    let fetch_timeout = non_zero(
        BITS_FETCH_TIMEOUT_ENV,
        env.bits_fetch_timeout
            .or(file.bits.fetch_timeout_ms.map(Duration::from_millis))
            .unwrap_or(DEFAULT_BITS_FETCH_TIMEOUT),
    )?;
    let pickup_timeout = non_zero(
        BITS_PICKUP_TIMEOUT_ENV,
        env.bits_pickup_timeout
            .or(file.bits.pickup_timeout_ms.map(Duration::from_millis))
            .unwrap_or(DEFAULT_BITS_PICKUP_TIMEOUT),
    )?;
    if pickup_timeout < fetch_timeout {
        warnings.push(
            ConfigWarning::new(
                "bits pickup timeout is shorter than the fetch timeout",
            )
            .with_hint("uploads may be withdrawn before the executor arrives"),
        );
    }

    Ok(ConfigLoad {
        config: Config {
            server: ServerConfig {
                listen_addr,
                peer_addr,
            },
            executor: ExecutorConfig {
                url: executor_url,
                request_timeout,
            },
            bits: BitsConfig {
                fetch_timeout,
                pickup_timeout,
            },
            metadata,
        },
        warnings,
    })
}

fn non_zero(
    name: &'static str,
    value: Duration,
) -> Result<Duration, ConfigLoadError> {
    if value.is_zero() {
        return Err(ConfigLoadError::ZeroTimeout { name });
    }
    Ok(value)
}

fn peer_is_local(peer_addr: &str) -> bool {
    let host = match peer_addr.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => peer_addr,
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.parse::<IpAddr>()
        .map(|ip| ip.is_loopback() || ip.is_unspecified())
        .unwrap_or(false)
}
