use std::time::Duration;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5637";
pub const DEFAULT_EXECUTOR_URL: &str = "http://127.0.0.1:4637";

pub const DEFAULT_BITS_FETCH_TIMEOUT: Duration = Duration::from_millis(1_000);
pub const DEFAULT_BITS_PICKUP_TIMEOUT: Duration = Duration::from_millis(60_000);
pub const DEFAULT_EXECUTOR_TIMEOUT: Duration = Duration::from_millis(30_000);

pub const CONFIG_PATH_ENV: &str = "GLIDER_CONFIG";
pub const LISTEN_ADDR_ENV: &str = "GLIDER_LISTEN_ADDR";
pub const PEER_ADDR_ENV: &str = "GLIDER_PEER_ADDR";
pub const EXECUTOR_URL_ENV: &str = "GLIDER_EXECUTOR_URL";
pub const BITS_FETCH_TIMEOUT_ENV: &str = "GLIDER_BITS_FETCH_TIMEOUT_MS";
pub const BITS_PICKUP_TIMEOUT_ENV: &str = "GLIDER_BITS_PICKUP_TIMEOUT_MS";
pub const EXECUTOR_TIMEOUT_ENV: &str = "GLIDER_EXECUTOR_TIMEOUT_MS";
