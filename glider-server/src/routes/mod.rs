use axum::{
    Router,
    routing::{any, get, post},
};

use crate::{
    handlers::{abort, bits, builds, health, logs, result},
    hijack,
    infra::app_state::AppState,
};

pub mod paths {
    pub const HEALTH: &str = "/healthz";
    pub const BUILDS: &str = "/builds";
    pub const BUILD: &str = "/builds/{id}";
    pub const BUILD_BITS: &str = "/builds/{id}/bits";
    pub const BUILD_RESULT: &str = "/builds/{id}/result";
    pub const BUILD_LOG_INPUT: &str = "/builds/{id}/log/input";
    pub const BUILD_LOG_OUTPUT: &str = "/builds/{id}/log/output";
    pub const BUILD_HIJACK: &str = "/builds/{id}/hijack";
    pub const BUILD_ABORT: &str = "/builds/{id}/abort";
}

/// Every route the server exposes.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(paths::HEALTH, get(health::healthz))
        .route(
            paths::BUILDS,
            post(builds::create_build).get(builds::list_builds),
        )
        .route(paths::BUILD, get(builds::get_build))
        .route(
            paths::BUILD_BITS,
            post(bits::upload_bits).get(bits::fetch_bits),
        )
        .route(
            paths::BUILD_RESULT,
            get(result::get_result).put(result::put_result),
        )
        .route(paths::BUILD_LOG_INPUT, get(logs::log_input))
        .route(paths::BUILD_LOG_OUTPUT, get(logs::log_output))
        .route(paths::BUILD_HIJACK, any(hijack::hijack_build))
        .route(paths::BUILD_ABORT, any(abort::abort_build))
}
