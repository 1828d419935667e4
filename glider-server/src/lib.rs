//! HTTP surface of the Glider build-coordination server.
//!
//! Routes are thin: each handler resolves the build named in its path and
//! hands off to [`glider_core::Coordinator`]. Log streams are WebSockets and
//! the hijack route upgrades into a raw tunnel to the executor.

pub mod handlers;
pub mod hijack;
pub mod infra;
pub mod routes;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use infra::app_state::AppState;

/// Router with state and middleware applied, ready to serve.
pub fn create_app(state: AppState) -> Router {
    routes::create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves `app` on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    app: Router,
    shutdown: F,
) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
