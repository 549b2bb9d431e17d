use std::future::Future;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tracing::info;

use crate::{application::state::SharedState, domain::error::DomainError, interfaces::slack};

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/slack/actions", post(slack::actions_handler))
        .with_state(state)
}

pub async fn serve(
    listener: TcpListener,
    state: SharedState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DomainError> {
    let local_addr = listener.local_addr().map_err(|error| {
        DomainError::Unavailable(format!("failed to read listener address: {error}"))
    })?;

    info!(
        "approval-relay listening on http://{}:{}",
        local_addr.ip(),
        local_addr.port()
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|error| DomainError::Unavailable(format!("server runtime error: {error}")))
}

async fn healthz_handler(State(state): State<SharedState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "ok": true,
            "uptimeMs": state.uptime().as_millis() as u64,
        })),
    )
}
