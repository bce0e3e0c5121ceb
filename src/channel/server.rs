use super::AdminChannel;
use super::command::{AdminCommand, WireReply};
use super::http::COMMAND_PATH;
use crate::core::ZoneError;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::warn;

#[derive(Clone)]
struct AdminState {
    channel: Arc<dyn AdminChannel>,
}

/// Exposes an [`AdminChannel`] over HTTP.
///
/// Routes:
/// - `POST /admin/command`: body is an [`AdminCommand`], reply a [`WireReply`]
/// - `GET /health`
pub fn admin_router(channel: Arc<dyn AdminChannel>) -> Router {
    Router::new()
        .route(COMMAND_PATH, post(run_command))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(AdminState { channel })
}

async fn health() -> &'static str {
    "ok"
}

async fn run_command(
    State(state): State<AdminState>,
    Json(command): Json<AdminCommand>,
) -> Response {
    let name = command.name();
    match state.channel.run_command(command).await {
        Ok(reply) => (StatusCode::OK, Json(WireReply::from(reply))).into_response(),
        Err(err) => {
            warn!(command = name, error = %err, "admin command could not be served");
            let status = match err {
                ZoneError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let body = WireReply {
                ok: false,
                result: None,
                errmsg: Some(err.to_string()),
            };
            (status, Json(body)).into_response()
        }
    }
}
