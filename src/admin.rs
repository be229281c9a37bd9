use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use mediator_core::AppState;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::bootstrap::Bootstrap;

/// Shared handle every admin route closes over: the connection registry
/// plus the one-time bootstrap coordinator.
#[derive(Clone)]
pub struct ServerState {
    pub app: Arc<AppState>,
    pub bootstrap: Arc<Bootstrap>,
}

pub async fn retrieve_agent_invitation(State(state): State<ServerState>) -> impl IntoResponse {
    let invitation_url = state.bootstrap.agent_invitation_url().await;
    Json(json!({ "invitation_url": invitation_url }))
}

#[derive(Deserialize)]
pub struct ReceiveMediatorInvitation {
    invitation_url: String,
}

pub async fn receive_mediator_invitation(
    State(state): State<ServerState>,
    Json(body): Json<ReceiveMediatorInvitation>,
) -> impl IntoResponse {
    state.bootstrap.submit_mediator_invitation(body.invitation_url);
    StatusCode::OK
}

pub async fn status(State(state): State<ServerState>) -> impl IntoResponse {
    let status = state.app.registry.process_state().await;
    Json(json!({ "status": status }))
}

/// The main DIDComm ingress: a raw packed envelope in, at most one packed
/// reply out. Unhandled failures (no matching connection, malformed
/// envelope) are logged and answered with `202`, matching the teacher's
/// treatment of `handle_message` returning `None`.
pub async fn receive_message(State(state): State<ServerState>, body: axum::body::Bytes) -> impl IntoResponse {
    match state.app.handle_message(&body).await {
        Ok(Some(reply)) => (StatusCode::OK, reply).into_response(),
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(e) => {
            warn!(error = %e, "failed to handle inbound message");
            StatusCode::ACCEPTED.into_response()
        }
    }
}
