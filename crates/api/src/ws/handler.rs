//! WebSocket endpoint for observing a job's execution live.
//!
//! `GET /api/v1/ws/jobs/{id}` upgrades and then validates before any
//! registration happens: an unknown job refuses the connection with close
//! code 4004; a presented identity that does not own the job refuses with
//! 4003. Anonymous observation (no token) is allowed for lightweight
//! monitoring. Inbound "ping" text frames get a `{"type":"pong"}` reply.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tempero_core::types::DbId;
use tempero_db::repositories::{DeviceRepo, JobRepo};

use crate::auth::jwt::{validate_token, PrincipalKind};
use crate::state::AppState;
use crate::ws::manager::JobWatchManager;

/// Close code: the requested job does not exist.
const CLOSE_JOB_NOT_FOUND: u16 = 4004;
/// Close code: the presented identity does not own the job.
const CLOSE_NOT_OWNER: u16 = 4003;
/// Close code: a token was presented but is invalid.
const CLOSE_BAD_TOKEN: u16 = 4001;

/// Query parameters for the observer endpoint. Browsers cannot set an
/// `Authorization` header on a WebSocket, so the token rides in the query.
#[derive(Debug, Deserialize)]
pub struct WatchQuery {
    pub token: Option<String>,
}

/// HTTP handler that upgrades the connection and hands it to the socket
/// task.
pub async fn watch_job(
    ws: WebSocketUpgrade,
    Path(job_id): Path<DbId>,
    Query(params): Query<WatchQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, job_id, params.token))
}

/// Resolve the observing user id from an optional token. `Ok(None)` is an
/// anonymous observer; `Err` carries the close code to refuse with.
async fn observer_user(
    state: &AppState,
    token: Option<&str>,
) -> Result<Option<DbId>, (u16, &'static str)> {
    let Some(token) = token else {
        return Ok(None);
    };

    let claims = validate_token(token, &state.config.jwt)
        .map_err(|_| (CLOSE_BAD_TOKEN, "Invalid or expired token"))?;

    match claims.kind {
        PrincipalKind::User => Ok(Some(claims.sub)),
        PrincipalKind::Device => {
            // A device may observe jobs of its owning user.
            let device = DeviceRepo::find_by_id(&state.pool, claims.sub)
                .await
                .ok()
                .flatten()
                .ok_or((CLOSE_BAD_TOKEN, "Unknown device credential"))?;
            Ok(Some(device.user_id))
        }
    }
}

/// Manage a single observer connection after upgrade.
///
///   1. Validates the job id and (optional) identity; refuses with a
///      close code before registering anything.
///   2. Registers the observer with [`JobWatchManager`].
///   3. Spawns a sender task forwarding broadcast messages to the sink.
///   4. Answers "ping" frames until the client disconnects or the job
///      completes (the manager closes the channel).
async fn handle_socket(socket: WebSocket, state: AppState, job_id: DbId, token: Option<String>) {
    // Job must exist before any registration happens.
    let job = match JobRepo::find_by_id(&state.pool, job_id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            refuse(socket, CLOSE_JOB_NOT_FOUND, "Job not found").await;
            return;
        }
        Err(e) => {
            tracing::error!(job_id, error = %e, "Job lookup failed for observer");
            refuse(socket, CLOSE_JOB_NOT_FOUND, "Job not found").await;
            return;
        }
    };

    // Presented identity must own the job; no identity means anonymous.
    match observer_user(&state, token.as_deref()).await {
        Ok(Some(user_id)) if user_id != job.user_id => {
            refuse(socket, CLOSE_NOT_OWNER, "Job not owned by this user").await;
            return;
        }
        Ok(_) => {}
        Err((code, reason)) => {
            refuse(socket, code, reason).await;
            return;
        }
    }

    let observer_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(job_id, observer_id = %observer_id, "Observer connected");

    let watch: Arc<JobWatchManager> = Arc::clone(&state.watch_manager);
    let mut rx = watch.attach(job_id, observer_id.clone()).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward broadcast messages to the WebSocket sink.
    let sender_observer_id = observer_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(observer_id = %sender_observer_id, "Observer sink closed");
                break;
            }
        }
    });

    // Receiver loop: keep-alive pings and disconnect detection.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Text(text)) => {
                if text.trim().eq_ignore_ascii_case("ping") {
                    let pong = Message::Text(r#"{"type":"pong"}"#.into());
                    watch.send_to(job_id, &observer_id, pong).await;
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(observer_id = %observer_id, error = %e, "Observer receive error");
                break;
            }
        }
    }

    // Clean up: remove this observer and stop the sender task. After a
    // completion broadcast the registry entry is already gone and this is
    // a no-op.
    watch.detach(job_id, &observer_id).await;
    send_task.abort();
    tracing::info!(job_id, observer_id = %observer_id, "Observer disconnected");
}

/// Refuse a connection with a close code before any registration.
async fn refuse(mut socket: WebSocket, code: u16, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
}
