//! Webhook ingress: a single passcode-gated POST endpoint.

use crate::payload::CommentPayload;
use crate::router::Router;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router as HttpRouter;
use std::net::SocketAddr;
use std::sync::Arc;

struct WebhookState {
    router: Arc<Router>,
    passcode: String,
}

/// Start the webhook listener on the given address.
pub async fn start_webhook_server(
    bind: SocketAddr,
    router: Arc<Router>,
    passcode: String,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let state = Arc::new(WebhookState { router, passcode });
    let app = HttpRouter::new()
        .route("/", post(receive_webhook))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "webhook listener started");

    let handle = tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, app).await {
            tracing::error!(%error, "webhook listener exited with error");
        }
    });

    Ok(handle)
}

/// Accept one webhook delivery.
///
/// Responds 401 on passcode mismatch and 200 otherwise, before any routing
/// happens; delivery outcomes are never reflected in the HTTP response.
async fn receive_webhook(State(state): State<Arc<WebhookState>>, body: Bytes) -> StatusCode {
    let payload: CommentPayload = serde_json::from_slice(&body).unwrap_or_default();

    if payload.passcode != state.passcode {
        tracing::warn!("invalid passcode for webhook payload");
        return StatusCode::UNAUTHORIZED;
    }

    let router = state.router.clone();
    tokio::spawn(async move {
        router.on_webhook(payload).await;
    });
    StatusCode::OK
}
