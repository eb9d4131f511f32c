//! WebSocket server and dashboard endpoints using Axum.

use crate::error::MonitorError;
use crate::hub::{HubHandle, VIEWER_OUTBOX_CAPACITY};
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use metrics::counter;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
}

/// Create the HTTP router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Dashboard page: opens `/ws` and renders each received snapshot.
async fn dashboard_handler() -> Html<&'static str> {
    Html(include_str!("../assets/dashboard.html"))
}

/// Health check handler.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let viewers = state.hub.viewer_count().await;
    format!(r#"{{"status":"ok","viewers":{}}}"#, viewers)
}

/// WebSocket upgrade handler.
///
/// A handshake the extractor cannot upgrade (missing or malformed headers)
/// is rejected before any registration happens.
async fn ws_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
) -> Response {
    match ws {
        Ok(ws) => ws
            .on_upgrade(move |socket| handle_socket(socket, state))
            .into_response(),
        Err(rejection) => {
            warn!("WebSocket upgrade rejected: {}", rejection);
            counter!("websocket_upgrade_failures_total").increment(1);
            MonitorError::Upgrade(rejection.to_string()).into_response()
        }
    }
}

/// Handle one accepted viewer connection.
///
/// The channel is receive-only noise detection: inbound frames are consumed
/// and discarded, and the read loop's only job is to notice the peer going
/// away and unregister exactly once. All outbound frames flow through the
/// viewer's outbox, drained by the forward task below.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (tx, mut rx) = mpsc::channel::<Message>(VIEWER_OUTBOX_CAPACITY);
    let viewer_id = state.hub.register(tx.clone());

    // Forward frames from the outbox to the WebSocket.
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_tx.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Keepalive so intermediaries don't idle the connection out.
    let mut ping_interval = interval(Duration::from_secs(30));
    ping_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ping_interval.reset(); // Don't fire immediately

    loop {
        tokio::select! {
            biased;

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if tx.try_send(Message::Pong(data)).is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Viewers are not expected to send commands.
                        debug!("Discarding inbound frame from viewer {}", viewer_id);
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error for viewer {}: {}", viewer_id, e);
                        break;
                    }
                }
            }

            _ = ping_interval.tick() => {
                if tx.try_send(Message::Ping(vec![].into())).is_err() {
                    break;
                }
            }
        }
    }

    state.hub.unregister(viewer_id);
    send_task.abort();
}

// ============================================================================
// Tests
// ============================================================================
