//! HTTP and WebSocket front end of the event bus.
//!
//! Routes:
//! - `GET /api/ws/events`: WebSocket stream. Each subscriber is greeted with
//!   an `event_bus.connected` envelope, then receives every envelope
//!   published after it subscribed, one JSON text frame each.
//! - `POST /api/events`: publish one JSON envelope. `202 Accepted` with the
//!   number of subscribers it reached, `400` if the body is not an envelope.
//! - `GET /api/health`: liveness and subscriber count.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Map, Value, json};
use tokio::sync::{broadcast, watch};

use agritroller_proto::codec;
use agritroller_proto::envelope::{EVENT_BUS_CONNECTED, EventEnvelope};

use crate::bus::EventBus;

/// Path of the WebSocket event stream.
pub const EVENTS_WS_PATH: &str = "/api/ws/events";

/// Path accepting envelopes to publish.
pub const EVENTS_PUBLISH_PATH: &str = "/api/events";

/// Shared server state: the bus plus a signal that closes every stream.
#[derive(Debug)]
pub struct BusState {
    bus: EventBus,
    close_tx: watch::Sender<u64>,
}

impl Default for BusState {
    fn default() -> Self {
        Self::new(EventBus::default())
    }
}

impl BusState {
    /// Wraps `bus` for serving.
    #[must_use]
    pub fn new(bus: EventBus) -> Self {
        let (close_tx, _) = watch::channel(0);
        Self { bus, close_tx }
    }

    /// The bus the server publishes to.
    #[must_use]
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Send a WebSocket Close frame to every connected subscriber.
    ///
    /// Subscribers that connect afterwards are unaffected. Useful for
    /// simulating a controller restart.
    pub fn close_all_connections(&self) {
        tracing::info!(
            subscribers = self.bus.subscriber_count(),
            "closing all event streams"
        );
        self.close_tx.send_modify(|round| *round += 1);
    }
}

/// Builds the event stream greeting.
#[must_use]
pub fn greeting() -> EventEnvelope {
    let mut payload = Map::new();
    payload.insert("message".into(), Value::from("Event bus connected"));
    EventEnvelope::new(EVENT_BUS_CONNECTED)
        .with_timestamp(chrono::Utc::now().to_rfc3339())
        .with_payload(payload)
}

/// Serves one subscriber until it disconnects or the server closes it.
pub async fn handle_socket(socket: WebSocket, state: Arc<BusState>) {
    // Subscribe before greeting so nothing published meanwhile is missed.
    let mut events = state.bus.subscribe();
    let mut close_rx = state.close_tx.subscribe();
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let hello = match codec::encode(&greeting()) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode greeting");
            return;
        }
    };
    if ws_sender.send(Message::Text(hello.into())).await.is_err() {
        tracing::warn!("subscriber went away before greeting");
        return;
    }
    tracing::info!(
        subscribers = state.bus.subscriber_count(),
        "event stream subscriber connected"
    );

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(frame) => {
                    if ws_sender.send(Message::Text(frame.to_string().into())).await.is_err() {
                        tracing::warn!("event stream write failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "slow subscriber dropped events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            changed = close_rx.changed() => {
                if changed.is_ok() {
                    let _ = ws_sender.send(Message::Close(None)).await;
                }
                break;
            }
            inbound = ws_receiver.next() => match inbound {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                // Subscribers have nothing to say; ignore text, ping, pong.
                Some(Ok(_)) => {}
            },
        }
    }
    tracing::info!("event stream subscriber disconnected");
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<BusState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn publish_handler(State(state): State<Arc<BusState>>, body: String) -> impl IntoResponse {
    let envelope = match codec::decode(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "rejected event");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            );
        }
    };
    match state.bus.publish(envelope) {
        Ok(receivers) => (StatusCode::ACCEPTED, Json(json!({ "receivers": receivers }))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

async fn health_handler(State(state): State<Arc<BusState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "subscribers": state.bus.subscriber_count(),
    }))
}

/// Builds the axum router for `state`.
pub fn router(state: Arc<BusState>) -> axum::Router {
    axum::Router::new()
        .route(EVENTS_WS_PATH, axum::routing::get(ws_handler))
        .route(EVENTS_PUBLISH_PATH, axum::routing::post(publish_handler))
        .route("/api/health", axum::routing::get(health_handler))
        .with_state(state)
}

/// Starts the bus server on the given address and returns the bound address
/// and a join handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(BusState::default())).await
}

/// Starts the bus server with a pre-built [`BusState`], so the caller can
/// publish to it or close its connections.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<BusState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "bus server error");
        }
    });

    Ok((bound_addr, handle))
}
