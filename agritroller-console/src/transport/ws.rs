//! WebSocket transport for the event stream.
//!
//! Each link is one `tokio-tungstenite` connection driven by its own task:
//! it connects, reports [`LinkEvent::Open`], forwards every inbound frame as
//! [`LinkEvent::Message`], and finishes with [`LinkEvent::Closed`] or
//! [`LinkEvent::Error`]. Frames are not interpreted here; decoding belongs to
//! the stream driver so a bad frame never tears the link down.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use super::{Connector, LinkEvent, LinkHandle, LinkSender, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// [`Connector`] that opens WebSocket links.
#[derive(Debug, Clone, Default)]
pub struct WsConnector {
    /// Optional cap on the TCP + upgrade handshake; `None` leaves it to the OS.
    connect_timeout: Option<Duration>,
}

impl WsConnector {
    /// Creates a connector with no handshake timeout.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            connect_timeout: None,
        }
    }

    /// Bounds each connection attempt by `timeout`.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Connector for WsConnector {
    fn open(&self, url: &Url, events: LinkSender) -> LinkHandle {
        let (close_tx, close_rx) = oneshot::channel();
        let task = tokio::spawn(run_link(
            url.clone(),
            self.connect_timeout,
            events,
            close_rx,
        ));
        LinkHandle::new(close_tx, task)
    }
}

/// Connects to `url` with an optional timeout.
async fn connect(url: &Url, timeout: Option<Duration>) -> Result<WsStream, TransportError> {
    let attempt = connect_async(url.as_str());
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, attempt).await.map_err(|_| {
            tracing::warn!(url = %url, "event stream connect timed out");
            TransportError::Timeout
        })?,
        None => attempt.await,
    };
    let (stream, _response) = result.map_err(|e| {
        tracing::warn!(url = %url, err = %e, "event stream connect failed");
        map_ws_connect_error(url, e)
    })?;
    Ok(stream)
}

/// Body of a link task.
async fn run_link(
    url: Url,
    timeout: Option<Duration>,
    events: LinkSender,
    mut close_rx: oneshot::Receiver<()>,
) {
    let generation = events.generation();
    let stream = tokio::select! {
        result = connect(&url, timeout) => result,
        _ = &mut close_rx => {
            tracing::debug!(generation, "link closed before connecting");
            return;
        }
    };
    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            events.send(LinkEvent::Error(e.to_string())).await;
            return;
        }
    };

    tracing::info!(url = %url, generation, "event stream link open");
    if !events.send(LinkEvent::Open).await {
        return;
    }

    let (mut ws_sender, mut ws_reader) = stream.split();
    let end = loop {
        tokio::select! {
            _ = &mut close_rx => {
                let _ = ws_sender.send(Message::Close(None)).await;
                tracing::debug!(generation, "link closed on request");
                return;
            }
            frame = ws_reader.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if !events.send(LinkEvent::Message(text.as_str().to_owned())).await {
                            return;
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        // Decoded (and most likely rejected) downstream.
                        let text = String::from_utf8_lossy(&data).into_owned();
                        if !events.send(LinkEvent::Message(text)).await {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(generation, "event stream closed by server");
                        break LinkEvent::Closed;
                    }
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                    Some(Err(e)) => {
                        tracing::warn!(generation, err = %e, "event stream read error");
                        break LinkEvent::Error(e.to_string());
                    }
                }
            }
        }
    };
    events.send(end).await;
}

/// Map a `tokio_tungstenite` connection error to a [`TransportError`].
fn map_ws_connect_error(url: &Url, err: tokio_tungstenite::tungstenite::Error) -> TransportError {
    use tokio_tungstenite::tungstenite::Error as WsError;
    match err {
        WsError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::ConnectionRefused
                || io_err.kind() == std::io::ErrorKind::AddrNotAvailable
            {
                TransportError::Unreachable(url.to_string())
            } else {
                TransportError::Io(io_err)
            }
        }
        WsError::Http(response) => TransportError::Rejected(response.status().as_u16()),
        WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::ConnectionClosed,
        other => TransportError::Io(std::io::Error::other(format!(
            "event stream connection error: {other}"
        ))),
    }
}
