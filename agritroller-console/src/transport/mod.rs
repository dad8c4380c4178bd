//! Transport seam for the event stream.
//!
//! A [`Connector`] opens one physical connection (a *link*) and reports its
//! life through [`LinkEvent`]s. The stream driver owns at most one link at a
//! time and never touches the socket itself. Implementations:
//! - [`ws::WsConnector`]: WebSocket via `tokio-tungstenite`
//! - [`loopback::ScriptedConnector`]: in-process links driven by tests

pub mod loopback;
pub mod ws;

use tokio::sync::{mpsc, oneshot};
use url::Url;

/// Errors a link can report before or while it is open.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The remote end closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// The connection attempt did not complete in time.
    #[error("connection attempt timed out")]
    Timeout,

    /// Nothing is listening at the endpoint.
    #[error("event stream endpoint {0} is unreachable")]
    Unreachable(String),

    /// The server refused the WebSocket upgrade.
    #[error("event stream handshake rejected: HTTP {0}")]
    Rejected(u16),

    /// An underlying I/O error occurred.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lifecycle notifications emitted by a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The connection is established.
    Open,
    /// One inbound text frame.
    Message(String),
    /// The connection ended.
    Closed,
    /// The connection failed; the link is finished.
    Error(String),
}

/// Sending half handed to a link, tagged with the link's generation.
#[derive(Debug, Clone)]
pub struct LinkSender {
    generation: u64,
    tx: mpsc::Sender<(u64, LinkEvent)>,
}

impl LinkSender {
    /// Creates a sender for the link with the given generation.
    #[must_use]
    pub const fn new(generation: u64, tx: mpsc::Sender<(u64, LinkEvent)>) -> Self {
        Self { generation, tx }
    }

    /// Generation of the link this sender belongs to.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Reports an event to the driver.
    ///
    /// Returns `false` once the driver is gone; the link should stop.
    pub async fn send(&self, event: LinkEvent) -> bool {
        self.tx.send((self.generation, event)).await.is_ok()
    }
}

/// Owning handle to an open (or opening) link.
///
/// Dropping the handle asks the link to close and aborts its task, so a
/// discarded link can never report into the driver again under a live
/// generation.
#[derive(Debug)]
pub struct LinkHandle {
    close: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl LinkHandle {
    /// Wraps a link task and the signal that asks it to close.
    #[must_use]
    pub const fn new(close: oneshot::Sender<()>, task: tokio::task::JoinHandle<()>) -> Self {
        Self {
            close: Some(close),
            task: Some(task),
        }
    }

    /// A handle that owns no task, for links that live entirely in the caller.
    #[must_use]
    pub const fn detached(close: oneshot::Sender<()>) -> Self {
        Self {
            close: Some(close),
            task: None,
        }
    }

    /// Asks the link to close gracefully and detaches from it.
    pub fn close(mut self) {
        if let Some(close) = self.close.take() {
            let _ = close.send(());
        }
        // The task gets to send its close frame; it is not aborted here.
        self.task.take();
    }
}

impl Drop for LinkHandle {
    fn drop(&mut self) {
        if let Some(close) = self.close.take() {
            let _ = close.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Opens links to the event stream endpoint.
///
/// `open` must return immediately; connection progress is reported
/// asynchronously through `events`, starting with either
/// [`LinkEvent::Open`] or [`LinkEvent::Error`].
pub trait Connector: Send + Sync + 'static {
    /// Starts a new link to `url`.
    fn open(&self, url: &Url, events: LinkSender) -> LinkHandle;
}
