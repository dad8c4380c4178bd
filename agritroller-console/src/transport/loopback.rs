//! Scripted in-process transport for testing.
//!
//! [`ScriptedConnector`] never touches the network. Every `open` call
//! records a [`ScriptedLink`] that the test drives by hand: report the link
//! open, push frames, close or fail it, and check whether the stream driver
//! has released it.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use url::Url;

use super::{Connector, LinkEvent, LinkHandle, LinkSender};

/// A link opened through [`ScriptedConnector`], driven by the test.
#[derive(Debug)]
pub struct ScriptedLink {
    url: Url,
    events: LinkSender,
    released: oneshot::Receiver<()>,
}

impl ScriptedLink {
    /// Endpoint the driver asked for.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Generation assigned by the driver.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.events.generation()
    }

    /// Reports the link as established.
    pub async fn open(&self) -> bool {
        self.events.send(LinkEvent::Open).await
    }

    /// Delivers one inbound text frame.
    pub async fn message(&self, text: impl Into<String>) -> bool {
        self.events.send(LinkEvent::Message(text.into())).await
    }

    /// Reports a clean close from the remote end.
    pub async fn close(&self) -> bool {
        self.events.send(LinkEvent::Closed).await
    }

    /// Reports a transport failure.
    pub async fn fail(&self, reason: impl Into<String>) -> bool {
        self.events.send(LinkEvent::Error(reason.into())).await
    }

    /// Whether the driver has closed or dropped its handle to this link.
    pub fn is_released(&mut self) -> bool {
        !matches!(
            self.released.try_recv(),
            Err(oneshot::error::TryRecvError::Empty)
        )
    }
}

/// [`Connector`] that hands every opened link to the test.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    links: Arc<Mutex<VecDeque<ScriptedLink>>>,
    opened: Arc<AtomicUsize>,
}

impl ScriptedConnector {
    /// Creates a connector with no links.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the oldest link the driver opened that the test has not taken yet.
    #[must_use]
    pub fn take_link(&self) -> Option<ScriptedLink> {
        self.links.lock().pop_front()
    }

    /// Total number of `open` calls so far.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl Connector for ScriptedConnector {
    fn open(&self, url: &Url, events: LinkSender) -> LinkHandle {
        let (release_tx, release_rx) = oneshot::channel();
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.links.lock().push_back(ScriptedLink {
            url: url.clone(),
            events,
            released: release_rx,
        });
        LinkHandle::detached(release_tx)
    }
}
