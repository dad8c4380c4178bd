//! Event stream client.
//!
//! [`EventStream::spawn`] starts one background task (the *driver*) that owns
//! the [`Lifecycle`](lifecycle::Lifecycle), the current link and the
//! reconnection timer. Everything that mutates stream state runs on that
//! task, one input at a time:
//!
//! ```text
//! StreamHandle ── Command ──▶ ┌────────┐ ── Connector::open ──▶ link task
//!                             │ driver │ ◀── (generation, LinkEvent) ──┘
//! timer (tokio::time::Sleep) ▶└────────┘ ── route() ──▶ WifiStore / NotificationFeed
//! ```
//!
//! Link events are polled ahead of the timer and the timer ahead of
//! commands, so a command observes every link event delivered before it.
//! [`StreamHandle::settled`] relies on this.

pub mod lifecycle;
pub mod route;

use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Sleep;
use url::Url;

use agritroller_proto::codec;
use agritroller_proto::envelope::EventEnvelope;
use agritroller_proto::notification::NotificationRecord;
use agritroller_proto::wifi::{WifiNetwork, WifiStatus};

use crate::notify::NotificationFeed;
use crate::transport::{Connector, LinkEvent, LinkHandle, LinkSender};
use crate::wifi::WifiStore;

use self::lifecycle::{ConnectionState, Effect, Lifecycle, LifecycleInput, ReconnectPolicy};

/// State shared between the driver and the rest of the application.
pub type Shared<T> = Arc<RwLock<T>>;

/// Wraps `value` for sharing.
pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}

/// Last-error text after a transport failure.
pub const CONNECTION_ERROR: &str = "connection error";

/// Last-error text after an inbound message fails to decode.
pub const DECODE_ERROR: &str = "could not parse event";

/// Default capacity of the link event channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Errors returned by [`StreamHandle`].
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The driver task has exited.
    #[error("event stream driver has stopped")]
    Stopped,
}

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Event stream endpoint.
    pub endpoint: Url,
    /// Delay policy between reconnection attempts.
    pub policy: ReconnectPolicy,
    /// Capacity of the channel links report through.
    pub channel_capacity: usize,
}

impl StreamConfig {
    /// Config for `endpoint` with the default policy and channel size.
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            policy: ReconnectPolicy::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Replaces the reconnection policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Diagnostic state published by the driver.
#[derive(Debug, Clone, Default)]
pub struct StreamStatus {
    /// Current connection state.
    pub connection: ConnectionState,
    /// Transient error text; cleared on the next open or decoded event.
    pub last_error: Option<String>,
    /// Most recent successfully decoded envelope.
    pub last_event: Option<EventEnvelope>,
    /// When the most recent envelope was decoded.
    pub last_message_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum Command {
    Connect,
    Disconnect,
    Sync(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Entry point for starting the driver.
#[derive(Debug)]
pub struct EventStream;

impl EventStream {
    /// Spawns the driver on the current tokio runtime.
    ///
    /// The stream starts disconnected; call [`StreamHandle::connect`] to
    /// start streaming. `wifi` and `notifications` are updated in place as
    /// envelopes arrive.
    pub fn spawn<C: Connector>(
        config: StreamConfig,
        connector: C,
        wifi: Shared<WifiStore>,
        notifications: Shared<NotificationFeed>,
    ) -> StreamHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (link_tx, link_rx) = mpsc::channel(config.channel_capacity.max(1));
        let status = shared(StreamStatus::default());

        let driver = Driver {
            lifecycle: Lifecycle::new(config.policy),
            endpoint: config.endpoint,
            connector,
            link: None,
            generation: 0,
            link_tx,
            timer: None,
            status: Arc::clone(&status),
            wifi: Arc::clone(&wifi),
            notifications: Arc::clone(&notifications),
        };
        tokio::spawn(driver.run(cmd_rx, link_rx));

        StreamHandle {
            commands: cmd_tx,
            status,
            wifi,
            notifications,
        }
    }
}

/// Caller-facing handle: read-only snapshots plus `connect`/`disconnect`.
///
/// Cheap to clone; all clones talk to the same driver.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: Shared<StreamStatus>,
    wifi: Shared<WifiStore>,
    notifications: Shared<NotificationFeed>,
}

impl StreamHandle {
    /// Asks the driver to start streaming. Returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Stopped`] if the driver has exited.
    pub fn connect(&self) -> Result<(), StreamError> {
        self.send(Command::Connect)
    }

    /// Asks the driver to stop streaming and cancel any pending retry.
    /// Returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Stopped`] if the driver has exited.
    pub fn disconnect(&self) -> Result<(), StreamError> {
        self.send(Command::Disconnect)
    }

    /// Resolves once the driver has processed every command sent before
    /// this call and every link event already queued.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Stopped`] if the driver has exited.
    pub async fn settled(&self) -> Result<(), StreamError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Sync(tx))?;
        rx.await.map_err(|_| StreamError::Stopped)
    }

    /// Disconnects and stops the driver, waiting for it to finish.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Stopped`] if the driver had already exited.
    pub async fn shutdown(&self) -> Result<(), StreamError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Shutdown(tx))?;
        rx.await.map_err(|_| StreamError::Stopped)
    }

    /// Copy of everything the driver publishes about itself.
    #[must_use]
    pub fn status(&self) -> StreamStatus {
        self.status.read().clone()
    }

    /// Current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.status.read().connection
    }

    /// Transient error text, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.status.read().last_error.clone()
    }

    /// Most recent decoded envelope.
    #[must_use]
    pub fn last_event(&self) -> Option<EventEnvelope> {
        self.status.read().last_event.clone()
    }

    /// When the most recent envelope was decoded.
    #[must_use]
    pub fn last_message_at(&self) -> Option<DateTime<Utc>> {
        self.status.read().last_message_at
    }

    /// Current Wi-Fi snapshot.
    #[must_use]
    pub fn wifi_status(&self) -> Option<WifiStatus> {
        self.wifi.read().status().cloned()
    }

    /// Known networks with their `active` flags.
    #[must_use]
    pub fn wifi_networks(&self) -> Vec<WifiNetwork> {
        self.wifi.read().networks().to_vec()
    }

    /// Notification records, newest first.
    #[must_use]
    pub fn notifications(&self) -> Vec<NotificationRecord> {
        self.notifications.read().to_vec()
    }

    /// Number of unread notification records.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.notifications.read().unread_count()
    }

    /// The Wi-Fi store the driver writes to.
    #[must_use]
    pub const fn wifi(&self) -> &Shared<WifiStore> {
        &self.wifi
    }

    /// The notification feed the driver writes to.
    #[must_use]
    pub const fn notification_feed(&self) -> &Shared<NotificationFeed> {
        &self.notifications
    }

    fn send(&self, command: Command) -> Result<(), StreamError> {
        self.commands.send(command).map_err(|_| StreamError::Stopped)
    }
}

struct Driver<C> {
    lifecycle: Lifecycle,
    endpoint: Url,
    connector: C,
    link: Option<LinkHandle>,
    generation: u64,
    link_tx: mpsc::Sender<(u64, LinkEvent)>,
    timer: Option<Pin<Box<Sleep>>>,
    status: Shared<StreamStatus>,
    wifi: Shared<WifiStore>,
    notifications: Shared<NotificationFeed>,
}

impl<C: Connector> Driver<C> {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut links: mpsc::Receiver<(u64, LinkEvent)>,
    ) {
        tracing::debug!(endpoint = %self.endpoint, "event stream driver started");
        loop {
            tokio::select! {
                biased;
                Some((generation, event)) = links.recv() => {
                    self.on_link_event(generation, event);
                }
                () = wait_for(&mut self.timer) => {
                    self.timer = None;
                    self.apply(LifecycleInput::TimerFired);
                }
                command = commands.recv() => match command {
                    Some(Command::Connect) => self.apply(LifecycleInput::Connect),
                    Some(Command::Disconnect) => self.apply(LifecycleInput::Disconnect),
                    Some(Command::Sync(ack)) => {
                        let _ = ack.send(());
                    }
                    Some(Command::Shutdown(ack)) => {
                        self.apply(LifecycleInput::Disconnect);
                        let _ = ack.send(());
                        break;
                    }
                    None => {
                        self.apply(LifecycleInput::Disconnect);
                        break;
                    }
                },
            }
        }
        tracing::debug!("event stream driver stopped");
    }

    fn on_link_event(&mut self, generation: u64, event: LinkEvent) {
        if self.link.is_none() || generation != self.generation {
            tracing::trace!(generation, current = self.generation, ?event, "stale link event");
            return;
        }
        match event {
            LinkEvent::Open => {
                tracing::info!(endpoint = %self.endpoint, generation, "event stream connected");
                self.status.write().last_error = None;
                self.apply(LifecycleInput::Opened);
            }
            LinkEvent::Message(text) => self.on_message(&text),
            LinkEvent::Closed => {
                tracing::info!(generation, "event stream closed");
                self.apply(LifecycleInput::Closed);
            }
            LinkEvent::Error(reason) => {
                tracing::warn!(generation, %reason, "event stream error");
                self.status.write().last_error = Some(CONNECTION_ERROR.to_string());
                self.apply(LifecycleInput::Failed);
            }
        }
    }

    fn on_message(&self, text: &str) {
        let envelope = match codec::decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(err = %e, "discarding undecodable event");
                self.status.write().last_error = Some(DECODE_ERROR.to_string());
                return;
            }
        };

        let added = {
            // Lock order: wifi, then notifications.
            let mut wifi = self.wifi.write();
            let mut feed = self.notifications.write();
            route::route(&envelope, &mut wifi, &mut feed)
        };
        tracing::debug!(
            event_type = %envelope.event_type,
            notifications = added.len(),
            "event routed"
        );

        let mut status = self.status.write();
        status.last_error = None;
        status.last_event = Some(envelope);
        status.last_message_at = Some(Utc::now());
    }

    fn apply(&mut self, input: LifecycleInput) {
        for effect in self.lifecycle.apply(input) {
            match effect {
                Effect::OpenTransport => {
                    self.generation += 1;
                    tracing::debug!(generation = self.generation, "opening link");
                    let events = LinkSender::new(self.generation, self.link_tx.clone());
                    self.link = Some(self.connector.open(&self.endpoint, events));
                }
                Effect::CloseTransport => {
                    if let Some(link) = self.link.take() {
                        link.close();
                    }
                }
                Effect::ScheduleReconnect(delay) => {
                    tracing::info!(?delay, "reconnect scheduled");
                    self.timer = Some(Box::pin(tokio::time::sleep(delay)));
                }
                Effect::CancelReconnect => {
                    self.timer = None;
                }
            }
        }
        self.status.write().connection = self.lifecycle.state();
    }
}

/// Completes when the armed timer fires; pends forever when none is armed.
async fn wait_for(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}
