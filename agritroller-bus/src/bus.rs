//! In-memory fan-out event bus.
//!
//! Every published envelope is encoded once and broadcast to every current
//! subscriber. Subscribers that fall more than `capacity` events behind lose
//! the oldest events; the bus never blocks a publisher.

use std::sync::Arc;

use tokio::sync::broadcast;

use agritroller_proto::codec::{self, CodecError};
use agritroller_proto::envelope::EventEnvelope;

/// Default number of events buffered per subscriber.
pub const DEFAULT_EVENT_BUFFER: usize = 1024;

/// Errors from publishing onto the bus.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The envelope could not be encoded.
    #[error("could not encode event: {0}")]
    Encode(#[from] CodecError),
}

/// Broadcasts encoded envelopes to all subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Arc<str>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

impl EventBus {
    /// Creates a bus that buffers up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes one envelope, stamping the current time if it has none.
    ///
    /// Returns the number of subscribers the event was queued for.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Encode`] if the envelope cannot be serialized.
    pub fn publish(&self, mut envelope: EventEnvelope) -> Result<usize, BusError> {
        if envelope.timestamp.is_none() {
            envelope.timestamp = Some(chrono::Utc::now().to_rfc3339());
        }
        let frame: Arc<str> = codec::encode(&envelope)?.into();
        // No subscribers is not an error; the event is simply dropped.
        let receivers = self.tx.send(frame).unwrap_or(0);
        tracing::debug!(
            event_type = %envelope.event_type,
            receivers,
            "event published"
        );
        Ok(receivers)
    }

    /// Registers a new subscriber that sees every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<str>> {
        self.tx.subscribe()
    }

    /// Number of current subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
