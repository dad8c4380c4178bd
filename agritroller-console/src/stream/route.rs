//! Envelope routing.
//!
//! One decoded envelope fans out to the notification feed and the Wi-Fi
//! store in a single pass. The caller holds both stores for the whole pass,
//! so the records one envelope produces are never interleaved with records
//! from another.

use agritroller_proto::envelope::EventEnvelope;
use agritroller_proto::notification::NotificationRecord;
use agritroller_proto::wifi::WifiStatusUpdate;

use crate::notify::NotificationFeed;
use crate::wifi::WifiStore;

/// Applies `envelope` to both stores.
///
/// Order within the pass:
/// 1. the envelope's own notification hint, when `notify` is set;
/// 2. for `wifi_status` envelopes, the merge into the Wi-Fi snapshot;
/// 3. the notification derived from a detected transition.
///
/// Returns the records added, in the order they were added. A `wifi_status`
/// envelope whose payload carries no usable status is skipped without
/// touching the snapshot.
pub fn route(
    envelope: &EventEnvelope,
    wifi: &mut WifiStore,
    feed: &mut NotificationFeed,
) -> Vec<NotificationRecord> {
    let mut added = Vec::new();

    if let Some(hint) = envelope.notification_hint() {
        added.push(feed.dispatch(&envelope.event_type, hint));
    }

    if envelope.is_wifi_status() {
        match WifiStatusUpdate::from_payload(envelope.payload.as_ref()) {
            Ok(update) => {
                if let Some(transition) = wifi.apply_update(&update) {
                    added.push(feed.dispatch_transition(transition, &update));
                }
            }
            Err(e) => {
                tracing::debug!(err = %e, "skipping wifi_status envelope");
            }
        }
    }

    added
}
