//! Pure merge functions for connectivity status pushes.
//!
//! The controller publishes partial status updates. Merging is field-wise:
//! a field present in the update wins, an absent one keeps whatever the
//! snapshot already held, so a populated field never regresses to empty.
//! Alongside the merged snapshot the merge reports a [`Transition`] when the
//! status value itself changed in a way worth telling the operator about.

use agritroller_proto::wifi::{
    STATUS_CONNECTED, STATUS_DISCONNECTED, WifiNetwork, WifiStatus, WifiStatusUpdate,
};

/// A status change detected while merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Status moved to `connected` from anything else.
    BecameConnected,
    /// Status moved to `disconnected` from anything else.
    BecameDisconnected,
}

/// Merges `update` into `previous`.
///
/// Each field is `update.field ?? previous.field ?? default`. A transition is
/// reported only when `update.status` is present and differs from the
/// previous status; having no previous snapshot counts as different.
#[must_use]
pub fn merge_status(
    previous: Option<&WifiStatus>,
    update: &WifiStatusUpdate,
) -> (WifiStatus, Option<Transition>) {
    let defaults = WifiStatus::default();
    let base = previous.unwrap_or(&defaults);

    let merged = WifiStatus {
        ssid: pick(update.ssid.as_ref(), base.ssid.as_ref()),
        status: update
            .status
            .clone()
            .unwrap_or_else(|| base.status.clone()),
        last_connected_at: pick(
            update.last_connected_at.as_ref(),
            base.last_connected_at.as_ref(),
        ),
        last_error: pick(update.last_error.as_ref(), base.last_error.as_ref()),
        message: pick(update.message.as_ref(), base.message.as_ref()),
    };

    let previous_status = previous.map(|p| p.status.as_str());
    let transition = match update.status.as_deref() {
        Some(next) if previous_status != Some(next) => classify(next),
        _ => None,
    };

    (merged, transition)
}

fn pick(incoming: Option<&String>, prior: Option<&String>) -> Option<String> {
    incoming.or(prior).cloned()
}

fn classify(status: &str) -> Option<Transition> {
    match status {
        STATUS_CONNECTED => Some(Transition::BecameConnected),
        STATUS_DISCONNECTED => Some(Transition::BecameDisconnected),
        _ => None,
    }
}

/// Marks the entry whose ssid equals `active_ssid` as active and every other
/// entry as inactive.
///
/// The list keeps its length and order; only the `active` flags change.
/// Nothing happens when the list is empty or no ssid is known.
pub fn project_active(networks: &mut [WifiNetwork], active_ssid: Option<&str>) {
    let Some(active_ssid) = active_ssid else {
        return;
    };
    for network in networks.iter_mut() {
        network.active = network.ssid == active_ssid;
    }
}
