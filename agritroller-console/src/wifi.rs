//! Wi-Fi connectivity store.
//!
//! Holds the one live [`WifiStatus`] snapshot and the list of networks from
//! the controller's last scan. Stream events go through
//! [`WifiStore::apply_update`]; REST collaborators may replace the snapshot
//! or the network list wholesale.

use agritroller_proto::wifi::{WifiNetwork, WifiStatus, WifiStatusUpdate};

use crate::reconcile::{self, Transition};

/// Owner of the Wi-Fi snapshot and the known-network list.
#[derive(Debug, Clone, Default)]
pub struct WifiStore {
    status: Option<WifiStatus>,
    networks: Vec<WifiNetwork>,
}

impl WifiStore {
    /// Creates an empty store: no snapshot yet, no known networks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, if any status has been seen.
    #[must_use]
    pub const fn status(&self) -> Option<&WifiStatus> {
        self.status.as_ref()
    }

    /// Networks from the last scan, in scan order.
    #[must_use]
    pub fn networks(&self) -> &[WifiNetwork] {
        &self.networks
    }

    /// Replaces the snapshot with a full status fetched out of band.
    pub fn set_status(&mut self, status: WifiStatus) {
        self.status = Some(status);
        self.refresh_active();
    }

    /// Replaces the network list and re-marks the active entry.
    pub fn set_networks(&mut self, networks: Vec<WifiNetwork>) {
        self.networks = networks;
        self.refresh_active();
    }

    /// Merges a partial push into the snapshot.
    ///
    /// Returns the transition detected by the merge, if any.
    pub fn apply_update(&mut self, update: &WifiStatusUpdate) -> Option<Transition> {
        let (merged, transition) = reconcile::merge_status(self.status.as_ref(), update);
        tracing::debug!(
            status = %merged.status,
            ssid = merged.ssid.as_deref().unwrap_or("-"),
            ?transition,
            "wifi status merged"
        );
        self.status = Some(merged);
        self.refresh_active();
        transition
    }

    fn refresh_active(&mut self) {
        if self.networks.is_empty() {
            return;
        }
        let ssid = self.status.as_ref().and_then(|s| s.ssid.as_deref());
        reconcile::project_active(&mut self.networks, ssid);
    }
}
