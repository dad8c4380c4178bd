// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::doc_markdown,
    clippy::future_not_send,
    clippy::missing_panics_doc
)]

//! Inbound events flowing through the stream into the Wi-Fi store and the
//! notification feed.
//!
//! Frames are pushed through the scripted loopback transport on paused
//! tokio time; assertions read the shared stores through the handle.

use std::time::Duration;

use agritroller_console::notify::{MAX_NOTIFICATIONS, NotificationFeed, WIFI_SOURCE};
use agritroller_console::stream::lifecycle::ConnectionState;
use agritroller_console::stream::{
    DECODE_ERROR, EventStream, StreamConfig, StreamHandle, shared,
};
use agritroller_console::transport::loopback::{ScriptedConnector, ScriptedLink};
use agritroller_console::wifi::WifiStore;
use agritroller_proto::codec;
use agritroller_proto::envelope::{EventEnvelope, NotificationHint, Severity};
use agritroller_proto::wifi::{WifiNetwork, WifiStatus, WifiStatusUpdate};
use url::Url;

fn spawn_with_store(wifi: WifiStore) -> (StreamHandle, ScriptedConnector) {
    let connector = ScriptedConnector::new();
    let endpoint = Url::parse("ws://controller.local:8080/api/ws/events").unwrap();
    let handle = EventStream::spawn(
        StreamConfig::new(endpoint),
        connector.clone(),
        shared(wifi),
        shared(NotificationFeed::new()),
    );
    (handle, connector)
}

async fn connected(wifi: WifiStore) -> (StreamHandle, ScriptedConnector, ScriptedLink) {
    let (handle, connector) = spawn_with_store(wifi);
    handle.connect().unwrap();
    handle.settled().await.unwrap();
    let link = connector.take_link().unwrap();
    assert!(link.open().await);
    handle.settled().await.unwrap();
    (handle, connector, link)
}

async fn deliver(handle: &StreamHandle, link: &ScriptedLink, frame: &str) {
    assert!(link.message(frame).await);
    handle.settled().await.unwrap();
}

async fn deliver_envelope(handle: &StreamHandle, link: &ScriptedLink, envelope: &EventEnvelope) {
    deliver(handle, link, &codec::encode(envelope).unwrap()).await;
}

fn disconnected_store() -> WifiStore {
    let mut store = WifiStore::new();
    store.set_status(WifiStatus::default());
    store
}

#[tokio::test(start_paused = true)]
async fn farm_network_join_then_drop_then_operator_disconnect() {
    let (handle, connector) = spawn_with_store(disconnected_store());

    handle.connect().unwrap();
    handle.settled().await.unwrap();
    assert_eq!(handle.connection_state(), ConnectionState::Reconnecting);

    let link = connector.take_link().unwrap();
    assert!(link.open().await);
    handle.settled().await.unwrap();
    assert_eq!(handle.connection_state(), ConnectionState::Connected);
    assert!(handle.last_error().is_none());

    deliver(
        &handle,
        &link,
        r#"{"type":"wifi_status","payload":{"status":"connected","ssid":"Farm-5G"}}"#,
    )
    .await;

    let status = handle.wifi_status().unwrap();
    assert_eq!(status.status, "connected");
    assert_eq!(status.ssid.as_deref(), Some("Farm-5G"));

    let feed = handle.notifications();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].severity, Severity::Ok);
    assert!(feed[0].message.contains("Farm-5G"));
    assert_eq!(feed[0].source, WIFI_SOURCE);
    assert!(feed[0].is_transient());
    assert!(!feed[0].is_read);

    link.close().await;
    handle.settled().await.unwrap();
    assert_eq!(handle.connection_state(), ConnectionState::Disconnected);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    handle.disconnect().unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;
    handle.settled().await.unwrap();

    assert_eq!(connector.open_count(), 1);
    assert_eq!(handle.connection_state(), ConnectionState::Disconnected);
    // Disconnecting keeps what was received.
    assert_eq!(handle.notifications().len(), 1);
    assert_eq!(handle.wifi_status().unwrap().ssid.as_deref(), Some("Farm-5G"));
}

#[tokio::test(start_paused = true)]
async fn partial_updates_never_erase_known_fields() {
    let (handle, _connector, link) = connected(WifiStore::new()).await;

    deliver(
        &handle,
        &link,
        r#"{"type":"wifi_status","payload":{"status":"connected","ssid":"Farm-5G",
            "last_connected_at":"2026-03-01T06:00:00Z"}}"#,
    )
    .await;
    deliver(
        &handle,
        &link,
        r#"{"type":"wifi_status","payload":{"message":"signal weak"}}"#,
    )
    .await;

    let status = handle.wifi_status().unwrap();
    assert_eq!(status.status, "connected");
    assert_eq!(status.ssid.as_deref(), Some("Farm-5G"));
    assert_eq!(status.last_connected_at.as_deref(), Some("2026-03-01T06:00:00Z"));
    assert_eq!(status.message.as_deref(), Some("signal weak"));
    // Only the first push carried a status change.
    assert_eq!(handle.notifications().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn drop_carries_the_reported_error() {
    let (handle, _connector, link) = connected(WifiStore::new()).await;

    deliver_envelope(
        &handle,
        &link,
        &WifiStatusUpdate {
            ssid: Some("Farm-5G".into()),
            ..WifiStatusUpdate::with_status("connected")
        }
        .into_envelope(),
    )
    .await;
    deliver_envelope(
        &handle,
        &link,
        &WifiStatusUpdate {
            last_error: Some("auth timeout".into()),
            ..WifiStatusUpdate::with_status("disconnected")
        }
        .into_envelope(),
    )
    .await;

    let feed = handle.notifications();
    assert_eq!(feed.len(), 2);
    assert_eq!(feed[0].event_type, "wifi_disconnected");
    assert_eq!(feed[0].severity, Severity::Error);
    assert_eq!(feed[0].message, "Wi-Fi disconnected: auth timeout");
    assert_eq!(feed[1].event_type, "wifi_connected");

    // The ssid survives the disconnect push that omitted it.
    assert_eq!(handle.wifi_status().unwrap().ssid.as_deref(), Some("Farm-5G"));
}

#[tokio::test(start_paused = true)]
async fn repeated_status_is_announced_once() {
    let (handle, _connector, link) = connected(disconnected_store()).await;
    let frame = r#"{"type":"wifi_status","payload":{"status":"connected","ssid":"Farm-5G"}}"#;
    for _ in 0..4 {
        deliver(&handle, &link, frame).await;
    }
    assert_eq!(handle.notifications().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn repeated_disconnected_from_default_snapshot_is_silent() {
    let (handle, _connector, link) = connected(disconnected_store()).await;
    deliver(
        &handle,
        &link,
        r#"{"type":"wifi_status","payload":{"status":"disconnected"}}"#,
    )
    .await;
    assert!(handle.notifications().is_empty());
}

#[tokio::test(start_paused = true)]
async fn hint_lands_before_the_transition_record() {
    let (handle, _connector, link) = connected(disconnected_store()).await;

    let envelope = WifiStatusUpdate {
        ssid: Some("Orchard".into()),
        ..WifiStatusUpdate::with_status("connected")
    }
    .into_envelope()
    .with_notification(
        NotificationHint::new(Severity::Ok, "Controller joined Orchard").with_source("wifi"),
    );
    deliver_envelope(&handle, &link, &envelope).await;

    let feed = handle.notifications();
    assert_eq!(feed.len(), 2);
    // Newest first: the transition was added after the hint.
    assert_eq!(feed[0].event_type, "wifi_connected");
    assert_eq!(feed[1].event_type, "wifi_status");
    assert_eq!(feed[1].message, "Controller joined Orchard");
    assert_ne!(feed[0].id, feed[1].id);
}

#[tokio::test(start_paused = true)]
async fn hint_defaults_source_and_timestamp() {
    let (handle, _connector, link) = connected(WifiStore::new()).await;
    deliver(
        &handle,
        &link,
        r#"{"type":"valve.stuck","notify":true,
            "notification":{"severity":"warning","message":"Valve 4 stuck open"}}"#,
    )
    .await;

    let feed = handle.notifications();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].event_type, "valve.stuck");
    assert_eq!(feed[0].severity, Severity::Warning);
    assert_eq!(feed[0].source, "event_bus");
    assert!(chrono::DateTime::parse_from_rfc3339(&feed[0].created_at).is_ok());
    assert_eq!(handle.unread_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn undecodable_frame_sets_error_but_keeps_streaming() {
    let (handle, _connector, link) = connected(WifiStore::new()).await;

    deliver(&handle, &link, "{not json").await;
    assert_eq!(handle.last_error().as_deref(), Some(DECODE_ERROR));
    assert_eq!(handle.connection_state(), ConnectionState::Connected);
    assert!(handle.last_event().is_none());

    deliver(&handle, &link, r#"{"payload":{"status":"connected"}}"#).await;
    assert_eq!(handle.last_error().as_deref(), Some(DECODE_ERROR));
    assert!(handle.wifi_status().is_none());

    deliver(&handle, &link, r#"{"type":"heartbeat","timestamp":"2026-03-01T06:00:00Z"}"#).await;
    assert!(handle.last_error().is_none());
    let last = handle.last_event().unwrap();
    assert_eq!(last.event_type, "heartbeat");
    assert_eq!(last.timestamp.as_deref(), Some("2026-03-01T06:00:00Z"));
    assert!(handle.last_message_at().is_some());
}

#[tokio::test(start_paused = true)]
async fn status_survives_a_hint_with_unknown_severity() {
    let (handle, _connector, link) = connected(disconnected_store()).await;
    deliver(
        &handle,
        &link,
        r#"{"type":"wifi_status","notify":true,
            "payload":{"status":"connected","ssid":"Farm-5G"},
            "notification":{"severity":"fatal","message":"m"}}"#,
    )
    .await;

    assert!(handle.last_error().is_none());
    let status = handle.wifi_status().unwrap();
    assert_eq!(status.status, "connected");
    assert_eq!(status.ssid.as_deref(), Some("Farm-5G"));
    let feed = handle.notifications();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].event_type, "wifi_connected");
}

#[tokio::test(start_paused = true)]
async fn wifi_status_without_usable_payload_is_skipped() {
    let (handle, _connector, link) = connected(disconnected_store()).await;

    for frame in [
        r#"{"type":"wifi_status"}"#,
        r#"{"type":"wifi_status","payload":{}}"#,
        r#"{"type":"wifi_status","payload":{"status":7}}"#,
    ] {
        deliver(&handle, &link, frame).await;
        // Decoded fine, so it is still the last event and no error is shown.
        assert!(handle.last_error().is_none());
        assert_eq!(handle.last_event().unwrap().event_type, "wifi_status");
    }
    assert_eq!(handle.wifi_status().unwrap(), WifiStatus::default());
    assert!(handle.notifications().is_empty());
}

#[tokio::test(start_paused = true)]
async fn feed_keeps_the_newest_fifty() {
    let (handle, _connector, link) = connected(WifiStore::new()).await;

    for n in 0..(MAX_NOTIFICATIONS + 12) {
        let envelope = EventEnvelope::new("sensor.reading")
            .with_notification(NotificationHint::new(Severity::Ok, format!("reading {n}")));
        deliver_envelope(&handle, &link, &envelope).await;
    }

    let feed = handle.notifications();
    assert_eq!(feed.len(), MAX_NOTIFICATIONS);
    assert_eq!(feed[0].message, format!("reading {}", MAX_NOTIFICATIONS + 11));
    assert_eq!(feed[MAX_NOTIFICATIONS - 1].message, "reading 12");
    // Transient ids count down, so newer records carry smaller ids.
    assert!(feed.windows(2).all(|w| w[0].id < w[1].id));
}

#[tokio::test(start_paused = true)]
async fn active_network_follows_the_snapshot() {
    let mut store = disconnected_store();
    store.set_networks(vec![
        WifiNetwork::new("Farm-5G", -48, "wpa2"),
        WifiNetwork::new("Orchard", -71, "wpa2"),
        WifiNetwork::new("Barn", -80, "open"),
    ]);
    let (handle, _connector, link) = connected(store).await;

    deliver(
        &handle,
        &link,
        r#"{"type":"wifi_status","payload":{"status":"connected","ssid":"Orchard"}}"#,
    )
    .await;
    let active: Vec<bool> = handle.wifi_networks().iter().map(|n| n.active).collect();
    assert_eq!(active, vec![false, true, false]);

    deliver(
        &handle,
        &link,
        r#"{"type":"wifi_status","payload":{"ssid":"Farm-5G"}}"#,
    )
    .await;
    let active: Vec<bool> = handle.wifi_networks().iter().map(|n| n.active).collect();
    assert_eq!(active, vec![true, false, false]);
}

#[tokio::test(start_paused = true)]
async fn operator_actions_edit_the_shared_feed() {
    let (handle, _connector, link) = connected(WifiStore::new()).await;
    for message in ["first", "second", "third"] {
        let envelope = EventEnvelope::new("note")
            .with_notification(NotificationHint::new(Severity::Ok, message));
        deliver_envelope(&handle, &link, &envelope).await;
    }
    let ids: Vec<i64> = handle.notifications().iter().map(|r| r.id).collect();

    assert!(handle.notification_feed().write().mark_read(ids[0]));
    assert_eq!(handle.unread_count(), 2);
    assert!(handle.notification_feed().write().remove(ids[1]));
    assert_eq!(handle.notifications().len(), 2);
    assert_eq!(handle.notification_feed().write().mark_all_read(), 1);
    assert_eq!(handle.unread_count(), 0);
}
