#![allow(clippy::expect_used, clippy::doc_markdown)]

//! Property-based tests for the console's state machines and stores.
//!
//! Uses proptest to verify:
//! 1. The lifecycle only leaves a live state through a disconnect, close or
//!    failure, and its state always agrees with whether a transport is held.
//! 2. At most one transport and at most one retry timer exist at any time.
//! 3. Merging partial status pushes never erases a populated field.
//! 4. The notification feed stays bounded at 50, newest first.
//! 5. Repeating a status value never produces a second transition.

use std::time::Duration;

use agritroller_console::notify::{MAX_NOTIFICATIONS, NotificationFeed};
use agritroller_console::reconcile::{Transition, merge_status, project_active};
use agritroller_console::stream::lifecycle::{
    ConnectionState, Effect, Lifecycle, LifecycleInput, ReconnectPolicy,
};
use agritroller_console::wifi::WifiStore;
use agritroller_proto::envelope::{NotificationHint, Severity};
use agritroller_proto::wifi::{WifiNetwork, WifiStatus, WifiStatusUpdate};
use proptest::prelude::*;

// --- Strategies ---

fn arb_input() -> impl Strategy<Value = LifecycleInput> {
    prop_oneof![
        Just(LifecycleInput::Connect),
        Just(LifecycleInput::Disconnect),
        Just(LifecycleInput::Opened),
        Just(LifecycleInput::Closed),
        Just(LifecycleInput::Failed),
        Just(LifecycleInput::TimerFired),
    ]
}

fn arb_policy() -> impl Strategy<Value = ReconnectPolicy> {
    prop_oneof![
        (1u64..5_000).prop_map(|ms| ReconnectPolicy::Fixed(Duration::from_millis(ms))),
        (1u64..1_000, 1_000u64..60_000, any::<bool>()).prop_map(|(initial, max, jitter)| {
            ReconnectPolicy::Backoff {
                initial: Duration::from_millis(initial),
                max: Duration::from_millis(max),
                jitter,
            }
        }),
    ]
}

fn arb_status_value() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("connected".to_string()),
        Just("disconnected".to_string()),
        Just("connecting".to_string()),
        "[a-z]{1,10}",
    ]
}

fn arb_update() -> impl Strategy<Value = WifiStatusUpdate> {
    (
        prop::option::of("[A-Za-z0-9-]{1,16}"),
        prop::option::of(arb_status_value()),
        prop::option::of("2026-03-0[1-9]T0[0-9]:00:00Z"),
        prop::option::of("[a-z ]{1,20}"),
        prop::option::of("[a-z ]{1,20}"),
    )
        .prop_map(
            |(ssid, status, last_connected_at, last_error, message)| WifiStatusUpdate {
                ssid,
                status,
                last_connected_at,
                last_error,
                message,
            },
        )
}

/// Which fields of a snapshot are populated.
fn populated(status: &WifiStatus) -> [bool; 4] {
    [
        status.ssid.is_some(),
        status.last_connected_at.is_some(),
        status.last_error.is_some(),
        status.message.is_some(),
    ]
}

/// Stand-in for the driver around the state machine: tracks what actually
/// exists and only delivers inputs the driver would deliver.
#[derive(Debug, Default)]
struct World {
    transport: bool,
    timer: bool,
}

impl World {
    /// Whether the driver would feed `input` to the lifecycle right now.
    const fn delivers(&self, input: LifecycleInput) -> bool {
        match input {
            LifecycleInput::Opened | LifecycleInput::Closed | LifecycleInput::Failed => {
                self.transport
            }
            LifecycleInput::TimerFired => self.timer,
            LifecycleInput::Connect | LifecycleInput::Disconnect => true,
        }
    }
}

// --- Property tests ---

proptest! {
    /// Live states are left only through disconnect, close or failure;
    /// `Connected` is entered only through an open.
    #[test]
    fn lifecycle_state_changes_have_a_cause(
        policy in arb_policy(),
        inputs in prop::collection::vec(arb_input(), 0..64),
    ) {
        let mut lc = Lifecycle::new(policy);
        let mut world = World::default();
        for input in inputs {
            if !world.delivers(input) {
                continue;
            }
            if input == LifecycleInput::TimerFired {
                world.timer = false;
            }
            let before = lc.state();
            for effect in lc.apply(input) {
                match effect {
                    Effect::OpenTransport => world.transport = true,
                    Effect::CloseTransport => world.transport = false,
                    Effect::ScheduleReconnect(_) => world.timer = true,
                    Effect::CancelReconnect => world.timer = false,
                }
            }
            let after = lc.state();

            if before != ConnectionState::Disconnected && after == ConnectionState::Disconnected {
                prop_assert!(
                    matches!(
                        input,
                        LifecycleInput::Disconnect | LifecycleInput::Closed | LifecycleInput::Failed
                    ),
                    "{before} -> {after} on {input:?}"
                );
            }
            if before != ConnectionState::Connected && after == ConnectionState::Connected {
                prop_assert_eq!(input, LifecycleInput::Opened);
            }
            prop_assert_eq!(after == ConnectionState::Disconnected, !lc.transport_held());
        }
    }

    /// Never two transports, never two timers, never a transport and a
    /// timer together, and nothing at all once stopped.
    #[test]
    fn lifecycle_is_single_flight(
        policy in arb_policy(),
        inputs in prop::collection::vec(arb_input(), 0..64),
    ) {
        let mut lc = Lifecycle::new(policy);
        let mut world = World::default();
        for input in inputs {
            if !world.delivers(input) {
                continue;
            }
            if input == LifecycleInput::TimerFired {
                world.timer = false;
            }
            for effect in lc.apply(input) {
                match effect {
                    Effect::OpenTransport => {
                        prop_assert!(!world.transport, "second transport opened");
                        world.transport = true;
                    }
                    Effect::CloseTransport => {
                        prop_assert!(world.transport, "closed a transport that is not held");
                        world.transport = false;
                    }
                    Effect::ScheduleReconnect(delay) => {
                        prop_assert!(!world.timer, "second timer armed");
                        prop_assert!(delay > Duration::ZERO);
                        world.timer = true;
                    }
                    Effect::CancelReconnect => {
                        prop_assert!(world.timer, "cancelled a timer that is not armed");
                        world.timer = false;
                    }
                }
            }
            prop_assert_eq!(lc.transport_held(), world.transport);
            prop_assert_eq!(lc.timer_pending(), world.timer);
            prop_assert!(!(world.transport && world.timer));
            if !lc.should_run() {
                prop_assert!(!world.transport && !world.timer);
            }
        }
    }

    /// Backoff delays never exceed the cap, jitter or not.
    #[test]
    fn backoff_delay_is_capped(policy in arb_policy(), attempt in 0u32..64) {
        let delay = policy.delay(attempt);
        match policy {
            ReconnectPolicy::Fixed(interval) => prop_assert_eq!(delay, interval),
            ReconnectPolicy::Backoff { max, .. } => prop_assert!(delay <= max),
        }
    }

    /// Once populated, a field stays populated.
    #[test]
    fn merge_never_erases_fields(updates in prop::collection::vec(arb_update(), 1..24)) {
        let mut snapshot: Option<WifiStatus> = None;
        for update in &updates {
            let (merged, _) = merge_status(snapshot.as_ref(), update);
            if let Some(previous) = &snapshot {
                for (was, now) in populated(previous).into_iter().zip(populated(&merged)) {
                    prop_assert!(!was || now);
                }
                if update.status.is_none() {
                    prop_assert_eq!(&merged.status, &previous.status);
                }
            }
            if let Some(ssid) = &update.ssid {
                prop_assert_eq!(merged.ssid.as_ref(), Some(ssid));
            }
            snapshot = Some(merged);
        }
    }

    /// The feed holds at most 50 records, newest first.
    #[test]
    fn feed_is_bounded_and_newest_first(count in 0usize..160) {
        let mut feed = NotificationFeed::new();
        for n in 0..count {
            feed.dispatch("sensor.reading", &NotificationHint::new(Severity::Ok, n.to_string()));
        }
        prop_assert_eq!(feed.len(), count.min(MAX_NOTIFICATIONS));

        let order: Vec<usize> = feed
            .iter()
            .map(|r| r.message.parse().expect("numeric message"))
            .collect();
        let expected: Vec<usize> = (0..count).rev().take(MAX_NOTIFICATIONS).collect();
        prop_assert_eq!(order, expected);
        prop_assert_eq!(feed.unread_count(), feed.len());
    }

    /// A repeated status value never yields a second transition.
    #[test]
    fn repeated_status_yields_no_transition(
        seed in prop::option::of(arb_update()),
        status in arb_status_value(),
        first in arb_update(),
        second in arb_update(),
    ) {
        let mut store = WifiStore::new();
        if let Some(seed) = seed {
            store.apply_update(&seed);
        }
        let first = WifiStatusUpdate { status: Some(status.clone()), ..first };
        let second = WifiStatusUpdate { status: Some(status), ..second };

        let t1 = store.apply_update(&first);
        let t2 = store.apply_update(&second);
        prop_assert_eq!(t2, None);
        if let Some(t) = t1 {
            let expected = match first.status.as_deref() {
                Some("connected") => Transition::BecameConnected,
                _ => Transition::BecameDisconnected,
            };
            prop_assert_eq!(t, expected);
        }
    }

    /// Only the network matching the snapshot's ssid is active, and the list
    /// keeps its shape.
    #[test]
    fn projection_marks_exactly_the_active_ssid(
        ssids in prop::collection::vec("[A-C]{1,2}", 0..12),
        active in prop::option::of("[A-C]{1,2}"),
    ) {
        let mut networks: Vec<WifiNetwork> = ssids
            .iter()
            .map(|s| WifiNetwork::new(s.as_str(), -60, "wpa2"))
            .collect();
        project_active(&mut networks, active.as_deref());

        prop_assert_eq!(networks.len(), ssids.len());
        for (network, ssid) in networks.iter().zip(&ssids) {
            prop_assert_eq!(&network.ssid, ssid);
            match &active {
                Some(a) => prop_assert_eq!(network.active, ssid == a),
                None => prop_assert!(!network.active),
            }
        }
    }
}
