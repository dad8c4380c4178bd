#![allow(clippy::expect_used, clippy::doc_markdown)]

//! Property-based tests for the event envelope codec.
//!
//! Uses proptest to verify:
//! 1. Arbitrary text and bytes never make `decode` panic.
//! 2. Envelopes built through the public API survive encode → decode.
//! 3. Any JSON object with a string `type` decodes, whatever else it holds.
//! 4. `WifiStatusUpdate::from_payload` never panics on arbitrary objects.

use agritroller_proto::codec;
use agritroller_proto::envelope::{EventEnvelope, NotificationHint, Severity};
use agritroller_proto::wifi::{PayloadError, WifiStatusUpdate};
use proptest::prelude::*;
use serde_json::{Map, Value};

// --- Strategies ---

/// JSON scalars that survive a serde_json round-trip exactly.
fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        ".{0,24}".prop_map(Value::String),
    ]
}

/// Nested JSON values, a few levels deep.
fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,12}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn arb_object() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("[a-z_]{1,12}", arb_value(), 0..8)
        .prop_map(|m| m.into_iter().collect())
}

fn arb_severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Ok),
        Just(Severity::Warning),
        Just(Severity::Error),
    ]
}

fn arb_hint() -> impl Strategy<Value = NotificationHint> {
    (
        arb_severity(),
        ".{0,64}",
        prop::option::of("[a-z_]{1,12}"),
        prop::option::of("2026-0[1-9]-[0-2][0-9]T[0-2][0-9]:[0-5][0-9]:[0-5][0-9]Z"),
    )
        .prop_map(|(severity, message, source, created_at)| NotificationHint {
            severity,
            message,
            source,
            created_at,
        })
}

fn arb_envelope() -> impl Strategy<Value = EventEnvelope> {
    (
        "[a-z_.]{1,24}",
        prop::option::of(".{0,32}"),
        prop::option::of(arb_object()),
        prop::option::of(arb_hint()),
        any::<bool>(),
    )
        .prop_map(|(event_type, timestamp, payload, hint, notify)| {
            let mut envelope = EventEnvelope::new(event_type);
            envelope.timestamp = timestamp;
            envelope.payload = payload;
            envelope.notification = hint;
            envelope.notify = notify;
            envelope
        })
}

// --- Property tests ---

proptest! {
    /// Arbitrary text never panics the decoder.
    #[test]
    fn random_text_decode_no_panic(raw in ".{0,512}") {
        let _ = codec::decode(&raw);
    }

    /// Arbitrary bytes never panic the binary-frame decoder.
    #[test]
    fn random_bytes_decode_no_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = codec::decode_bytes(&bytes);
    }

    /// Any envelope built through the public API survives a round-trip.
    #[test]
    fn envelope_round_trip(envelope in arb_envelope()) {
        let text = codec::encode(&envelope).expect("encode should succeed");
        let decoded = codec::decode(&text).expect("decode should succeed");
        prop_assert_eq!(envelope, decoded);
    }

    /// Unknown types and arbitrary payloads are accepted, never rejected.
    #[test]
    fn any_tagged_object_decodes(event_type in ".{1,32}", payload in arb_object()) {
        let mut doc = Map::new();
        doc.insert("type".into(), Value::String(event_type.clone()));
        doc.insert("payload".into(), Value::Object(payload.clone()));
        let text = serde_json::to_string(&doc).expect("serialize");

        let envelope = codec::decode(&text).expect("decode should succeed");
        prop_assert_eq!(envelope.event_type.clone(), event_type);
        prop_assert_eq!(envelope.payload.clone(), Some(payload));
        prop_assert!(envelope.notification_hint().is_none());
    }

    /// A hint only surfaces when the `notify` flag is set.
    #[test]
    fn hint_requires_notify(envelope in arb_envelope()) {
        let surfaced = envelope.notification_hint().is_some();
        prop_assert_eq!(surfaced, envelope.notify && envelope.notification.is_some());
    }

    /// Payload extraction never panics, and a successful extraction is
    /// never empty.
    #[test]
    fn wifi_payload_extraction_is_total(payload in arb_object()) {
        match WifiStatusUpdate::from_payload(Some(&payload)) {
            Ok(update) => prop_assert!(!update.is_empty()),
            Err(PayloadError::Missing) => prop_assert!(false, "payload was present"),
            Err(PayloadError::WrongType { .. } | PayloadError::Empty) => {}
        }
    }
}
