#![cfg(feature = "metrics")]
//! Tests for `fanout` metrics.
//!
//! These tests verify that counters and gauges update as expected using
//! `metrics_util::debugging::DebuggingRecorder`.

use fanout::{
    OverflowPolicy,
    Registry,
    metrics::{
        CONNECTIONS_ACTIVE,
        CONNECTIONS_EVICTED,
        MESSAGES_DELIVERED,
        MESSAGES_DROPPED,
        MESSAGES_UNROUTED,
    },
};
use fanout_testing::{chat, connect};
use metrics::{SharedString, Unit};
use metrics_util::{
    CompositeKey,
    debugging::{DebugValue, DebuggingRecorder, Snapshotter},
};
use rstest::rstest;

type SnapshotEntry = (CompositeKey, Option<Unit>, Option<SharedString>, DebugValue);

fn debugging_recorder_setup() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

/// Sum counters named `name`, optionally restricted to one label.
///
/// Taking a snapshot resets counters, so callers snapshot once and look up
/// every value from the same entries.
fn counter_value(entries: &[SnapshotEntry], name: &str, label: Option<(&str, &str)>) -> u64 {
    entries
        .iter()
        .filter(|(key, _, _, _)| {
            key.key().name() == name
                && label.is_none_or(|(k, v)| {
                    key.key().labels().any(|l| l.key() == k && l.value() == v)
                })
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(c) => *c,
            _ => 0,
        })
        .sum()
}

#[test]
fn delivery_outcomes_are_counted() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let registry = Registry::default();
        let (a, _a_out) = connect("u1", 1);
        registry.register(a);
        let _ = registry.send_to_user("u1", &chat("u2", "u1", "fits"));
        let _ = registry.send_to_user("u1", &chat("u2", "u1", "full"));
        let _ = registry.send_to_user("u9", &chat("u2", "u9", "offline"));
    });

    let entries = snapshotter.snapshot().into_vec();
    assert_eq!(counter_value(&entries, MESSAGES_DELIVERED, None), 1);
    assert_eq!(
        counter_value(&entries, MESSAGES_DROPPED, Some(("reason", "buffer_full"))),
        1
    );
    assert_eq!(counter_value(&entries, MESSAGES_UNROUTED, None), 1);
}

#[rstest]
#[case::replaced(OverflowPolicy::Drop, "replaced")]
#[case::overflow(OverflowPolicy::Evict, "overflow")]
fn evictions_are_counted(#[case] policy: OverflowPolicy, #[case] cause: &str) {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let registry = Registry::with_policy(policy);
        let (a, _a_out) = connect("u1", 1);
        registry.register(a);
        if cause == "replaced" {
            let (b, _b_out) = connect("u1", 1);
            registry.register(b);
        } else {
            let _ = registry.send_to_user("u1", &chat("u2", "u1", "fits"));
            let _ = registry.send_to_user("u1", &chat("u2", "u1", "evicts"));
        }
    });

    let entries = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_value(&entries, CONNECTIONS_EVICTED, Some(("cause", cause))),
        1
    );
}

#[test]
fn active_connections_gauge_tracks_membership() {
    let (snapshotter, recorder) = debugging_recorder_setup();
    metrics::with_local_recorder(&recorder, || {
        let registry = Registry::default();
        let (a, _a_out) = connect("u1", 1);
        let (b, _b_out) = connect("u2", 1);
        registry.register(a.clone());
        registry.register(b);
        registry.unregister(&a);
    });

    let gauge = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .find(|(key, _, _, _)| key.key().name() == CONNECTIONS_ACTIVE)
        .map(|(_, _, _, value)| value);
    assert!(
        matches!(gauge, Some(DebugValue::Gauge(g)) if g.into_inner() == 1.0),
        "unexpected gauge {gauge:?}"
    );
}
