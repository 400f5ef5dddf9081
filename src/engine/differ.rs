// Topology Differ
//
// Compares the channel id sets of two successive snapshots and reports
// membership changes as open/closed events. In-place status flips are not
// detected; only a channel appearing or disappearing counts.

use crate::net::{ChannelId, ChannelStatus};
use std::collections::BTreeSet;
use std::time::Instant;

/// A detected open/close transition for one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEvent {
    pub channel_id: ChannelId,
    pub timestamp: Instant,
    pub status: ChannelStatus,
}

impl ChannelEvent {
    pub fn new(channel_id: impl Into<ChannelId>, status: ChannelStatus, timestamp: Instant) -> Self {
        Self {
            channel_id: channel_id.into(),
            timestamp,
            status,
        }
    }
}

/// Result of one diff pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOutcome {
    pub events: Vec<ChannelEvent>,
    /// Number of detected events dropped by the cap
    pub truncated: usize,
}

/// Stateless differ; only carries the event cap
#[derive(Debug, Clone, Copy)]
pub struct TopologyDiffer {
    cap: usize,
}

impl TopologyDiffer {
    pub fn new(cap: usize) -> Self {
        Self { cap: cap.max(1) }
    }

    /// Diff two channel id sets
    ///
    /// Opens (ids only in `current`) are emitted first, then closes (ids only
    /// in `previous`), each in id order. When more than `cap` events are
    /// detected, the tail of the pass is kept and a warning is logged.
    pub fn diff(
        &self,
        previous: &BTreeSet<ChannelId>,
        current: &BTreeSet<ChannelId>,
        now: Instant,
    ) -> DiffOutcome {
        let opened = current
            .difference(previous)
            .map(|id| ChannelEvent::new(id.clone(), ChannelStatus::Open, now));
        let closed = previous
            .difference(current)
            .map(|id| ChannelEvent::new(id.clone(), ChannelStatus::Closed, now));

        let mut events: Vec<ChannelEvent> = opened.chain(closed).collect();

        let truncated = events.len().saturating_sub(self.cap);
        if truncated > 0 {
            tracing::warn!(
                detected = events.len(),
                cap = self.cap,
                dropped = truncated,
                "Channel event burst exceeds cap, keeping most recent events"
            );
            events.drain(..truncated);
        }

        DiffOutcome { events, truncated }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(list: &[&str]) -> BTreeSet<ChannelId> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn as_set(events: &[ChannelEvent]) -> BTreeSet<(String, ChannelStatus)> {
        events
            .iter()
            .map(|e| (e.channel_id.clone(), e.status))
            .collect()
    }

    #[test]
    fn test_single_open() {
        let differ = TopologyDiffer::new(30);
        let a = ids(&["n1-n2"]);
        let b = ids(&["n1-n2", "n2-n3"]);
        let out = differ.diff(&a, &b, Instant::now());
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].channel_id, "n2-n3");
        assert_eq!(out.events[0].status, ChannelStatus::Open);
        assert_eq!(out.truncated, 0);
    }

    #[test]
    fn test_everything_closed() {
        let differ = TopologyDiffer::new(30);
        let b = ids(&["n1-n2", "n2-n3"]);
        let c = ids(&[]);
        let out = differ.diff(&b, &c, Instant::now());

        let expected: BTreeSet<_> = [
            ("n1-n2".to_string(), ChannelStatus::Closed),
            ("n2-n3".to_string(), ChannelStatus::Closed),
        ]
        .into_iter()
        .collect();
        assert_eq!(as_set(&out.events), expected);
    }

    #[test]
    fn test_identical_sets_produce_nothing() {
        let differ = TopologyDiffer::new(30);
        let a = ids(&["a-b", "b-c"]);
        assert!(differ.diff(&a, &a, Instant::now()).events.is_empty());
    }

    #[test]
    fn test_burst_is_truncated_to_tail() {
        let differ = TopologyDiffer::new(3);
        let previous = ids(&["x-1", "x-2"]);
        let current = ids(&["a-1", "a-2", "a-3"]);
        // Pass order: open a-1, a-2, a-3, then closed x-1, x-2
        let out = differ.diff(&previous, &current, Instant::now());
        assert_eq!(out.truncated, 2);
        let kept: Vec<_> = out.events.iter().map(|e| e.channel_id.as_str()).collect();
        assert_eq!(kept, vec!["a-3", "x-1", "x-2"]);
    }

    #[test]
    fn test_order_is_stable() {
        let differ = TopologyDiffer::new(30);
        let p = ids(&["c-d", "a-b"]);
        let c = ids(&["e-f", "g-h"]);
        let now = Instant::now();
        assert_eq!(differ.diff(&p, &c, now), differ.diff(&p, &c, now));
    }

    #[test]
    fn test_events_carry_diff_time() {
        let differ = TopologyDiffer::new(30);
        let now = Instant::now();
        let out = differ.diff(&ids(&[]), &ids(&["a-b"]), now);
        assert_eq!(out.events[0].timestamp, now);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Opens are exactly C\P, closes exactly P\C, nothing for P∩C
        #[test]
        fn prop_diff_set_semantics(
            previous in proptest::collection::btree_set("[a-e]-[a-e]", 0..12),
            current in proptest::collection::btree_set("[a-e]-[a-e]", 0..12),
        ) {
            let differ = TopologyDiffer::new(usize::MAX);
            let out = differ.diff(&previous, &current, Instant::now());

            let opened: BTreeSet<_> = out.events.iter()
                .filter(|e| e.status == ChannelStatus::Open)
                .map(|e| e.channel_id.clone())
                .collect();
            let closed: BTreeSet<_> = out.events.iter()
                .filter(|e| e.status == ChannelStatus::Closed)
                .map(|e| e.channel_id.clone())
                .collect();

            let expected_open: BTreeSet<_> = current.difference(&previous).cloned().collect();
            let expected_closed: BTreeSet<_> = previous.difference(&current).cloned().collect();

            prop_assert_eq!(opened, expected_open);
            prop_assert_eq!(closed, expected_closed);
            prop_assert_eq!(
                out.events.len(),
                current.symmetric_difference(&previous).count()
            );
        }

        /// The result never exceeds the cap
        #[test]
        fn prop_diff_respects_cap(
            previous in proptest::collection::btree_set("[a-f]{2}", 0..20),
            current in proptest::collection::btree_set("[a-f]{2}", 0..20),
            cap in 1usize..10,
        ) {
            let differ = TopologyDiffer::new(cap);
            let out = differ.diff(&previous, &current, Instant::now());
            prop_assert!(out.events.len() <= cap);
        }
    }
}
