//! Per-processor delivery counters

use crate::event::EventKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
struct KindCounters {
    published: AtomicU64,
    filtered: AtomicU64,
    failed: AtomicU64,
}

/// Lock-free counters updated from every lane
#[derive(Default)]
pub struct ProcessorMetrics {
    kinds: [KindCounters; 5],
    rejected: AtomicU64,
}

impl ProcessorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_published(&self, kind: EventKind) {
        self.kinds[kind.index()].published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_filtered(&self, kind: EventKind) {
        self.kinds[kind.index()].filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self, kind: EventKind) {
        self.kinds[kind.index()].failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut snapshot = MetricsSnapshot {
            rejected: self.rejected.load(Ordering::Relaxed),
            ..Default::default()
        };
        for kind in EventKind::ALL {
            let counters = &self.kinds[kind.index()];
            let counts = KindCounts {
                published: counters.published.load(Ordering::Relaxed),
                filtered: counters.filtered.load(Ordering::Relaxed),
                failed: counters.failed.load(Ordering::Relaxed),
            };
            snapshot.published += counts.published;
            snapshot.filtered += counts.filtered;
            snapshot.failed += counts.failed;
            snapshot.kinds.insert(kind, counts);
        }
        snapshot
    }

    /// Zero every counter
    pub fn reset(&self) {
        for counters in &self.kinds {
            counters.published.store(0, Ordering::Relaxed);
            counters.filtered.store(0, Ordering::Relaxed);
            counters.failed.store(0, Ordering::Relaxed);
        }
        self.rejected.store(0, Ordering::Relaxed);
    }
}

/// Counts for one event kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindCounts {
    pub published: u64,
    pub filtered: u64,
    pub failed: u64,
}

/// Serializable view of `ProcessorMetrics`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub published: u64,
    pub filtered: u64,
    pub failed: u64,

    /// Events refused because the processor was not started
    pub rejected: u64,

    pub kinds: HashMap<EventKind, KindCounts>,
}

impl MetricsSnapshot {
    pub fn kind(&self, kind: EventKind) -> KindCounts {
        self.kinds.get(&kind).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_totals() {
        let metrics = ProcessorMetrics::new();
        metrics.record_published(EventKind::Alert);
        metrics.record_published(EventKind::Location);
        metrics.record_filtered(EventKind::Alert);
        metrics.record_failed(EventKind::CommandInvocation);
        metrics.record_rejected();

        let snap = metrics.snapshot();
        assert_eq!(snap.published, 2);
        assert_eq!(snap.filtered, 1);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.rejected, 1);
        assert_eq!(snap.kind(EventKind::Alert).published, 1);
        assert_eq!(snap.kind(EventKind::Alert).filtered, 1);
        assert_eq!(snap.kind(EventKind::Measurements), KindCounts::default());
    }

    #[test]
    fn test_reset() {
        let metrics = ProcessorMetrics::new();
        metrics.record_published(EventKind::Measurements);
        metrics.reset();
        assert_eq!(metrics.snapshot().published, 0);
    }

    #[test]
    fn test_snapshot_serialization() {
        let metrics = ProcessorMetrics::new();
        metrics.record_published(EventKind::CommandResponse);
        let json = serde_json::to_string(&metrics.snapshot()).unwrap();
        assert!(json.contains("\"published\":1"));
        assert!(json.contains("\"commandResponse\""));
    }
}
