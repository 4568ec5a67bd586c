//! Dead letters: events whose delivery failed locally
//!
//! The processor never retries. When conversion or publish fails for a
//! single event, the failure is logged and, if a `DlqHandler` is set, the
//! original event is handed over so callers can layer their own retry or
//! alerting on top.

use crate::error::Result;
use crate::event::{DeviceEvent, EventKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A failed event with context about why delivery failed
#[derive(Debug, Clone)]
pub struct DeadLetterEvent {
    /// The original (pre-conversion) event
    pub event: DeviceEvent,

    pub kind: EventKind,

    /// Rendered error that caused the failure
    pub reason: String,

    pub dead_lettered_at: DateTime<Utc>,
}

impl DeadLetterEvent {
    pub fn new(event: DeviceEvent, reason: impl Into<String>) -> Self {
        Self {
            kind: event.kind(),
            event,
            reason: reason.into(),
            dead_lettered_at: Utc::now(),
        }
    }
}

/// Trait for dead letter handlers
#[async_trait]
pub trait DlqHandler: Send + Sync {
    /// Handle a dead-lettered event
    async fn handle(&self, event: DeadLetterEvent) -> Result<()>;

    /// Number of events currently held
    async fn count(&self) -> Result<usize>;

    /// Most recent dead letters, newest first
    async fn list(&self, limit: usize) -> Result<Vec<DeadLetterEvent>>;
}

/// In-memory DLQ handler with a bounded capacity
pub struct MemoryDlqHandler {
    events: Arc<RwLock<Vec<DeadLetterEvent>>>,
    max_events: usize,
}

impl MemoryDlqHandler {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            max_events,
        }
    }
}

impl Default for MemoryDlqHandler {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl DlqHandler for MemoryDlqHandler {
    async fn handle(&self, event: DeadLetterEvent) -> Result<()> {
        tracing::warn!(
            event_id = %event.event.id(),
            kind = %event.kind,
            reason = %event.reason,
            "Event dead-lettered"
        );

        let mut events = self.events.write().await;
        events.push(event);

        if self.max_events > 0 && events.len() > self.max_events {
            let drain_count = events.len() - self.max_events;
            events.drain(..drain_count);
        }

        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.events.read().await.len())
    }

    async fn list(&self, limit: usize) -> Result<Vec<DeadLetterEvent>> {
        let events = self.events.read().await;
        Ok(events.iter().rev().take(limit).cloned().collect())
    }
}
