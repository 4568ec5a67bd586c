//! Topic provider traits: the boundary to the pub/sub transport
//!
//! A provider resolves logical topic names to channel handles once at
//! startup; channels then publish snapshots for every accepted event.
//! Delivery guarantees and subscriber management belong to the transport.

use crate::config::OutboundConfig;
use crate::error::Result;
use crate::snapshot::EventSnapshot;
use async_trait::async_trait;
use std::sync::Arc;

pub mod memory;
pub mod nats;

/// A bound, transport-level topic
#[async_trait]
pub trait TopicChannel: Send + Sync {
    /// Logical topic name this channel was resolved from
    fn topic(&self) -> &str;

    /// Publish one snapshot
    ///
    /// Returns once the transport has accepted the message; does not wait
    /// for subscribers.
    async fn publish(&self, snapshot: &EventSnapshot) -> Result<()>;

    /// Release transport resources held by this channel
    ///
    /// Default implementation does nothing.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Shared handle to a bound channel
pub type ChannelHandle = Arc<dyn TopicChannel>;

/// Resolves topic names to channels
#[async_trait]
pub trait TopicProvider: Send + Sync {
    /// Resolve a logical topic name to a channel handle
    ///
    /// The processor's configuration is passed through unexamined.
    async fn resolve_topic(&self, name: &str, config: &OutboundConfig) -> Result<ChannelHandle>;

    /// Provider name (e.g., "memory", "nats")
    fn name(&self) -> &str;
}
