//! NATS topic provider
//!
//! Each logical topic maps to the subject `<prefix>.<tenant>.<topic>`.
//! Snapshots are published as camelCase JSON.

mod client;
mod config;

pub use client::NatsClient;
pub use config::{NatsConfig, StorageType};

use crate::config::OutboundConfig;
use crate::error::{OutboundError, Result};
use crate::provider::{ChannelHandle, TopicChannel, TopicProvider};
use crate::snapshot::EventSnapshot;
use async_trait::async_trait;
use std::sync::Arc;

/// NATS topic provider
pub struct NatsProvider {
    client: NatsClient,
}

impl NatsProvider {
    /// Connect to NATS (and JetStream, if enabled)
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        let client = NatsClient::connect(config).await?;
        Ok(Self { client })
    }

    /// Get the underlying client for advanced usage
    pub fn client(&self) -> &NatsClient {
        &self.client
    }
}

#[async_trait]
impl TopicProvider for NatsProvider {
    async fn resolve_topic(&self, name: &str, config: &OutboundConfig) -> Result<ChannelHandle> {
        let subject = self.client.config().topic_subject(&config.tenant, name)?;
        if !self.client.is_connected() {
            return Err(OutboundError::Binding {
                topic: name.to_string(),
                reason: format!("not connected to {}", self.client.config().url),
            });
        }

        tracing::debug!(topic = name, subject = %subject, "Topic bound to NATS subject");

        let channel: ChannelHandle = Arc::new(NatsTopic {
            name: name.to_string(),
            subject,
            client: self.client.clone(),
        });
        Ok(channel)
    }

    fn name(&self) -> &str {
        "nats"
    }
}

/// A topic bound to one NATS subject
pub struct NatsTopic {
    name: String,
    subject: String,
    client: NatsClient,
}

impl NatsTopic {
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[async_trait]
impl TopicChannel for NatsTopic {
    fn topic(&self) -> &str {
        &self.name
    }

    async fn publish(&self, snapshot: &EventSnapshot) -> Result<()> {
        let payload = snapshot.to_json_bytes()?;
        self.client
            .publish(&self.subject, snapshot.id(), payload.into())
            .await
            .map_err(|e| match e {
                OutboundError::Publish { event_id, reason, .. } => OutboundError::Publish {
                    topic: self.name.clone(),
                    event_id,
                    reason,
                },
                other => other,
            })
    }

    async fn close(&self) -> Result<()> {
        self.client.flush().await
    }
}
