//! Topic binding
//!
//! The five well-known topic names are resolved against a provider once,
//! in a fixed order, when the processor starts. Binding is all-or-nothing:
//! the first failure aborts the remaining bindings and releases the
//! channels already acquired.

use crate::config::OutboundConfig;
use crate::error::{OutboundError, Result};
use crate::event::EventKind;
use crate::provider::{ChannelHandle, TopicProvider};

pub const TOPIC_MEASUREMENTS_ADDED: &str = "measurements-added";
pub const TOPIC_LOCATION_ADDED: &str = "location-added";
pub const TOPIC_ALERT_ADDED: &str = "alert-added";
pub const TOPIC_COMMAND_INVOCATION_ADDED: &str = "command-invocation-added";
pub const TOPIC_COMMAND_RESPONSE_ADDED: &str = "command-response-added";

/// Topic a kind's snapshots are published on
pub fn topic_name(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Measurements => TOPIC_MEASUREMENTS_ADDED,
        EventKind::Location => TOPIC_LOCATION_ADDED,
        EventKind::Alert => TOPIC_ALERT_ADDED,
        EventKind::CommandInvocation => TOPIC_COMMAND_INVOCATION_ADDED,
        EventKind::CommandResponse => TOPIC_COMMAND_RESPONSE_ADDED,
    }
}

/// The five channel handles, acquired together and released together
pub struct TopicBindings {
    channels: [ChannelHandle; 5],
}

impl TopicBindings {
    /// Resolve all five topics in binding order
    pub async fn bind(provider: &dyn TopicProvider, config: &OutboundConfig) -> Result<Self> {
        let mut bound: Vec<ChannelHandle> = Vec::with_capacity(EventKind::ALL.len());

        for kind in EventKind::ALL {
            let name = topic_name(kind);
            match provider.resolve_topic(name, config).await {
                Ok(channel) => {
                    tracing::debug!(topic = name, provider = provider.name(), "Topic bound");
                    bound.push(channel);
                }
                Err(e) => {
                    release_all(&bound).await;
                    return Err(match e {
                        OutboundError::Binding { .. } => e,
                        other => OutboundError::Binding {
                            topic: name.to_string(),
                            reason: other.to_string(),
                        },
                    });
                }
            }
        }

        let channels: [ChannelHandle; 5] = bound.try_into().map_err(|_| OutboundError::Binding {
            topic: "*".to_string(),
            reason: "provider returned an incomplete binding set".to_string(),
        })?;
        Ok(Self { channels })
    }

    /// Channel bound for a kind
    pub fn channel(&self, kind: EventKind) -> &ChannelHandle {
        &self.channels[kind.index()]
    }

    /// Close every channel; failures are logged and do not stop the others
    pub async fn release(self) {
        release_all(&self.channels).await;
    }
}

async fn release_all(channels: &[ChannelHandle]) {
    for channel in channels {
        if let Err(e) = channel.close().await {
            tracing::warn!(topic = channel.topic(), error = %e, "Failed to release topic");
        }
    }
}
