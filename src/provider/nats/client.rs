//! NATS client: connect, ensure stream, publish

use super::config::{NatsConfig, StorageType};
use crate::error::{OutboundError, Result};
use async_nats::jetstream;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// NATS connection with optional JetStream context
///
/// Cheap to clone; clones share the underlying connection.
#[derive(Clone)]
pub struct NatsClient {
    client: async_nats::Client,

    /// Present when publishing through JetStream
    jetstream: Option<jetstream::Context>,

    config: Arc<NatsConfig>,
}

impl NatsClient {
    /// Connect to NATS and, in JetStream mode, ensure the stream exists
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        let connect_opts = build_connect_options(&config);

        let client = connect_opts
            .connect(&config.url)
            .await
            .map_err(|e| OutboundError::Connection(format!("{}: {}", config.url, e)))?;

        tracing::info!(url = %config.url, jetstream = config.jetstream, "Connected to NATS");

        let jetstream = if config.jetstream {
            let js = jetstream::new(client.clone());
            ensure_stream(&js, &config).await?;
            Some(js)
        } else {
            None
        };

        Ok(Self {
            client,
            jetstream,
            config: Arc::new(config),
        })
    }

    /// Whether the connection is currently up
    pub fn is_connected(&self) -> bool {
        matches!(
            self.client.connection_state(),
            async_nats::connection::State::Connected
        )
    }

    /// Publish a payload to a subject
    ///
    /// `msg_id` becomes the `Nats-Msg-Id` header in JetStream mode so the
    /// server drops duplicates of the same event.
    pub async fn publish(&self, subject: &str, msg_id: &str, payload: Bytes) -> Result<()> {
        let publish_err = |reason: String| OutboundError::Publish {
            topic: subject.to_string(),
            event_id: msg_id.to_string(),
            reason,
        };

        match &self.jetstream {
            Some(js) => {
                let mut headers = async_nats::HeaderMap::new();
                headers.insert("Nats-Msg-Id", msg_id);

                let ack_fut = js
                    .publish_with_headers(subject.to_string(), headers, payload)
                    .await
                    .map_err(|e| publish_err(e.to_string()))?;

                let timeout = Duration::from_secs(self.config.request_timeout_secs);
                let ack = tokio::time::timeout(timeout, ack_fut)
                    .await
                    .map_err(|_| {
                        publish_err(format!(
                            "ack timed out after {}s",
                            self.config.request_timeout_secs
                        ))
                    })?
                    .map_err(|e| publish_err(format!("ack failed: {}", e)))?;

                tracing::trace!(subject, sequence = ack.sequence, "JetStream ack received");
            }
            None => {
                self.client
                    .publish(subject.to_string(), payload)
                    .await
                    .map_err(|e| publish_err(e.to_string()))?;
            }
        }

        Ok(())
    }

    /// Flush buffered messages to the server
    pub async fn flush(&self) -> Result<()> {
        self.client
            .flush()
            .await
            .map_err(|e| OutboundError::Connection(format!("flush failed: {}", e)))
    }

    /// Get the underlying NATS client
    pub fn nats_client(&self) -> &async_nats::Client {
        &self.client
    }

    pub fn config(&self) -> &NatsConfig {
        &self.config
    }
}

/// Build NATS connect options from config
fn build_connect_options(config: &NatsConfig) -> async_nats::ConnectOptions {
    let mut opts = async_nats::ConnectOptions::new()
        .connection_timeout(Duration::from_secs(config.connect_timeout_secs))
        .request_timeout(Some(Duration::from_secs(config.request_timeout_secs)));

    if let Some(ref token) = config.token {
        opts = opts.token(token.clone());
    }

    opts
}

/// Ensure the JetStream stream exists with the configured limits
async fn ensure_stream(
    js: &jetstream::Context,
    config: &NatsConfig,
) -> Result<jetstream::stream::Stream> {
    let storage = match config.storage {
        StorageType::File => jetstream::stream::StorageType::File,
        StorageType::Memory => jetstream::stream::StorageType::Memory,
    };

    let max_age = if config.max_age_secs > 0 {
        Duration::from_secs(config.max_age_secs)
    } else {
        Duration::ZERO
    };

    let stream_config = jetstream::stream::Config {
        name: config.stream_name.clone(),
        subjects: config.stream_subjects(),
        storage,
        max_messages: config.max_events,
        max_age,
        max_bytes: config.max_bytes,
        retention: jetstream::stream::RetentionPolicy::Limits,
        ..Default::default()
    };

    let stream = js
        .get_or_create_stream(stream_config)
        .await
        .map_err(|e| {
            OutboundError::Connection(format!(
                "Failed to create/get stream '{}': {}",
                config.stream_name, e
            ))
        })?;

    tracing::info!(
        stream = %config.stream_name,
        subjects = ?config.stream_subjects(),
        "JetStream stream ready"
    );

    Ok(stream)
}
