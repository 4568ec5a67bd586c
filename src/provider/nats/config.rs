//! NATS provider configuration

use crate::error::{OutboundError, Result};
use serde::{Deserialize, Serialize};

/// Storage backend for the JetStream stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageType {
    #[default]
    File,
    Memory,
}

/// Configuration for the NATS topic provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NatsConfig {
    /// Server URL (e.g., "nats://127.0.0.1:4222")
    pub url: String,

    /// Prefix prepended to every topic subject
    pub subject_prefix: String,

    /// Publish through JetStream (persisted) instead of core NATS
    pub jetstream: bool,

    /// JetStream stream capturing `<subject_prefix>.>`
    pub stream_name: String,

    pub storage: StorageType,

    /// Maximum messages retained by the stream
    pub max_events: i64,

    /// Maximum message age in seconds (0 = unlimited)
    pub max_age_secs: u64,

    /// Maximum bytes retained by the stream (-1 = unlimited)
    pub max_bytes: i64,

    pub connect_timeout_secs: u64,

    /// Timeout for requests and JetStream publish acks
    pub request_timeout_secs: u64,

    /// Optional auth token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://127.0.0.1:4222".to_string(),
            subject_prefix: "outbound".to_string(),
            jetstream: true,
            stream_name: "DEVICE_EVENTS".to_string(),
            storage: StorageType::File,
            max_events: 100_000,
            max_age_secs: 7 * 24 * 3600,
            max_bytes: -1,
            connect_timeout_secs: 5,
            request_timeout_secs: 10,
            token: None,
        }
    }
}

impl NatsConfig {
    /// Subject a topic publishes to, scoped by tenant
    ///
    /// The tenant and topic must each be a single literal subject token, so
    /// `<prefix>.<tenant>.<topic>` always names exactly one subject.
    pub fn topic_subject(&self, tenant: &str, topic: &str) -> Result<String> {
        for (label, token) in [("tenant", tenant), ("topic", topic)] {
            if !is_subject_token(token) {
                return Err(OutboundError::Binding {
                    topic: topic.to_string(),
                    reason: format!("{} '{}' is not a valid NATS subject token", label, token),
                });
            }
        }
        Ok(format!("{}.{}.{}", self.subject_prefix, tenant, topic))
    }

    /// Subjects captured by the JetStream stream
    pub fn stream_subjects(&self) -> Vec<String> {
        vec![format!("{}.>", self.subject_prefix)]
    }
}

/// Non-empty, no separators, no wildcards
fn is_subject_token(token: &str) -> bool {
    !token.is_empty()
        && !token
            .chars()
            .any(|c| c == '.' || c == '*' || c == '>' || c.is_whitespace() || c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_subject() {
        let config = NatsConfig::default();
        assert_eq!(
            config.topic_subject("acme", "alert-added").unwrap(),
            "outbound.acme.alert-added"
        );
        assert_eq!(config.stream_subjects(), vec!["outbound.>"]);
    }

    #[test]
    fn test_topic_subject_rejects_non_token_tenants() {
        let config = NatsConfig::default();
        for tenant in ["acme eu", "acme.eu", "acme*", ">", "", "acme\t"] {
            let err = config.topic_subject(tenant, "alert-added").unwrap_err();
            assert!(
                matches!(&err, OutboundError::Binding { topic, .. } if topic == "alert-added"),
                "tenant {:?} gave {:?}",
                tenant,
                err
            );
        }
        assert!(config.topic_subject("acme-eu_1", "alert-added").is_ok());
    }

    #[test]
    fn test_deserialize_partial() {
        let json = r#"{
            "url": "nats://nats:4222",
            "subjectPrefix": "sw",
            "jetstream": false,
            "streamName": "SW",
            "storage": "memory",
            "maxEvents": 10,
            "maxAgeSecs": 60,
            "maxBytes": -1,
            "connectTimeoutSecs": 1,
            "requestTimeoutSecs": 2
        }"#;
        let config: NatsConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.storage, StorageType::Memory);
        assert!(!config.jetstream);
        assert!(config.token.is_none());
    }
}
