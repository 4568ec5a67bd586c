//! Error types for device-outbound

use thiserror::Error;

/// Errors that can occur while distributing device events
#[derive(Debug, Error)]
pub enum OutboundError {
    /// Missing or invalid configuration at start
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Topic resolution failure during startup
    #[error("Failed to bind topic '{topic}': {reason}")]
    Binding {
        topic: String,
        reason: String,
    },

    /// Command metadata could not be resolved for an invocation
    #[error("Failed to convert event '{event_id}': {reason}")]
    Conversion {
        event_id: String,
        reason: String,
    },

    /// Operation not permitted in the current lifecycle state
    ///
    /// `kind` and `event_id` are set when a per-event handler was invoked
    /// outside of `Started`, and empty for rejected lifecycle transitions.
    #[error("Invalid state {state} for {}", describe_target(.kind, .event_id))]
    InvalidState {
        state: String,
        kind: Option<String>,
        event_id: Option<String>,
    },

    /// Transport-level publish failure
    #[error("Failed to publish event '{event_id}' to topic '{topic}': {reason}")]
    Publish {
        topic: String,
        event_id: String,
        reason: String,
    },

    /// Transport connection failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// A per-kind lane stopped before answering
    #[error("Lane error: {0}")]
    Lane(String),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn describe_target(kind: &Option<String>, event_id: &Option<String>) -> String {
    match (kind, event_id) {
        (Some(kind), Some(id)) => format!("{} event '{}'", kind, id),
        (Some(kind), None) => format!("{} event", kind),
        _ => "lifecycle transition".to_string(),
    }
}

impl OutboundError {
    /// Whether this error only affects a single event (processor keeps running)
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            OutboundError::Conversion { .. }
                | OutboundError::Publish { .. }
                | OutboundError::InvalidState { .. }
                | OutboundError::Serialization(_)
                | OutboundError::Lane(_)
        )
    }
}

/// Result type alias for outbound operations
pub type Result<T> = std::result::Result<T, OutboundError>;
