//! Processor configuration
//!
//! The configuration handle is supplied to the processor before start and
//! passed through to the topic provider when topics are bound. Only
//! `tenant` and `laneCapacity` are interpreted by the processor itself.

use crate::error::{OutboundError, Result};
use crate::filter::FilterConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default bounded queue size for each per-kind lane
pub const DEFAULT_LANE_CAPACITY: usize = 1024;

/// Configuration for a distribution processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundConfig {
    /// Tenant the processor (and its command lookups) are scoped to
    pub tenant: String,

    /// Maximum queued events per kind before handlers wait for room
    #[serde(default = "default_lane_capacity")]
    pub lane_capacity: usize,

    /// Filters instantiated at start, after programmatic filters
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
}

fn default_lane_capacity() -> usize {
    DEFAULT_LANE_CAPACITY
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            tenant: "default".to_string(),
            lane_capacity: DEFAULT_LANE_CAPACITY,
            filters: Vec::new(),
        }
    }
}

impl OutboundConfig {
    /// Create a configuration for a tenant with default settings
    pub fn for_tenant(tenant: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            ..Default::default()
        }
    }

    /// Add a declarative filter
    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filters.push(filter);
        self
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            OutboundError::Configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: OutboundConfig = serde_json::from_str(&json).map_err(|e| {
            OutboundError::Configuration(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;

        tracing::debug!(path = %path.display(), tenant = %config.tenant, "Config loaded");
        Ok(config)
    }

    /// Check the settings the processor depends on
    pub fn validate(&self) -> Result<()> {
        if self.tenant.trim().is_empty() {
            return Err(OutboundError::Configuration(
                "Tenant cannot be empty".to_string(),
            ));
        }
        if self.lane_capacity == 0 {
            return Err(OutboundError::Configuration(
                "Lane capacity must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}
