//! Command metadata lookup and command invocation conversion
//!
//! Command invocations only carry a token reference to their command
//! definition. Before an invocation is published, the converter resolves
//! that reference and embeds the definition in the outbound snapshot so
//! downstream consumers never need a second lookup.

use crate::error::{OutboundError, Result};
use crate::event::DeviceCommandInvocation;
use crate::snapshot::CommandInvocationSnapshot;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Declared type of a command parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterType {
    #[default]
    String,
    Bool,
    Int32,
    Int64,
    Double,
    Bytes,
}

/// One entry in a command's parameter schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandParameter {
    pub name: String,

    #[serde(rename = "type")]
    pub parameter_type: ParameterType,

    #[serde(default)]
    pub required: bool,
}

impl CommandParameter {
    pub fn new(name: impl Into<String>, parameter_type: ParameterType, required: bool) -> Self {
        Self {
            name: name.into(),
            parameter_type,
            required,
        }
    }
}

/// A command definition as referenced by invocations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandMetadata {
    /// Token invocations use to reference this command
    pub token: String,

    /// Namespace the command belongs to (e.g., "http://example.com/commands")
    pub namespace: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Parameter schema, in declaration order
    #[serde(default)]
    pub parameters: Vec<CommandParameter>,
}

impl CommandMetadata {
    pub fn new(
        token: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            namespace: namespace.into(),
            name: name.into(),
            description: String::new(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: CommandParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Source of command definitions, scoped to one tenant
///
/// Implementations must be safe for concurrent reads: the converter calls
/// `lookup` from every command invocation lane.
#[async_trait]
pub trait CommandLookup: Send + Sync {
    /// Resolve a command token, returning `None` if no such command exists
    async fn lookup(&self, tenant: &str, token: &str) -> Result<Option<CommandMetadata>>;
}

/// In-memory command definitions keyed by (tenant, token)
///
/// Definitions may be added or replaced after the processor starts;
/// reads go through an `RwLock`.
#[derive(Default)]
pub struct MemoryCommandLookup {
    commands: RwLock<HashMap<(String, String), CommandMetadata>>,
}

impl MemoryCommandLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a command for a tenant
    pub fn insert(&self, tenant: &str, command: CommandMetadata) -> Result<()> {
        let mut commands = self.commands.write().map_err(|e| {
            OutboundError::Configuration(format!("Command lookup lock poisoned: {}", e))
        })?;
        commands.insert((tenant.to_string(), command.token.clone()), command);
        Ok(())
    }

    /// Remove a command for a tenant
    pub fn remove(&self, tenant: &str, token: &str) -> Result<Option<CommandMetadata>> {
        let mut commands = self.commands.write().map_err(|e| {
            OutboundError::Configuration(format!("Command lookup lock poisoned: {}", e))
        })?;
        Ok(commands.remove(&(tenant.to_string(), token.to_string())))
    }
}

#[async_trait]
impl CommandLookup for MemoryCommandLookup {
    async fn lookup(&self, tenant: &str, token: &str) -> Result<Option<CommandMetadata>> {
        let commands = self.commands.read().map_err(|e| {
            OutboundError::Configuration(format!("Command lookup lock poisoned: {}", e))
        })?;
        Ok(commands
            .get(&(tenant.to_string(), token.to_string()))
            .cloned())
    }
}

/// Converts command invocations into fully denormalized snapshots
///
/// Built once per processor start and bound to that start's tenant.
pub struct CommandInvocationConverter {
    lookup: Arc<dyn CommandLookup>,
    tenant: String,
}

impl CommandInvocationConverter {
    pub fn new(lookup: Arc<dyn CommandLookup>, tenant: impl Into<String>) -> Self {
        Self {
            lookup,
            tenant: tenant.into(),
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Copy the invocation and embed its resolved command definition
    ///
    /// Fails with `OutboundError::Conversion` if the command cannot be
    /// resolved; a partially populated snapshot is never produced.
    pub async fn convert(
        &self,
        invocation: &DeviceCommandInvocation,
    ) -> Result<CommandInvocationSnapshot> {
        let event_id = &invocation.header.id;
        let command = self
            .lookup
            .lookup(&self.tenant, &invocation.command_token)
            .await
            .map_err(|e| OutboundError::Conversion {
                event_id: event_id.clone(),
                reason: format!("command lookup failed: {}", e),
            })?
            .ok_or_else(|| OutboundError::Conversion {
                event_id: event_id.clone(),
                reason: format!(
                    "command '{}' not found for tenant '{}'",
                    invocation.command_token, self.tenant
                ),
            })?;

        Ok(CommandInvocationSnapshot::new(invocation, command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventHeader;

    fn reboot_command() -> CommandMetadata {
        CommandMetadata::new("reboot", "http://devices/commands", "reboot")
            .with_description("Restart the device")
            .with_parameter(CommandParameter::new("delay", ParameterType::Int32, false))
    }

    fn converter() -> (Arc<MemoryCommandLookup>, CommandInvocationConverter) {
        let lookup = Arc::new(MemoryCommandLookup::new());
        lookup.insert("default", reboot_command()).unwrap();
        let converter = CommandInvocationConverter::new(lookup.clone(), "default");
        (lookup, converter)
    }

    #[tokio::test]
    async fn test_convert_embeds_command() {
        let (_, converter) = converter();
        let invocation = DeviceCommandInvocation::new(EventHeader::new("c-1", "assign-1"), "reboot")
            .with_parameter("delay", "5");

        let snapshot = converter.convert(&invocation).await.unwrap();
        assert_eq!(snapshot.header.id, "c-1");
        assert_eq!(snapshot.command.name, "reboot");
        assert_eq!(snapshot.command.namespace, "http://devices/commands");
        assert_eq!(snapshot.command.parameters.len(), 1);
        assert_eq!(snapshot.parameter_values["delay"], "5");
    }

    #[tokio::test]
    async fn test_convert_unknown_command_fails() {
        let (_, converter) = converter();
        let invocation =
            DeviceCommandInvocation::new(EventHeader::new("c-2", "assign-1"), "self-destruct");

        let err = converter.convert(&invocation).await.unwrap_err();
        match err {
            OutboundError::Conversion { event_id, reason } => {
                assert_eq!(event_id, "c-2");
                assert!(reason.contains("self-destruct"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_convert_is_tenant_scoped() {
        let lookup = Arc::new(MemoryCommandLookup::new());
        lookup.insert("tenant-a", reboot_command()).unwrap();
        let converter = CommandInvocationConverter::new(lookup, "tenant-b");
        let invocation = DeviceCommandInvocation::new(EventHeader::new("c-3", "assign-1"), "reboot");

        assert!(converter.convert(&invocation).await.is_err());
        assert_eq!(converter.tenant(), "tenant-b");
    }

    #[tokio::test]
    async fn test_convert_twice_yields_same_command() {
        let (_, converter) = converter();
        let invocation = DeviceCommandInvocation::new(EventHeader::new("c-4", "assign-1"), "reboot");

        let first = converter.convert(&invocation).await.unwrap();
        let second = converter.convert(&invocation).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_lookup_sees_later_registrations() {
        let (lookup, converter) = converter();
        let invocation = DeviceCommandInvocation::new(EventHeader::new("c-5", "assign-1"), "ping");
        assert!(converter.convert(&invocation).await.is_err());

        lookup
            .insert("default", CommandMetadata::new("ping", "http://devices/commands", "ping"))
            .unwrap();
        let snapshot = converter.convert(&invocation).await.unwrap();
        assert_eq!(snapshot.command.name, "ping");

        lookup.remove("default", "ping").unwrap();
        assert!(converter.convert(&invocation).await.is_err());
    }
}
