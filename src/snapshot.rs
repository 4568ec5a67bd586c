//! Detached, serializable copies of device events
//!
//! A snapshot owns every field it carries, so a transport may serialize it
//! or retain it for as long as it likes without touching upstream state.

use crate::command::CommandMetadata;
use crate::event::{
    CommandActor, CommandStatus, DeviceAlert, DeviceCommandInvocation, DeviceCommandResponse,
    DeviceEvent, DeviceLocation, DeviceMeasurements, EventHeader, EventKind,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A command invocation with its command definition embedded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandInvocationSnapshot {
    #[serde(flatten)]
    pub header: EventHeader,

    pub initiator: CommandActor,
    pub initiator_id: String,
    pub target: CommandActor,
    pub target_id: String,
    pub command_token: String,
    pub parameter_values: HashMap<String, String>,
    pub status: CommandStatus,

    /// Resolved command definition
    pub command: CommandMetadata,
}

impl CommandInvocationSnapshot {
    pub fn new(invocation: &DeviceCommandInvocation, command: CommandMetadata) -> Self {
        Self {
            header: invocation.header.clone(),
            initiator: invocation.initiator,
            initiator_id: invocation.initiator_id.clone(),
            target: invocation.target,
            target_id: invocation.target_id.clone(),
            command_token: invocation.command_token.clone(),
            parameter_values: invocation.parameter_values.clone(),
            status: invocation.status,
            command,
        }
    }
}

/// The value published on a kind's topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "camelCase")]
pub enum EventSnapshot {
    Measurements(DeviceMeasurements),
    Location(DeviceLocation),
    Alert(DeviceAlert),
    CommandInvocation(CommandInvocationSnapshot),
    CommandResponse(DeviceCommandResponse),
}

impl EventSnapshot {
    pub fn measurements(event: &DeviceMeasurements) -> Self {
        EventSnapshot::Measurements(event.clone())
    }

    pub fn location(event: &DeviceLocation) -> Self {
        EventSnapshot::Location(event.clone())
    }

    pub fn alert(event: &DeviceAlert) -> Self {
        EventSnapshot::Alert(event.clone())
    }

    pub fn command_response(event: &DeviceCommandResponse) -> Self {
        EventSnapshot::CommandResponse(event.clone())
    }

    /// Copy any event that needs no auxiliary lookup
    ///
    /// Returns `None` for command invocations, which must go through
    /// [`CommandInvocationConverter`](crate::command::CommandInvocationConverter).
    pub fn copy(event: &DeviceEvent) -> Option<Self> {
        match event {
            DeviceEvent::Measurements(e) => Some(Self::measurements(e)),
            DeviceEvent::Location(e) => Some(Self::location(e)),
            DeviceEvent::Alert(e) => Some(Self::alert(e)),
            DeviceEvent::CommandResponse(e) => Some(Self::command_response(e)),
            DeviceEvent::CommandInvocation(_) => None,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            EventSnapshot::Measurements(_) => EventKind::Measurements,
            EventSnapshot::Location(_) => EventKind::Location,
            EventSnapshot::Alert(_) => EventKind::Alert,
            EventSnapshot::CommandInvocation(_) => EventKind::CommandInvocation,
            EventSnapshot::CommandResponse(_) => EventKind::CommandResponse,
        }
    }

    pub fn header(&self) -> &EventHeader {
        match self {
            EventSnapshot::Measurements(s) => &s.header,
            EventSnapshot::Location(s) => &s.header,
            EventSnapshot::Alert(s) => &s.header,
            EventSnapshot::CommandInvocation(s) => &s.header,
            EventSnapshot::CommandResponse(s) => &s.header,
        }
    }

    pub fn id(&self) -> &str {
        &self.header().id
    }

    /// Serialize to JSON bytes for transports that carry raw payloads
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{AlertLevel, EventHeader};

    #[test]
    fn test_copy_is_detached_from_source() {
        let mut source = DeviceMeasurements::new(EventHeader::new("m-1", "assign-1"))
            .with_measurement("engine.temp", 88.5);

        let snapshot = EventSnapshot::measurements(&source);
        source.measurements.insert("engine.temp".to_string(), 120.0);
        source.header.metadata.insert("late".to_string(), "edit".to_string());

        match snapshot {
            EventSnapshot::Measurements(copy) => {
                assert_eq!(copy.measurements["engine.temp"], 88.5);
                assert!(copy.header.metadata.is_empty());
            }
            other => panic!("unexpected snapshot: {:?}", other),
        }
    }

    #[test]
    fn test_copy_matches_source_fields() {
        let alert = DeviceAlert::new(
            EventHeader::new("a-1", "assign-1"),
            "engine.overheat",
            AlertLevel::Critical,
            "Engine temperature high",
        );
        let event = DeviceEvent::Alert(alert.clone());

        let snapshot = EventSnapshot::copy(&event).unwrap();
        assert_eq!(snapshot, EventSnapshot::Alert(alert));
        assert_eq!(snapshot.kind(), EventKind::Alert);
        assert_eq!(snapshot.id(), "a-1");
    }

    #[test]
    fn test_copy_refuses_invocations() {
        let event = DeviceEvent::CommandInvocation(DeviceCommandInvocation::new(
            EventHeader::new("c-1", "assign-1"),
            "reboot",
        ));
        assert!(EventSnapshot::copy(&event).is_none());
    }

    #[test]
    fn test_repeated_copies_are_equal() {
        let location = DeviceLocation::new(EventHeader::new("l-1", "assign-1"), 33.75, -84.39, 320.0);
        assert_eq!(EventSnapshot::location(&location), EventSnapshot::location(&location));
    }

    #[test]
    fn test_snapshot_wire_format() {
        let response = DeviceCommandResponse::new(EventHeader::new("r-1", "assign-1"), "c-1", "ok");
        let bytes = EventSnapshot::command_response(&response).to_json_bytes().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["eventType"], "commandResponse");
        assert_eq!(json["id"], "r-1");
        assert_eq!(json["originatingEventId"], "c-1");
        assert!(json.get("responseEventId").is_none());
    }
}
