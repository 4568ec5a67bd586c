//! Device event model
//!
//! Events arrive from the upstream ingestion pipeline one at a time and are
//! read-only from the outbound stage's point of view. All types use camelCase
//! JSON serialization for wire compatibility.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The five kinds of device event that are distributed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    Measurements,
    Location,
    Alert,
    CommandInvocation,
    CommandResponse,
}

impl EventKind {
    /// All kinds, in topic binding order
    pub const ALL: [EventKind; 5] = [
        EventKind::Measurements,
        EventKind::Location,
        EventKind::Alert,
        EventKind::CommandInvocation,
        EventKind::CommandResponse,
    ];

    /// Stable index into per-kind tables
    pub fn index(self) -> usize {
        match self {
            EventKind::Measurements => 0,
            EventKind::Location => 1,
            EventKind::Alert => 2,
            EventKind::CommandInvocation => 3,
            EventKind::CommandResponse => 4,
        }
    }

    /// Short lowercase name used in logs and errors
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Measurements => "measurements",
            EventKind::Location => "location",
            EventKind::Alert => "alert",
            EventKind::CommandInvocation => "command-invocation",
            EventKind::CommandResponse => "command-response",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields shared by every device event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHeader {
    /// Unique event identifier
    pub id: String,

    /// Token of the device assignment that produced the event
    pub device_assignment_token: String,

    /// Token of the device itself
    pub device_token: String,

    /// When the event occurred on the device
    pub event_date: DateTime<Utc>,

    /// When the platform received the event
    pub received_date: DateTime<Utc>,

    /// Optional key-value metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl EventHeader {
    /// Create a header for the given assignment with the current time
    pub fn new(id: impl Into<String>, device_assignment_token: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            device_assignment_token: device_assignment_token.into(),
            device_token: String::new(),
            event_date: now,
            received_date: now,
            metadata: HashMap::new(),
        }
    }

    /// Create a header with a generated id
    pub fn generated(device_assignment_token: impl Into<String>) -> Self {
        Self::new(
            format!("evt-{}", uuid::Uuid::new_v4()),
            device_assignment_token,
        )
    }
}

/// A set of named measurement values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMeasurements {
    #[serde(flatten)]
    pub header: EventHeader,

    /// Measurement name → value
    pub measurements: HashMap<String, f64>,
}

impl DeviceMeasurements {
    pub fn new(header: EventHeader) -> Self {
        Self {
            header,
            measurements: HashMap::new(),
        }
    }

    /// Add a measurement value
    pub fn with_measurement(mut self, name: impl Into<String>, value: f64) -> Self {
        self.measurements.insert(name.into(), value);
        self
    }
}

/// A reported device position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceLocation {
    #[serde(flatten)]
    pub header: EventHeader,

    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
}

impl DeviceLocation {
    pub fn new(header: EventHeader, latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            header,
            latitude,
            longitude,
            elevation,
        }
    }
}

/// Who raised an alert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertSource {
    #[default]
    Device,
    System,
}

/// Alert severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

/// An alert raised by or about a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAlert {
    #[serde(flatten)]
    pub header: EventHeader,

    pub source: AlertSource,

    /// Alert type identifier (e.g., "engine.overheat")
    #[serde(rename = "type")]
    pub alert_type: String,

    pub level: AlertLevel,

    pub message: String,
}

impl DeviceAlert {
    pub fn new(
        header: EventHeader,
        alert_type: impl Into<String>,
        level: AlertLevel,
        message: impl Into<String>,
    ) -> Self {
        Self {
            header,
            source: AlertSource::Device,
            alert_type: alert_type.into(),
            level,
            message: message.into(),
        }
    }
}

/// Who or what a command is sent on behalf of / targeted at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandActor {
    #[default]
    Rest,
    Script,
    Scheduler,
    BatchOperation,
    Assignment,
}

/// Delivery status of a command invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandStatus {
    #[default]
    Pending,
    Sent,
    Responded,
    Failed,
}

/// A request to execute a command on a device
///
/// Carries only a token reference to the command definition; the
/// outbound snapshot embeds the resolved definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCommandInvocation {
    #[serde(flatten)]
    pub header: EventHeader,

    pub initiator: CommandActor,
    pub initiator_id: String,
    pub target: CommandActor,
    pub target_id: String,

    /// Token of the referenced command definition
    pub command_token: String,

    /// Parameter name → value
    #[serde(default)]
    pub parameter_values: HashMap<String, String>,

    #[serde(default)]
    pub status: CommandStatus,
}

impl DeviceCommandInvocation {
    pub fn new(header: EventHeader, command_token: impl Into<String>) -> Self {
        let target_id = header.device_assignment_token.clone();
        Self {
            header,
            initiator: CommandActor::Rest,
            initiator_id: String::new(),
            target: CommandActor::Assignment,
            target_id,
            command_token: command_token.into(),
            parameter_values: HashMap::new(),
            status: CommandStatus::Pending,
        }
    }

    /// Add a parameter value
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameter_values.insert(name.into(), value.into());
        self
    }
}

/// A device's answer to a command invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCommandResponse {
    #[serde(flatten)]
    pub header: EventHeader,

    /// Id of the invocation being answered
    pub originating_event_id: String,

    /// Id of an event emitted as the response, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_event_id: Option<String>,

    pub response: String,
}

impl DeviceCommandResponse {
    pub fn new(
        header: EventHeader,
        originating_event_id: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            header,
            originating_event_id: originating_event_id.into(),
            response_event_id: None,
            response: response.into(),
        }
    }
}

/// Any device event, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "camelCase")]
pub enum DeviceEvent {
    Measurements(DeviceMeasurements),
    Location(DeviceLocation),
    Alert(DeviceAlert),
    CommandInvocation(DeviceCommandInvocation),
    CommandResponse(DeviceCommandResponse),
}

impl DeviceEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DeviceEvent::Measurements(_) => EventKind::Measurements,
            DeviceEvent::Location(_) => EventKind::Location,
            DeviceEvent::Alert(_) => EventKind::Alert,
            DeviceEvent::CommandInvocation(_) => EventKind::CommandInvocation,
            DeviceEvent::CommandResponse(_) => EventKind::CommandResponse,
        }
    }

    pub fn header(&self) -> &EventHeader {
        match self {
            DeviceEvent::Measurements(e) => &e.header,
            DeviceEvent::Location(e) => &e.header,
            DeviceEvent::Alert(e) => &e.header,
            DeviceEvent::CommandInvocation(e) => &e.header,
            DeviceEvent::CommandResponse(e) => &e.header,
        }
    }

    pub fn id(&self) -> &str {
        &self.header().id
    }
}

impl From<DeviceMeasurements> for DeviceEvent {
    fn from(e: DeviceMeasurements) -> Self {
        DeviceEvent::Measurements(e)
    }
}

impl From<DeviceLocation> for DeviceEvent {
    fn from(e: DeviceLocation) -> Self {
        DeviceEvent::Location(e)
    }
}

impl From<DeviceAlert> for DeviceEvent {
    fn from(e: DeviceAlert) -> Self {
        DeviceEvent::Alert(e)
    }
}

impl From<DeviceCommandInvocation> for DeviceEvent {
    fn from(e: DeviceCommandInvocation) -> Self {
        DeviceEvent::CommandInvocation(e)
    }
}

impl From<DeviceCommandResponse> for DeviceEvent {
    fn from(e: DeviceCommandResponse) -> Self {
        DeviceEvent::CommandResponse(e)
    }
}
