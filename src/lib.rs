//! # device-outbound
//!
//! Filtered outbound distribution of device events onto per-kind topics.
//!
//! ## Overview
//!
//! A `DistributionProcessor` receives device events (measurements,
//! locations, alerts, command invocations and command responses), runs each
//! one through its kind's filter chain, converts accepted events into
//! detached snapshots and publishes every snapshot exactly once on the
//! kind's topic. Swap transports (in-memory, NATS) without changing
//! application code.
//!
//! ## Quick Start
//!
//! ```rust
//! use device_outbound::{
//!     DeviceMeasurements, DistributionProcessor, EventHeader, MemoryCommandLookup,
//!     MemoryProvider, OutboundConfig, Outcome,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> device_outbound::Result<()> {
//! let provider = Arc::new(MemoryProvider::default());
//! let processor = DistributionProcessor::builder(provider.clone(), Arc::new(MemoryCommandLookup::new()))
//!     .configuration(OutboundConfig::for_tenant("acme"))
//!     .build();
//!
//! processor.start().await?;
//!
//! let event = DeviceMeasurements::new(EventHeader::new("m-1", "assignment-7"))
//!     .with_measurement("engine.temp", 88.5);
//! assert_eq!(processor.on_measurements(event).await?, Outcome::Published);
//! assert_eq!(provider.published("measurements-added").len(), 1);
//!
//! processor.stop().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Providers
//!
//! - **memory**: In-process broadcast topics for testing and single-process use
//! - **nats**: NATS subjects, optionally persisted through JetStream
//!
//! ## Architecture
//!
//! - **FilterChain**: five ordered predicate chains, one per event kind
//! - **CommandInvocationConverter**: embeds command definitions in invocation snapshots
//! - **TopicBindings**: the five topic channels, bound all-or-nothing at start
//! - **DistributionProcessor**: lifecycle state machine and per-kind publish lanes

pub mod command;
pub mod config;
pub mod dlq;
pub mod error;
pub mod event;
pub mod filter;
pub mod metrics;
pub mod processor;
pub mod provider;
pub mod snapshot;
pub mod topic;

// Re-export core types
pub use command::{
    CommandInvocationConverter, CommandLookup, CommandMetadata, CommandParameter,
    MemoryCommandLookup, ParameterType,
};
pub use config::OutboundConfig;
pub use dlq::{DeadLetterEvent, DlqHandler, MemoryDlqHandler};
pub use error::{OutboundError, Result};
pub use event::{
    AlertLevel, AlertSource, CommandActor, CommandStatus, DeviceAlert, DeviceCommandInvocation,
    DeviceCommandResponse, DeviceEvent, DeviceLocation, DeviceMeasurements, EventHeader,
    EventKind,
};
pub use filter::{
    AlertLevelFilter, AssignmentFilter, EventFilter, FilterChain, FilterConfig, FilterOperation,
    FnFilter,
};
pub use metrics::{KindCounts, MetricsSnapshot, ProcessorMetrics};
pub use processor::{Delivery, DistributionProcessor, LifecycleState, Outcome, ProcessorBuilder};
pub use provider::{ChannelHandle, TopicChannel, TopicProvider};
pub use snapshot::{CommandInvocationSnapshot, EventSnapshot};
pub use topic::{topic_name, TopicBindings};

// Re-export providers for convenience
pub use provider::memory::{MemoryConfig, MemoryProvider, MemoryTopic};
pub use provider::nats::{NatsClient, NatsConfig, NatsProvider, NatsTopic, StorageType};
