//! Distribution processor: filters, converts and publishes device events
//!
//! `DistributionProcessor` owns the filter chains, the five topic bindings
//! and one lane per event kind. A lane is a bounded single-consumer queue
//! drained by one task, so events of the same kind are converted and
//! published in the order they were submitted. Kinds are independent of
//! each other: a slow or failing topic only ever holds up its own lane.
//!
//! Lifecycle:
//!
//! ```text
//! Created ──start──▶ Starting ──▶ Started ──stop──▶ Stopping ──▶ Stopped
//!                       │                                          │
//!                       └──────▶ Errored ◀───── (start/restart) ───┘
//! ```

use crate::command::{CommandInvocationConverter, CommandLookup};
use crate::config::OutboundConfig;
use crate::dlq::{DeadLetterEvent, DlqHandler};
use crate::error::{OutboundError, Result};
use crate::event::{
    DeviceAlert, DeviceCommandInvocation, DeviceCommandResponse, DeviceEvent, DeviceLocation,
    DeviceMeasurements, EventKind,
};
use crate::filter::{EventFilter, FilterChain};
use crate::metrics::ProcessorMetrics;
use crate::provider::{ChannelHandle, TopicProvider};
use crate::snapshot::EventSnapshot;
use crate::topic::{topic_name, TopicBindings};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Lifecycle state of a processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Starting,
    Started,
    Stopping,
    Stopped,
    Errored,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What happened to an accepted-for-processing event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Published exactly once on the kind's topic
    Published,
    /// Dropped by the kind's filter chain; nothing was published
    Filtered,
}

/// Handle to an event that has been queued on its lane
///
/// Returned by [`DistributionProcessor::submit`]. Submission order within a
/// kind is publish order; `wait` resolves once the lane has handled the event.
#[must_use = "a delivery does nothing unless waited on or dropped deliberately"]
pub struct Delivery {
    kind: EventKind,
    event_id: String,
    pending: Option<oneshot::Receiver<Result<()>>>,
}

impl Delivery {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// Wait for the lane to convert and publish the event
    pub async fn wait(self) -> Result<Outcome> {
        match self.pending {
            None => Ok(Outcome::Filtered),
            Some(rx) => {
                rx.await.map_err(|_| {
                    tracing::warn!(
                        event_id = %self.event_id,
                        kind = %self.kind,
                        "Lane dropped event without answering"
                    );
                    OutboundError::Lane(format!(
                        "{} lane dropped event '{}' without answering",
                        self.kind, self.event_id
                    ))
                })??;
                Ok(Outcome::Published)
            }
        }
    }
}

struct LaneJob {
    event: DeviceEvent,
    respond: oneshot::Sender<Result<()>>,
}

/// Everything a lane task needs; shared read-only across lanes
struct LaneContext {
    kind: EventKind,
    channel: ChannelHandle,
    converter: Arc<CommandInvocationConverter>,
    metrics: Arc<ProcessorMetrics>,
    dlq: Option<Arc<dyn DlqHandler>>,
}

/// Resources acquired at start and released at stop
struct Running {
    lanes: [mpsc::Sender<LaneJob>; 5],
    workers: Vec<JoinHandle<()>>,
    bindings: TopicBindings,
    filters: Arc<FilterChain>,
}

impl Running {
    /// Close the lanes, let queued events finish, then release the topics
    async fn shutdown(self) {
        let Running {
            lanes,
            workers,
            bindings,
            ..
        } = self;
        drop(lanes);

        for result in futures::future::join_all(workers).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Lane task ended abnormally");
            }
        }
        bindings.release().await;
    }
}

struct Inner {
    state: LifecycleState,
    configuration: Option<Arc<OutboundConfig>>,
    running: Option<Running>,
}

/// Filtered outbound processor publishing device events onto per-kind topics
///
/// All methods take `&self`; share the processor with `Arc` to call the
/// handlers from many tasks at once.
pub struct DistributionProcessor {
    name: String,
    provider: Arc<dyn TopicProvider>,
    lookup: Arc<dyn CommandLookup>,
    filters: RwLock<FilterChain>,
    dlq: Option<Arc<dyn DlqHandler>>,
    metrics: Arc<ProcessorMetrics>,
    span: tracing::Span,

    /// Serializes start/stop
    lifecycle: Mutex<()>,

    inner: RwLock<Inner>,
}

/// Builder for [`DistributionProcessor`]
pub struct ProcessorBuilder {
    name: String,
    provider: Arc<dyn TopicProvider>,
    lookup: Arc<dyn CommandLookup>,
    configuration: Option<OutboundConfig>,
    filters: FilterChain,
    dlq: Option<Arc<dyn DlqHandler>>,
    span: Option<tracing::Span>,
}

impl ProcessorBuilder {
    /// Name used in the processor's span and logs
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn configuration(mut self, config: OutboundConfig) -> Self {
        self.configuration = Some(config);
        self
    }

    /// Append a filter to one kind's chain
    pub fn filter(mut self, kind: EventKind, filter: impl EventFilter + 'static) -> Self {
        self.filters.add(kind, Arc::new(filter));
        self
    }

    /// Replace the whole filter chain
    pub fn filters(mut self, filters: FilterChain) -> Self {
        self.filters = filters;
        self
    }

    pub fn dlq_handler(mut self, handler: Arc<dyn DlqHandler>) -> Self {
        self.dlq = Some(handler);
        self
    }

    /// Span every log line of this processor is recorded under
    pub fn span(mut self, span: tracing::Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn build(self) -> DistributionProcessor {
        let span = self
            .span
            .unwrap_or_else(|| tracing::info_span!("outbound", processor = %self.name));

        DistributionProcessor {
            name: self.name,
            provider: self.provider,
            lookup: self.lookup,
            filters: RwLock::new(self.filters),
            dlq: self.dlq,
            metrics: Arc::new(ProcessorMetrics::new()),
            span,
            lifecycle: Mutex::new(()),
            inner: RwLock::new(Inner {
                state: LifecycleState::Created,
                configuration: self.configuration.map(Arc::new),
                running: None,
            }),
        }
    }
}

impl DistributionProcessor {
    /// Start building a processor over a topic provider and command source
    pub fn builder(
        provider: Arc<dyn TopicProvider>,
        lookup: Arc<dyn CommandLookup>,
    ) -> ProcessorBuilder {
        ProcessorBuilder {
            name: "outbound".to_string(),
            provider,
            lookup,
            configuration: None,
            filters: FilterChain::new(),
            dlq: None,
            span: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.read_inner()
            .map(|inner| inner.state)
            .unwrap_or(LifecycleState::Errored)
    }

    /// Delivery counters
    pub fn metrics(&self) -> &ProcessorMetrics {
        &self.metrics
    }

    /// Replace the configuration; takes effect at the next start
    pub fn set_configuration(&self, config: OutboundConfig) -> Result<()> {
        self.write_inner()?.configuration = Some(Arc::new(config));
        Ok(())
    }

    /// Configuration the processor will start (or was started) with
    pub fn configuration(&self) -> Option<Arc<OutboundConfig>> {
        self.read_inner().ok().and_then(|inner| inner.configuration.clone())
    }

    /// Register a filter; takes effect at the next start
    pub fn add_filter(&self, kind: EventKind, filter: Arc<dyn EventFilter>) -> Result<()> {
        let mut filters = self
            .filters
            .write()
            .map_err(|e| OutboundError::Configuration(format!("Filter lock poisoned: {}", e)))?;
        filters.add(kind, filter);
        Ok(())
    }

    /// Start the processor: set up filters, build the converter, bind topics
    ///
    /// Valid from `Created`, `Stopped` and `Errored`. Any failure leaves the
    /// processor in `Errored` with no topics bound.
    pub async fn start(&self) -> Result<()> {
        let span = self.span.clone();
        async move {
            let _lifecycle = self.lifecycle.lock().await;

            let config = {
                let mut inner = self.write_inner()?;
                match inner.state {
                    LifecycleState::Created | LifecycleState::Stopped | LifecycleState::Errored => {}
                    state => return Err(transition_error(state)),
                }
                inner.state = LifecycleState::Starting;
                inner.configuration.clone()
            };
            tracing::info!(provider = self.provider.name(), "Processor starting");

            match self.acquire(config).await {
                Ok(running) => {
                    let mut inner = self.write_inner()?;
                    inner.running = Some(running);
                    inner.state = LifecycleState::Started;
                    tracing::info!("Processor started");
                    Ok(())
                }
                Err(e) => {
                    self.write_inner()?.state = LifecycleState::Errored;
                    tracing::error!(error = %e, "Processor failed to start");
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Stop the processor
    ///
    /// New events are refused as soon as stopping begins; events already
    /// queued on a lane are published before the topics are released.
    /// Calling stop when not started is a no-op.
    pub async fn stop(&self) -> Result<()> {
        let span = self.span.clone();
        async move {
            let _lifecycle = self.lifecycle.lock().await;

            let running = {
                let mut inner = self.write_inner()?;
                if inner.state != LifecycleState::Started {
                    tracing::debug!(state = %inner.state, "Stop ignored");
                    return Ok(());
                }
                inner.state = LifecycleState::Stopping;
                inner.running.take()
            };
            tracing::info!("Processor stopping");

            if let Some(running) = running {
                running.shutdown().await;
            }

            self.write_inner()?.state = LifecycleState::Stopped;
            tracing::info!("Processor stopped");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Stop (if started) and start again
    pub async fn restart(&self) -> Result<()> {
        self.stop().await?;
        self.start().await
    }

    /// Filter an event and, if accepted, queue it on its kind's lane
    ///
    /// Returns once the event is queued (or filtered); the returned
    /// [`Delivery`] resolves when it has been published.
    pub async fn submit(&self, event: DeviceEvent) -> Result<Delivery> {
        let kind = event.kind();
        let event_id = event.id().to_string();

        let (lane, filters) = {
            let inner = self.read_inner()?;
            let running = match (inner.state, inner.running.as_ref()) {
                (LifecycleState::Started, Some(running)) => running,
                (state, _) => {
                    self.metrics.record_rejected();
                    tracing::warn!(
                        parent: &self.span,
                        event_id = %event_id,
                        kind = %kind,
                        state = %state,
                        "Event refused, processor not started"
                    );
                    return Err(OutboundError::InvalidState {
                        state: state.to_string(),
                        kind: Some(kind.to_string()),
                        event_id: Some(event_id),
                    });
                }
            };
            (running.lanes[kind.index()].clone(), running.filters.clone())
        };

        if let Some(filter) = filters.rejected_by(&event) {
            self.metrics.record_filtered(kind);
            tracing::debug!(
                parent: &self.span,
                event_id = %event_id,
                kind = %kind,
                filter,
                "Event filtered"
            );
            return Ok(Delivery {
                kind,
                event_id,
                pending: None,
            });
        }

        let (respond, rx) = oneshot::channel();
        if lane.send(LaneJob { event, respond }).await.is_err() {
            tracing::warn!(
                parent: &self.span,
                event_id = %event_id,
                kind = %kind,
                "Event refused, lane is closed"
            );
            return Err(OutboundError::Lane(format!(
                "{} lane is closed, event '{}' not queued",
                kind, event_id
            )));
        }

        Ok(Delivery {
            kind,
            event_id,
            pending: Some(rx),
        })
    }

    /// Filter, convert and publish one event, waiting for the publish
    pub async fn process(&self, event: DeviceEvent) -> Result<Outcome> {
        self.submit(event).await?.wait().await
    }

    pub async fn on_measurements(&self, measurements: DeviceMeasurements) -> Result<Outcome> {
        self.process(DeviceEvent::Measurements(measurements)).await
    }

    pub async fn on_location(&self, location: DeviceLocation) -> Result<Outcome> {
        self.process(DeviceEvent::Location(location)).await
    }

    pub async fn on_alert(&self, alert: DeviceAlert) -> Result<Outcome> {
        self.process(DeviceEvent::Alert(alert)).await
    }

    pub async fn on_command_invocation(
        &self,
        invocation: DeviceCommandInvocation,
    ) -> Result<Outcome> {
        self.process(DeviceEvent::CommandInvocation(invocation)).await
    }

    pub async fn on_command_response(&self, response: DeviceCommandResponse) -> Result<Outcome> {
        self.process(DeviceEvent::CommandResponse(response)).await
    }

    /// Acquire everything `Started` needs, or nothing
    async fn acquire(&self, config: Option<Arc<OutboundConfig>>) -> Result<Running> {
        let config = config.ok_or_else(|| {
            OutboundError::Configuration("No outbound configuration provided".to_string())
        })?;
        config.validate()?;

        let filters = {
            let mut chain = self
                .filters
                .read()
                .map_err(|e| OutboundError::Configuration(format!("Filter lock poisoned: {}", e)))?
                .clone();
            chain.extend_from_config(&config.filters);
            Arc::new(chain)
        };
        tracing::debug!(filters = ?filters, "Filter chains ready");

        let converter = Arc::new(CommandInvocationConverter::new(
            self.lookup.clone(),
            config.tenant.clone(),
        ));

        let bindings = TopicBindings::bind(self.provider.as_ref(), &config).await?;

        let mut workers = Vec::with_capacity(EventKind::ALL.len());
        let lanes = EventKind::ALL.map(|kind| {
            let (tx, rx) = mpsc::channel(config.lane_capacity);
            let ctx = LaneContext {
                kind,
                channel: bindings.channel(kind).clone(),
                converter: converter.clone(),
                metrics: self.metrics.clone(),
                dlq: self.dlq.clone(),
            };
            workers.push(tokio::spawn(
                run_lane(ctx, rx).instrument(tracing::debug_span!(
                    parent: &self.span,
                    "lane",
                    kind = %kind
                )),
            ));
            tx
        });

        Ok(Running {
            lanes,
            workers,
            bindings,
            filters,
        })
    }

    fn read_inner(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| OutboundError::Lane(format!("Processor state lock poisoned: {}", e)))
    }

    fn write_inner(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| OutboundError::Lane(format!("Processor state lock poisoned: {}", e)))
    }
}

fn transition_error(state: LifecycleState) -> OutboundError {
    OutboundError::InvalidState {
        state: state.to_string(),
        kind: None,
        event_id: None,
    }
}

/// Drain one kind's queue until every sender is gone
async fn run_lane(ctx: LaneContext, mut rx: mpsc::Receiver<LaneJob>) {
    while let Some(LaneJob { event, respond }) = rx.recv().await {
        let result = deliver(&ctx, &event).await;

        match &result {
            Ok(()) => {
                ctx.metrics.record_published(ctx.kind);
                tracing::debug!(
                    event_id = %event.id(),
                    kind = %ctx.kind,
                    topic = ctx.channel.topic(),
                    "Event published"
                );
            }
            Err(e) => {
                ctx.metrics.record_failed(ctx.kind);
                tracing::warn!(
                    event_id = %event.id(),
                    kind = %ctx.kind,
                    error = %e,
                    "Event delivery failed"
                );
                if let Some(dlq) = &ctx.dlq {
                    let event_id = event.id().to_string();
                    if let Err(dlq_err) = dlq.handle(DeadLetterEvent::new(event, e.to_string())).await {
                        tracing::error!(
                            event_id = %event_id,
                            kind = %ctx.kind,
                            error = %dlq_err,
                            "Failed to dead-letter event"
                        );
                    }
                }
            }
        }

        // The submitter may have stopped waiting
        let _ = respond.send(result);
    }
    tracing::debug!(kind = %ctx.kind, "Lane drained");
}

/// Convert one event to its snapshot and publish it on the lane's topic
async fn deliver(ctx: &LaneContext, event: &DeviceEvent) -> Result<()> {
    let snapshot = match event {
        DeviceEvent::CommandInvocation(invocation) => {
            EventSnapshot::CommandInvocation(ctx.converter.convert(invocation).await?)
        }
        other => EventSnapshot::copy(other).ok_or_else(|| OutboundError::Conversion {
            event_id: other.id().to_string(),
            reason: format!("no snapshot conversion for {} events", other.kind()),
        })?,
    };

    ctx.channel
        .publish(&snapshot)
        .await
        .map_err(|e| match e {
            OutboundError::Publish { .. } => e,
            other => OutboundError::Publish {
                topic: topic_name(ctx.kind).to_string(),
                event_id: event.id().to_string(),
                reason: other.to_string(),
            },
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandMetadata, MemoryCommandLookup};
    use crate::event::{AlertLevel, EventHeader};
    use crate::filter::FnFilter;
    use crate::provider::memory::MemoryProvider;

    fn processor(provider: Arc<MemoryProvider>) -> DistributionProcessor {
        let lookup = Arc::new(MemoryCommandLookup::new());
        lookup
            .insert("default", CommandMetadata::new("reboot", "http://devices/commands", "reboot"))
            .unwrap();
        DistributionProcessor::builder(provider, lookup)
            .configuration(OutboundConfig::default())
            .build()
    }

    #[tokio::test]
    async fn test_created_state() {
        let p = processor(Arc::new(MemoryProvider::default()));
        assert_eq!(p.state(), LifecycleState::Created);
        assert_eq!(p.name(), "outbound");
    }

    #[tokio::test]
    async fn test_start_without_configuration_errors() {
        let provider = Arc::new(MemoryProvider::default());
        let p = DistributionProcessor::builder(provider.clone(), Arc::new(MemoryCommandLookup::new()))
            .build();

        let err = p.start().await.unwrap_err();
        assert!(matches!(err, OutboundError::Configuration(_)));
        assert_eq!(p.state(), LifecycleState::Errored);
        assert!(provider.resolve_log().is_empty());

        p.set_configuration(OutboundConfig::default()).unwrap();
        p.start().await.unwrap();
        assert_eq!(p.state(), LifecycleState::Started);
        p.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_configuration_errors() {
        let p = processor(Arc::new(MemoryProvider::default()));
        p.set_configuration(OutboundConfig::for_tenant("")).unwrap();
        assert!(matches!(p.start().await, Err(OutboundError::Configuration(_))));
        assert_eq!(p.state(), LifecycleState::Errored);
    }

    #[tokio::test]
    async fn test_double_start_rejected() {
        let p = processor(Arc::new(MemoryProvider::default()));
        p.start().await.unwrap();
        assert!(matches!(
            p.start().await,
            Err(OutboundError::InvalidState { .. })
        ));
        assert_eq!(p.state(), LifecycleState::Started);
        p.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let p = processor(Arc::new(MemoryProvider::default()));
        p.stop().await.unwrap();
        assert_eq!(p.state(), LifecycleState::Created);

        p.start().await.unwrap();
        p.stop().await.unwrap();
        p.stop().await.unwrap();
        assert_eq!(p.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let provider = Arc::new(MemoryProvider::default());
        let p = processor(provider.clone());
        p.start().await.unwrap();
        p.restart().await.unwrap();
        assert_eq!(p.state(), LifecycleState::Started);

        let event = DeviceMeasurements::new(EventHeader::new("m-1", "assign-1"));
        assert_eq!(p.on_measurements(event).await.unwrap(), Outcome::Published);
        assert_eq!(provider.resolve_log().len(), 10);
        p.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_handler_before_start_is_refused() {
        let provider = Arc::new(MemoryProvider::default());
        let p = processor(provider.clone());
        let event = DeviceLocation::new(EventHeader::new("l-1", "assign-1"), 1.0, 2.0, 3.0);

        let err = p.on_location(event).await.unwrap_err();
        match err {
            OutboundError::InvalidState { state, kind, event_id } => {
                assert_eq!(state, "Created");
                assert_eq!(kind.as_deref(), Some("location"));
                assert_eq!(event_id.as_deref(), Some("l-1"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(p.metrics().snapshot().rejected, 1);
    }

    #[tokio::test]
    async fn test_filtered_event_is_not_published() {
        let provider = Arc::new(MemoryProvider::default());
        let p = DistributionProcessor::builder(provider.clone(), Arc::new(MemoryCommandLookup::new()))
            .configuration(OutboundConfig::default())
            .filter(
                EventKind::Alert,
                FnFilter::new("no-debug", |e| match e {
                    DeviceEvent::Alert(a) => a.level != AlertLevel::Debug,
                    _ => true,
                }),
            )
            .build();
        p.start().await.unwrap();

        let alert = DeviceAlert::new(EventHeader::new("a-1", "assign-1"), "t", AlertLevel::Debug, "m");
        let delivery = p.submit(alert.into()).await.unwrap();
        assert_eq!(delivery.event_id(), "a-1");
        assert_eq!(delivery.wait().await.unwrap(), Outcome::Filtered);
        assert!(provider.published("alert-added").is_empty());
        assert_eq!(p.metrics().snapshot().kind(EventKind::Alert).filtered, 1);

        p.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_filters_added_after_start_apply_on_next_start() {
        let provider = Arc::new(MemoryProvider::default());
        let p = processor(provider.clone());
        p.start().await.unwrap();

        p.add_filter(EventKind::CommandResponse, Arc::new(FnFilter::new("none", |_| false)))
            .unwrap();
        let response = DeviceCommandResponse::new(EventHeader::new("r-1", "assign-1"), "c-1", "ok");
        assert_eq!(
            p.on_command_response(response.clone()).await.unwrap(),
            Outcome::Published
        );

        p.restart().await.unwrap();
        assert_eq!(
            p.on_command_response(response).await.unwrap(),
            Outcome::Filtered
        );
        p.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_publish_error_keeps_processor_started() {
        let provider = Arc::new(MemoryProvider::default());
        let p = processor(provider.clone());
        p.start().await.unwrap();
        provider.fail_publish("command-response-added", true);

        let response = DeviceCommandResponse::new(EventHeader::new("r-1", "assign-1"), "c-1", "ok");
        let err = p.on_command_response(response).await.unwrap_err();
        assert!(matches!(err, OutboundError::Publish { .. }));
        assert_eq!(p.state(), LifecycleState::Started);

        provider.fail_publish("command-response-added", false);
        let response = DeviceCommandResponse::new(EventHeader::new("r-2", "assign-1"), "c-1", "ok");
        assert_eq!(p.on_command_response(response).await.unwrap(), Outcome::Published);

        let snap = p.metrics().snapshot();
        assert_eq!(snap.kind(EventKind::CommandResponse).failed, 1);
        assert_eq!(snap.kind(EventKind::CommandResponse).published, 1);
        p.stop().await.unwrap();
    }

    struct PanickingChannel(String);

    #[async_trait::async_trait]
    impl crate::provider::TopicChannel for PanickingChannel {
        fn topic(&self) -> &str {
            &self.0
        }

        async fn publish(&self, _snapshot: &EventSnapshot) -> Result<()> {
            panic!("transport bug")
        }
    }

    struct PanickingProvider;

    #[async_trait::async_trait]
    impl TopicProvider for PanickingProvider {
        async fn resolve_topic(&self, name: &str, _config: &OutboundConfig) -> Result<ChannelHandle> {
            let channel: ChannelHandle = Arc::new(PanickingChannel(name.to_string()));
            Ok(channel)
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    #[tokio::test]
    async fn test_dead_lane_reports_event_id_and_kind() {
        let p = DistributionProcessor::builder(
            Arc::new(PanickingProvider),
            Arc::new(MemoryCommandLookup::new()),
        )
        .configuration(OutboundConfig::default())
        .build();
        p.start().await.unwrap();

        let first = DeviceLocation::new(EventHeader::new("l-1", "assign-1"), 1.0, 2.0, 3.0);
        match p.on_location(first).await.unwrap_err() {
            OutboundError::Lane(msg) => {
                assert!(msg.contains("location"), "{}", msg);
                assert!(msg.contains("l-1"), "{}", msg);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let second = DeviceLocation::new(EventHeader::new("l-2", "assign-1"), 1.0, 2.0, 3.0);
        match p.on_location(second).await.unwrap_err() {
            OutboundError::Lane(msg) => {
                assert!(msg.contains("location"), "{}", msg);
                assert!(msg.contains("l-2"), "{}", msg);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        assert_eq!(p.state(), LifecycleState::Started);
        p.stop().await.unwrap();
        assert_eq!(p.state(), LifecycleState::Stopped);
    }
}
