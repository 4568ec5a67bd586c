//! Per-kind filter chains
//!
//! Every event kind owns an ordered chain of predicates. An event is
//! forwarded only if every filter in its kind's chain accepts it; evaluation
//! stops at the first rejection. An empty chain accepts everything.
//!
//! Filters see the original event through a shared borrow and must not
//! rely on interior mutability of anything reachable from it.

use crate::event::{AlertLevel, DeviceEvent, EventKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// A named predicate over device events
pub trait EventFilter: Send + Sync {
    /// Filter name for diagnostics
    fn name(&self) -> &str;

    /// Return true if the event may be forwarded
    fn accepts(&self, event: &DeviceEvent) -> bool;
}

/// Filter backed by a closure
pub struct FnFilter<F> {
    name: String,
    predicate: F,
}

impl<F> FnFilter<F>
where
    F: Fn(&DeviceEvent) -> bool + Send + Sync,
{
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> EventFilter for FnFilter<F>
where
    F: Fn(&DeviceEvent) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self, event: &DeviceEvent) -> bool {
        (self.predicate)(event)
    }
}

/// Whether a matching filter includes or excludes events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperation {
    /// Only events that match are forwarded
    Include,
    /// Events that match are dropped
    #[default]
    Exclude,
}

/// Filters on the device assignment that produced the event
#[derive(Debug, Clone)]
pub struct AssignmentFilter {
    name: String,
    tokens: HashSet<String>,
    operation: FilterOperation,
}

impl AssignmentFilter {
    pub fn new<I, S>(tokens: I, operation: FilterOperation) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: HashSet<String> = tokens.into_iter().map(Into::into).collect();
        let name = match operation {
            FilterOperation::Include => "assignment-include",
            FilterOperation::Exclude => "assignment-exclude",
        };
        Self {
            name: name.to_string(),
            tokens,
            operation,
        }
    }
}

impl EventFilter for AssignmentFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts(&self, event: &DeviceEvent) -> bool {
        let matched = self
            .tokens
            .contains(&event.header().device_assignment_token);
        match self.operation {
            FilterOperation::Include => matched,
            FilterOperation::Exclude => !matched,
        }
    }
}

/// Drops alerts below a minimum level; other kinds pass
#[derive(Debug, Clone)]
pub struct AlertLevelFilter {
    minimum: AlertLevel,
}

impl AlertLevelFilter {
    pub fn new(minimum: AlertLevel) -> Self {
        Self { minimum }
    }
}

impl EventFilter for AlertLevelFilter {
    fn name(&self) -> &str {
        "alert-level"
    }

    fn accepts(&self, event: &DeviceEvent) -> bool {
        match event {
            DeviceEvent::Alert(alert) => alert.level >= self.minimum,
            _ => true,
        }
    }
}

/// Declarative filter definition, loaded from configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum FilterConfig {
    /// Include or exclude events from the listed assignments
    #[serde(rename_all = "camelCase")]
    Assignment {
        /// Kinds the filter applies to (all kinds when empty)
        #[serde(default)]
        kinds: Vec<EventKind>,
        tokens: Vec<String>,
        #[serde(default)]
        operation: FilterOperation,
    },
    /// Minimum alert level
    #[serde(rename_all = "camelCase")]
    AlertLevel { minimum: AlertLevel },
}

impl FilterConfig {
    /// Kinds this filter should be attached to
    pub fn kinds(&self) -> Vec<EventKind> {
        match self {
            FilterConfig::Assignment { kinds, .. } if kinds.is_empty() => EventKind::ALL.to_vec(),
            FilterConfig::Assignment { kinds, .. } => kinds.clone(),
            FilterConfig::AlertLevel { .. } => vec![EventKind::Alert],
        }
    }

    /// Instantiate the filter
    pub fn build(&self) -> Arc<dyn EventFilter> {
        match self {
            FilterConfig::Assignment {
                tokens, operation, ..
            } => Arc::new(AssignmentFilter::new(tokens.iter().cloned(), *operation)),
            FilterConfig::AlertLevel { minimum } => Arc::new(AlertLevelFilter::new(*minimum)),
        }
    }
}

/// Five independent filter chains, one per event kind
#[derive(Clone, Default)]
pub struct FilterChain {
    chains: [Vec<Arc<dyn EventFilter>>; 5],
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter to one kind's chain
    pub fn add(&mut self, kind: EventKind, filter: Arc<dyn EventFilter>) {
        self.chains[kind.index()].push(filter);
    }

    /// Builder-style variant of [`add`](Self::add)
    pub fn with(mut self, kind: EventKind, filter: impl EventFilter + 'static) -> Self {
        self.add(kind, Arc::new(filter));
        self
    }

    /// Append every configured filter to the chains it applies to
    pub fn extend_from_config(&mut self, configs: &[FilterConfig]) {
        for config in configs {
            let filter = config.build();
            for kind in config.kinds() {
                self.add(kind, filter.clone());
            }
        }
    }

    /// Filters registered for a kind, in evaluation order
    pub fn filters(&self, kind: EventKind) -> &[Arc<dyn EventFilter>] {
        &self.chains[kind.index()]
    }

    /// Total number of registered filters across all kinds
    pub fn len(&self) -> usize {
        self.chains.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evaluate the event's kind chain (logical AND, short-circuiting)
    pub fn accepts(&self, event: &DeviceEvent) -> bool {
        self.rejected_by(event).is_none()
    }

    /// Name of the first filter that rejects the event, if any
    pub fn rejected_by(&self, event: &DeviceEvent) -> Option<&str> {
        self.chains[event.kind().index()]
            .iter()
            .find(|f| !f.accepts(event))
            .map(|f| f.name())
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for kind in EventKind::ALL {
            let names: Vec<&str> = self.filters(kind).iter().map(|f| f.name()).collect();
            map.entry(&kind.as_str(), &names);
        }
        map.finish()
    }
}
