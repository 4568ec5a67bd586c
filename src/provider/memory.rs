//! In-memory topic provider
//!
//! Topics are `tokio::sync::broadcast` channels that also keep a bounded
//! history of published snapshots. Suitable for tests and single-process
//! deployments. Binding and publish failures can be injected per topic.

use super::{ChannelHandle, TopicChannel, TopicProvider};
use crate::config::OutboundConfig;
use crate::error::{OutboundError, Result};
use crate::snapshot::EventSnapshot;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Configuration for the in-memory provider
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Broadcast channel capacity per topic
    pub channel_capacity: usize,

    /// Maximum snapshots retained per topic (0 = unlimited)
    pub max_history: usize,

    /// Artificial latency added to every publish
    pub publish_delay: Option<Duration>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            max_history: 100_000,
            publish_delay: None,
        }
    }
}

/// One in-memory topic
pub struct MemoryTopic {
    name: String,
    sender: broadcast::Sender<EventSnapshot>,
    history: Mutex<Vec<EventSnapshot>>,
    max_history: usize,
    publish_delay: Option<Duration>,
    fail_publish: AtomicBool,
    in_flight: AtomicUsize,
    publish_count: AtomicU64,
    closed: AtomicBool,
}

impl MemoryTopic {
    fn new(name: &str, config: &MemoryConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            name: name.to_string(),
            sender,
            history: Mutex::new(Vec::new()),
            max_history: config.max_history,
            publish_delay: config.publish_delay,
            fail_publish: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            publish_count: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Snapshots published so far, oldest first
    pub fn history(&self) -> Vec<EventSnapshot> {
        self.history
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    /// Number of publish calls that completed successfully
    pub fn publish_count(&self) -> u64 {
        self.publish_count.load(Ordering::SeqCst)
    }

    /// Number of publish calls currently executing
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Whether the channel was released by its owner
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stream of snapshots published after this call
    pub fn subscribe(&self) -> BroadcastStream<EventSnapshot> {
        BroadcastStream::new(self.sender.subscribe())
    }
}

#[async_trait]
impl TopicChannel for MemoryTopic {
    fn topic(&self) -> &str {
        &self.name
    }

    async fn publish(&self, snapshot: &EventSnapshot) -> Result<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(OutboundError::Publish {
                topic: self.name.clone(),
                event_id: snapshot.id().to_string(),
                reason: "injected publish failure".to_string(),
            });
        }

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.publish_delay {
            tokio::time::sleep(delay).await;
        }

        match self.history.lock() {
            Ok(mut history) => {
                history.push(snapshot.clone());
                if self.max_history > 0 && history.len() > self.max_history {
                    let drain_count = history.len() - self.max_history;
                    history.drain(..drain_count);
                }
            }
            Err(e) => {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                return Err(OutboundError::Publish {
                    topic: self.name.clone(),
                    event_id: snapshot.id().to_string(),
                    reason: format!("history lock poisoned: {}", e),
                });
            }
        }

        // No receivers is not an error for a topic
        let _ = self.sender.send(snapshot.clone());
        self.publish_count.fetch_add(1, Ordering::SeqCst);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory topic provider
///
/// Resolving the same name twice returns the same topic, so tests can
/// inspect what a processor published.
#[derive(Default)]
pub struct MemoryProvider {
    config: MemoryConfig,
    topics: RwLock<HashMap<String, Arc<MemoryTopic>>>,
    failing_bindings: RwLock<HashSet<String>>,
    resolve_log: Mutex<Vec<String>>,
}

impl MemoryProvider {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Make `resolve_topic` fail for a topic name
    pub fn fail_binding(&self, name: &str) {
        if let Ok(mut failing) = self.failing_bindings.write() {
            failing.insert(name.to_string());
        }
    }

    /// Undo [`fail_binding`](Self::fail_binding)
    pub fn restore_binding(&self, name: &str) {
        if let Ok(mut failing) = self.failing_bindings.write() {
            failing.remove(name);
        }
    }

    /// Make every publish on a topic fail (or succeed again)
    pub fn fail_publish(&self, name: &str, fail: bool) {
        self.topic(name).fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Get (creating if needed) the topic for a name
    pub fn topic(&self, name: &str) -> Arc<MemoryTopic> {
        if let Ok(topics) = self.topics.read() {
            if let Some(topic) = topics.get(name) {
                return topic.clone();
            }
        }

        match self.topics.write() {
            Ok(mut topics) => topics
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(MemoryTopic::new(name, &self.config)))
                .clone(),
            Err(_) => Arc::new(MemoryTopic::new(name, &self.config)),
        }
    }

    /// Snapshots published on a topic, oldest first
    pub fn published(&self, name: &str) -> Vec<EventSnapshot> {
        self.topic(name).history()
    }

    /// Topic names passed to `resolve_topic`, in call order
    pub fn resolve_log(&self) -> Vec<String> {
        self.resolve_log
            .lock()
            .map(|l| l.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TopicProvider for MemoryProvider {
    async fn resolve_topic(&self, name: &str, _config: &OutboundConfig) -> Result<ChannelHandle> {
        if let Ok(mut log) = self.resolve_log.lock() {
            log.push(name.to_string());
        }

        let failing = self
            .failing_bindings
            .read()
            .map(|f| f.contains(name))
            .unwrap_or(false);
        if failing {
            return Err(OutboundError::Binding {
                topic: name.to_string(),
                reason: "injected binding failure".to_string(),
            });
        }

        let topic = self.topic(name);
        topic.closed.store(false, Ordering::SeqCst);
        let channel: ChannelHandle = topic;
        Ok(channel)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{DeviceMeasurements, EventHeader};
    use futures::StreamExt;

    fn snapshot(id: &str) -> EventSnapshot {
        EventSnapshot::measurements(&DeviceMeasurements::new(EventHeader::new(id, "assign-1")))
    }

    #[tokio::test]
    async fn test_resolve_returns_shared_topic() {
        let provider = MemoryProvider::default();
        let config = OutboundConfig::default();

        let channel = provider.resolve_topic("measurements-added", &config).await.unwrap();
        channel.publish(&snapshot("m-1")).await.unwrap();

        let published = provider.published("measurements-added");
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].id(), "m-1");
        assert_eq!(provider.resolve_log(), vec!["measurements-added"]);
    }

    #[tokio::test]
    async fn test_injected_binding_failure() {
        let provider = MemoryProvider::default();
        provider.fail_binding("alert-added");

        let result = provider
            .resolve_topic("alert-added", &OutboundConfig::default())
            .await;
        assert!(matches!(result, Err(OutboundError::Binding { .. })));

        provider.restore_binding("alert-added");
        assert!(provider
            .resolve_topic("alert-added", &OutboundConfig::default())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_injected_publish_failure() {
        let provider = MemoryProvider::default();
        let channel = provider
            .resolve_topic("location-added", &OutboundConfig::default())
            .await
            .unwrap();

        provider.fail_publish("location-added", true);
        let err = channel.publish(&snapshot("l-1")).await.unwrap_err();
        assert!(matches!(err, OutboundError::Publish { .. }));
        assert!(provider.published("location-added").is_empty());
    }

    #[tokio::test]
    async fn test_subscriber_receives_snapshots() {
        let provider = MemoryProvider::default();
        let topic = provider.topic("measurements-added");
        let mut stream = topic.subscribe();

        topic.publish(&snapshot("m-7")).await.unwrap();

        let received = stream.next().await.unwrap().unwrap();
        assert_eq!(received.id(), "m-7");
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let provider = MemoryProvider::new(MemoryConfig {
            max_history: 2,
            ..Default::default()
        });
        let topic = provider.topic("measurements-added");
        for i in 0..4 {
            topic.publish(&snapshot(&format!("m-{}", i))).await.unwrap();
        }

        let history = topic.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id(), "m-2");
        assert_eq!(topic.publish_count(), 4);
    }

    #[tokio::test]
    async fn test_close_marks_topic() {
        let provider = MemoryProvider::default();
        let channel = provider
            .resolve_topic("alert-added", &OutboundConfig::default())
            .await
            .unwrap();
        channel.close().await.unwrap();
        assert!(provider.topic("alert-added").is_closed());
    }
}
