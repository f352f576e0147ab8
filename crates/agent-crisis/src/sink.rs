//! Event sinks: best-effort delivery of published events
//!
//! `publish` never fails and never blocks for longer than a sink's bounded
//! delivery window. Whatever happens downstream (no listener, dead endpoint,
//! slow subscriber) is visible only in the logs. No stage result depends on a
//! sink.
//!
//! Sinks that deliver in the background expose [`EventSink::flush`], which
//! waits a bounded time for in-flight deliveries. Call it before shutting the
//! runtime down.

use crate::error::{CrisisError, Result};
use crate::event::PublishedEvent;
use crate::topic::{Stage, TopicPattern};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

/// Fire-and-forget receiver of published events
#[async_trait]
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &PublishedEvent);

    /// Wait, for a bounded time, until background deliveries have finished
    async fn flush(&self) {}

    fn name(&self) -> &str {
        "sink"
    }
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn publish(&self, _event: &PublishedEvent) {}

    fn name(&self) -> &str {
        "noop"
    }
}

/// Sink that records events in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<PublishedEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far
    pub fn events(&self) -> Vec<PublishedEvent> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<PublishedEvent>> {
        self.events.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl EventSink for MemorySink {
    fn publish(&self, event: &PublishedEvent) {
        self.lock().push(event.clone());
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Forwards only events whose topic matches a pattern
pub struct FilteredSink {
    pattern: TopicPattern,
    inner: Arc<dyn EventSink>,
}

impl FilteredSink {
    pub fn new(pattern: TopicPattern, inner: Arc<dyn EventSink>) -> Self {
        Self { pattern, inner }
    }
}

#[async_trait]
impl EventSink for FilteredSink {
    fn publish(&self, event: &PublishedEvent) {
        if self.pattern.matches(&event.topic) {
            self.inner.publish(event);
        }
    }

    async fn flush(&self) {
        self.inner.flush().await;
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Forwards every event to each inner sink in turn
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl EventSink for FanoutSink {
    fn publish(&self, event: &PublishedEvent) {
        for sink in &self.sinks {
            sink.publish(event);
        }
    }

    async fn flush(&self) {
        futures::future::join_all(self.sinks.iter().map(|sink| sink.flush())).await;
    }

    fn name(&self) -> &str {
        "fanout"
    }
}

/// In-process topic bus with wildcard subscriptions
///
/// Backed by a bounded broadcast channel: publishing with no subscribers is a
/// no-op, and a subscriber that falls behind loses the oldest events rather
/// than slowing the publisher down.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<PublishedEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to events whose topic matches `pattern`
    pub fn subscribe(&self, pattern: TopicPattern) -> Subscription {
        Subscription {
            pattern,
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: &PublishedEvent) {
        if self.tx.send(event.clone()).is_err() {
            tracing::trace!("No subscribers for {}", event.topic);
        }
    }

    fn name(&self) -> &str {
        "broadcast"
    }
}

/// Receiving end of a [`BroadcastSink`] subscription
pub struct Subscription {
    pattern: TopicPattern,
    rx: broadcast::Receiver<PublishedEvent>,
}

impl Subscription {
    pub fn pattern(&self) -> &TopicPattern {
        &self.pattern
    }

    /// Next matching event; `None` once the bus is gone
    pub async fn recv(&mut self) -> Option<PublishedEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.pattern.matches(&event.topic) => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Subscriber on {} lagged, skipped {} events", self.pattern, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event already queued, without waiting
    pub fn try_recv(&mut self) -> Option<PublishedEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if self.pattern.matches(&event.topic) => return Some(event),
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => return None,
            }
        }
    }
}

/// Envelope posted to the visualization endpoint
#[derive(Debug, Clone, Serialize)]
pub struct VisualizationEvent {
    pub id: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub from: String,
    pub to: Option<String>,
    pub data: Value,
    pub color: String,
}

impl VisualizationEvent {
    pub fn from_event(event: &PublishedEvent) -> Self {
        Self {
            id: format!("event-{}", uuid::Uuid::new_v4()),
            timestamp: chrono::Utc::now().timestamp_millis(),
            event_type: format!("crisis_{}", event.stage),
            from: event.stage.agent_name().to_string(),
            to: event.stage.next().map(|s| s.agent_name().to_string()),
            data: json!({
                "topic": event.topic,
                "stage": event.stage,
                "payload": event.payload_json(),
            }),
            color: stage_color(event.stage).to_string(),
        }
    }
}

fn stage_color(stage: Stage) -> &'static str {
    match stage {
        Stage::Raw => "#ffaa00",
        Stage::Verified => "#00aaff",
        Stage::Actionable => "#00cc66",
        Stage::Updates => "#aa66ff",
    }
}

/// Posts events to `<api_base>/events/broadcast` without waiting for the result
///
/// Each publish spawns a request on the current Tokio runtime with a short
/// timeout. Outside a runtime the event is dropped. Requests still running
/// when [`flush`](EventSink::flush) gives up are aborted.
#[derive(Debug, Clone)]
pub struct HttpEventSink {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    in_flight: Arc<Mutex<JoinSet<()>>>,
}

impl HttpEventSink {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() || timeout >= Duration::from_secs(1) {
            return Err(CrisisError::ConfigError(format!(
                "sink timeout must be between 0 and 1s, got {timeout:?}"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| CrisisError::ConfigError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/events/broadcast", api_base.trim_end_matches('/')),
            timeout,
            in_flight: Arc::new(Mutex::new(JoinSet::new())),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Deliveries spawned and not yet reaped
    pub fn in_flight(&self) -> usize {
        let mut tasks = self.tasks();
        while tasks.try_join_next().is_some() {}
        tasks.len()
    }

    fn tasks(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        self.in_flight.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    fn publish(&self, event: &PublishedEvent) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No async runtime, dropping event for {}", event.topic);
            return;
        };

        let envelope = VisualizationEvent::from_event(event);
        let request = self.client.post(&self.endpoint).json(&envelope);
        let topic = event.topic.to_string();

        let mut tasks = self.tasks();
        while tasks.try_join_next().is_some() {}
        tasks.spawn_on(async move {
            match request.send().await {
                Ok(response) if !response.status().is_success() => {
                    tracing::debug!(
                        "Event broadcast for {} rejected (non-critical): {}",
                        topic,
                        response.status()
                    );
                }
                Ok(_) => tracing::trace!("Broadcast {}", topic),
                Err(e) => tracing::debug!("Event emission failed for {} (non-critical): {}", topic, e),
            }
        }, &handle);
    }

    async fn flush(&self) {
        let mut pending = std::mem::take(&mut *self.tasks());
        if pending.is_empty() {
            return;
        }

        let drained = tokio::time::timeout(self.timeout, async {
            while pending.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::debug!(
                "Abandoning {} event deliveries after {:?}",
                pending.len(),
                self.timeout
            );
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CrisisUpdate, RawCrisis, decode_record};
    use serde_json::json;
    use std::time::Instant;

    fn raw_event(id: &str, source: &str) -> PublishedEvent {
        let raw: RawCrisis = decode_record(json!({"crisis_id": id, "source": source})).unwrap();
        PublishedEvent::detection(&raw)
    }

    fn update_event(id: &str, seq: u64) -> PublishedEvent {
        let update: CrisisUpdate =
            decode_record(json!({"crisis_id": id, "update_sequence": seq})).unwrap();
        PublishedEvent::update(&update)
    }

    #[test]
    fn test_memory_sink_records() {
        let sink = MemorySink::new();
        sink.publish(&raw_event("C1", "gdacs"));
        sink.publish(&update_event("C9", 1));
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.events()[1].topic.to_string(), "crisis/updates/C9");

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_filtered_sink() {
        let memory = Arc::new(MemorySink::new());
        let sink = FilteredSink::new(TopicPattern::parse("crisis/raw/usgs/*").unwrap(), memory.clone());

        sink.publish(&raw_event("C1", "gdacs"));
        sink.publish(&raw_event("C2", "usgs"));
        sink.publish(&update_event("C2", 1));

        let events = memory.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].crisis_id(), "C2");
    }

    #[test]
    fn test_fanout_sink() {
        let a = Arc::new(MemorySink::new());
        let b = Arc::new(MemorySink::new());
        let sink = FanoutSink::new().with(a.clone()).with(b.clone()).with(Arc::new(NoopSink));
        assert_eq!(sink.len(), 3);

        sink.publish(&raw_event("C1", "gdacs"));
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_subscription_filters_by_pattern() {
        let bus = BroadcastSink::new(16);
        let mut updates = bus.subscribe(TopicPattern::parse("crisis/updates/*").unwrap());
        let mut everything = bus.subscribe(TopicPattern::all());
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(&raw_event("C1", "gdacs"));
        bus.publish(&update_event("C9", 1));

        let got = updates.recv().await.unwrap();
        assert_eq!(got.topic.to_string(), "crisis/updates/C9");
        assert!(updates.try_recv().is_none());

        assert_eq!(everything.recv().await.unwrap().crisis_id(), "C1");
        assert_eq!(everything.recv().await.unwrap().crisis_id(), "C9");
    }

    #[test]
    fn test_broadcast_without_subscribers_is_noop() {
        let bus = BroadcastSink::new(4);
        bus.publish(&raw_event("C1", "gdacs"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_visualization_envelope() {
        let envelope = VisualizationEvent::from_event(&raw_event("C2", "usgs"));
        assert_eq!(envelope.event_type, "crisis_raw");
        assert_eq!(envelope.from, "CrisisDetector");
        assert_eq!(envelope.to.as_deref(), Some("VerificationScorer"));
        assert!(envelope.id.starts_with("event-"));

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["type"], "crisis_raw");
        assert_eq!(value["data"]["topic"], "crisis/raw/usgs/C2");
        assert_eq!(value["data"]["payload"]["source"], "usgs");

        let last = VisualizationEvent::from_event(&update_event("C9", 1));
        assert!(last.to.is_none());
    }

    #[test]
    fn test_http_sink_rejects_unbounded_timeout() {
        assert!(HttpEventSink::new("http://localhost:3000/api", Duration::from_secs(2)).is_err());
        assert!(HttpEventSink::new("http://localhost:3000/api", Duration::ZERO).is_err());

        let sink = HttpEventSink::new("http://localhost:3000/api/", Duration::from_millis(100)).unwrap();
        assert_eq!(sink.endpoint(), "http://localhost:3000/api/events/broadcast");
    }

    #[tokio::test]
    async fn test_http_sink_never_blocks_or_fails() {
        // Port 9 (discard) is closed on test machines; delivery fails in the background.
        let sink = HttpEventSink::new("http://127.0.0.1:9/api", Duration::from_millis(50)).unwrap();

        let started = Instant::now();
        for i in 0..20 {
            sink.publish(&raw_event(&format!("C{i}"), "usgs"));
        }
        assert!(started.elapsed() < Duration::from_millis(500));

        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn test_flush_waits_for_delivery() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(AtomicUsize::new(0));

        let counter = received.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let counter = counter.clone();
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 16 * 1024];
                    if matches!(socket.read(&mut buf).await, Ok(n) if n > 0) {
                        counter.fetch_add(1, Ordering::SeqCst);
                        let _ = socket
                            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                            .await;
                    }
                });
            }
        });

        let sink = HttpEventSink::new(&format!("http://{addr}/api"), Duration::from_millis(500)).unwrap();
        for i in 0..3 {
            sink.publish(&raw_event(&format!("C{i}"), "usgs"));
        }
        sink.flush().await;

        assert_eq!(received.load(Ordering::SeqCst), 3);
        assert_eq!(sink.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_flush_is_bounded_by_timeout() {
        let sink = HttpEventSink::new("http://127.0.0.1:9/api", Duration::from_millis(50)).unwrap();
        for i in 0..5 {
            sink.publish(&raw_event(&format!("C{i}"), "usgs"));
        }

        let started = Instant::now();
        sink.flush().await;
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(sink.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_fanout_flush_reaches_inner_sinks() {
        let http = Arc::new(HttpEventSink::new("http://127.0.0.1:9/api", Duration::from_millis(50)).unwrap());
        let sink = FanoutSink::new()
            .with(Arc::new(MemorySink::new()))
            .with(Arc::new(FilteredSink::new(TopicPattern::all(), http.clone())));

        sink.publish(&raw_event("C1", "gdacs"));
        sink.flush().await;
        assert_eq!(http.in_flight(), 0);
    }

    #[test]
    fn test_http_sink_outside_runtime_drops_silently() {
        let sink = HttpEventSink::new("http://127.0.0.1:9/api", Duration::from_millis(50)).unwrap();
        sink.publish(&raw_event("C1", "gdacs"));
    }
}
