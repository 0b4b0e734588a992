//! Upload event consumer loop
//!
//! Pulls messages from an [`EventSource`], validates them into a
//! [`RequestContext`] and hands their report files to the
//! [`ReportProcessor`]. A bad message is dropped and logged; it never stops
//! the loop.

use crate::context::build_request_context;
use crate::error::{ProcessorError, Result};
use crate::health::{components, HealthRegistry};
use crate::models::InboundEvent;
use crate::observability::{ProcessorMetrics, StructuredLogger};
use crate::orchestrator::{EventOutcome, ReportProcessor};
use crate::source::{EventSource, SourceMessage};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Pause after a failed poll before trying again
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// When false, every handled message is committed explicitly
    pub auto_commit: bool,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self { auto_commit: false }
    }
}

/// Counters for one run of the loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub received: u64,
    pub processed: u64,
    pub dropped: u64,
    pub committed: u64,
}

pub struct ConsumerLoop<S> {
    source: S,
    processor: ReportProcessor,
    config: ConsumerConfig,
    metrics: ProcessorMetrics,
    logger: StructuredLogger,
    health: Option<HealthRegistry>,
    stats: ConsumerStats,
}

impl<S: EventSource> ConsumerLoop<S> {
    pub fn new(source: S, processor: ReportProcessor, config: ConsumerConfig) -> Self {
        Self {
            source,
            processor,
            config,
            metrics: ProcessorMetrics::new(),
            logger: StructuredLogger::new("rosocp-processor"),
            health: None,
            stats: ConsumerStats::default(),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    /// Run until shutdown is signalled or the source is exhausted
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> ConsumerStats {
        info!(auto_commit = self.config.auto_commit, "Starting upload event consumer");
        if let Some(health) = &self.health {
            health.register(components::CONSUMER).await;
            health.set_ready(true).await;
        }

        loop {
            let polled = tokio::select! {
                _ = shutdown.recv() => {
                    self.logger.log_shutdown("shutdown signal received");
                    break;
                }
                polled = self.source.poll() => polled,
            };

            match polled {
                Ok(Some(message)) => {
                    self.handle(&message).await;
                    self.acknowledge(&message).await;
                }
                Ok(None) if self.source.is_exhausted() => {
                    self.logger.log_shutdown("event source exhausted");
                    break;
                }
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "Failed to poll event source");
                    if let Some(health) = &self.health {
                        health.record_failure(components::CONSUMER, e.to_string()).await;
                    }
                    tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                }
            }
        }

        if let Some(health) = &self.health {
            health.set_ready(false).await;
        }
        info!(
            received = self.stats.received,
            processed = self.stats.processed,
            dropped = self.stats.dropped,
            committed = self.stats.committed,
            "Consumer stopped"
        );
        self.stats
    }

    async fn handle(&mut self, message: &SourceMessage) {
        self.stats.received += 1;
        self.metrics.inc_events_received();
        let started = Instant::now();

        match process_payload(&self.processor, &message.payload).await {
            Ok(outcome) => {
                self.stats.processed += 1;
                debug!(
                    request_id = %outcome.request_id,
                    reports = outcome.reports.len(),
                    "Event handled"
                );
            }
            Err(e @ ProcessorError::MalformedEvent { .. })
            | Err(e @ ProcessorError::EventDecode(_)) => {
                self.stats.dropped += 1;
                self.metrics.inc_events_malformed();
                self.logger.log_event_dropped(&e.to_string());
            }
            Err(e) => {
                self.stats.dropped += 1;
                error!(error = %e, offset = message.offset, "Unknown error while handling event");
            }
        }

        self.metrics
            .observe_event_processing(started.elapsed().as_secs_f64());
        if let Some(health) = &self.health {
            health.record_success(components::CONSUMER).await;
        }
    }

    async fn acknowledge(&mut self, message: &SourceMessage) {
        if self.config.auto_commit {
            return;
        }
        match self.source.commit(message).await {
            Ok(()) => self.stats.committed += 1,
            Err(e) => warn!(
                error = %e,
                partition = message.partition,
                offset = message.offset,
                "Failed to commit message"
            ),
        }
    }
}

/// Decode, validate and process one payload
async fn process_payload(processor: &ReportProcessor, payload: &[u8]) -> Result<EventOutcome> {
    let event = InboundEvent::from_slice(payload)?;
    let context = build_request_context(&event)?;
    Ok(processor.process_event(&context, &event.files).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::PipelineConfig;
    use crate::payload::{CreateExperimentPayload, ListParams, UpdateResultsPayload};
    use crate::report::{ReportLoader, ReportTable};
    use crate::service::{RecommendationService, ServiceResponse};
    use crate::source::JsonLinesSource;
    use async_trait::async_trait;
    use std::io::Cursor;
    use std::sync::Arc;

    struct EmptyLoader;

    #[async_trait]
    impl ReportLoader for EmptyLoader {
        async fn load(&self, _reference: &str) -> Result<ReportTable> {
            Ok(ReportTable::default())
        }
    }

    struct AcceptingService;

    impl AcceptingService {
        fn ok(&self) -> Result<ServiceResponse> {
            Ok(ServiceResponse {
                status: 201,
                body: String::new(),
            })
        }
    }

    #[async_trait]
    impl RecommendationService for AcceptingService {
        async fn create_experiment(&self, _: &CreateExperimentPayload) -> Result<ServiceResponse> {
            self.ok()
        }
        async fn update_results(&self, _: &UpdateResultsPayload) -> Result<ServiceResponse> {
            self.ok()
        }
        async fn list_recommendations(&self, _: &ListParams) -> Result<ServiceResponse> {
            self.ok()
        }
    }

    const VALID: &str = concat!(
        r#"{"request_id":"r1","b64_identity":"e30=","#,
        r#""metadata":{"org_id":"o1","account":"a1","cluster_id":"c1"},"files":["f1"]}"#
    );
    const MISSING_CLUSTER: &str =
        r#"{"request_id":"r2","metadata":{"org_id":"o1"},"files":["f1"]}"#;

    fn consumer(
        input: String,
        config: ConsumerConfig,
    ) -> ConsumerLoop<JsonLinesSource<Cursor<Vec<u8>>>> {
        let processor = ReportProcessor::new(
            Arc::new(EmptyLoader),
            Arc::new(AcceptingService),
            PipelineConfig::default(),
        );
        ConsumerLoop::new(JsonLinesSource::new(Cursor::new(input.into_bytes())), processor, config)
    }

    #[tokio::test]
    async fn test_malformed_events_are_dropped_and_committed() {
        let input = format!("{}\nnot json\n{}\n", VALID, MISSING_CLUSTER);
        let (_tx, rx) = broadcast::channel(1);

        let stats = consumer(input, ConsumerConfig::default()).run(rx).await;

        assert_eq!(stats.received, 3);
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.committed, 3);
    }

    #[tokio::test]
    async fn test_auto_commit_skips_explicit_commit() {
        let (_tx, rx) = broadcast::channel(1);

        let stats = consumer(VALID.to_string(), ConsumerConfig { auto_commit: true })
            .run(rx)
            .await;

        assert_eq!(stats.processed, 1);
        assert_eq!(stats.committed, 0);
    }

    #[tokio::test]
    async fn test_health_reports_consumer_stopped() {
        let (_tx, rx) = broadcast::channel(1);
        let health = HealthRegistry::new();

        consumer(VALID.to_string(), ConsumerConfig::default())
            .with_health(health.clone())
            .run(rx)
            .await;

        let status = health.health().await;
        assert!(status.components.contains_key(components::CONSUMER));
        assert!(!health.readiness().await.ready);
    }

    /// Never yields a message and never runs dry
    struct IdleSource;

    #[async_trait]
    impl EventSource for IdleSource {
        async fn poll(&mut self) -> Result<Option<SourceMessage>> {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(None)
        }

        async fn commit(&mut self, _message: &SourceMessage) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_loop() {
        let processor = ReportProcessor::new(
            Arc::new(EmptyLoader),
            Arc::new(AcceptingService),
            PipelineConfig::default(),
        );
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(
            ConsumerLoop::new(IdleSource, processor, ConsumerConfig::default()).run(rx),
        );

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(()).unwrap();

        let stats = handle.await.unwrap();
        assert_eq!(stats, ConsumerStats::default());
    }
}
