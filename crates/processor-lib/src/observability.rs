//! Observability infrastructure for the report processor
//!
//! Provides:
//! - Prometheus metrics (events, report files, service calls and their latency)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    Histogram, HistogramVec, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

use crate::service::Operation;

/// Buckets for service call and event latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ProcessorMetricsInner> = OnceLock::new();

struct ProcessorMetricsInner {
    events_received: IntCounter,
    events_malformed: IntCounter,
    event_processing_seconds: Histogram,
    reports_processed: IntCounter,
    report_load_errors: IntCounter,
    service_calls: IntCounterVec,
    service_call_latency_seconds: HistogramVec,
}

impl ProcessorMetricsInner {
    fn new() -> Self {
        Self {
            events_received: register_int_counter!(
                "rosocp_events_received_total",
                "Total number of upload events received"
            )
            .expect("Failed to register events_received"),

            events_malformed: register_int_counter!(
                "rosocp_events_malformed_total",
                "Total number of upload events dropped as malformed"
            )
            .expect("Failed to register events_malformed"),

            event_processing_seconds: register_histogram!(
                "rosocp_event_processing_seconds",
                "Time spent processing one upload event end to end",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register event_processing_seconds"),

            reports_processed: register_int_counter!(
                "rosocp_reports_processed_total",
                "Total number of report files processed"
            )
            .expect("Failed to register reports_processed"),

            report_load_errors: register_int_counter!(
                "rosocp_report_load_errors_total",
                "Total number of report files that failed to load"
            )
            .expect("Failed to register report_load_errors"),

            service_calls: register_int_counter_vec!(
                "rosocp_service_calls_total",
                "Recommendation service calls by operation and outcome",
                &["operation", "outcome"]
            )
            .expect("Failed to register service_calls"),

            service_call_latency_seconds: register_histogram_vec!(
                "rosocp_service_call_latency_seconds",
                "Latency of recommendation service calls",
                &["operation"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register service_call_latency_seconds"),
        }
    }
}

/// Outcome label for a service call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Rejected,
    TransportError,
}

impl CallOutcome {
    fn as_str(self) -> &'static str {
        match self {
            CallOutcome::Success => "success",
            CallOutcome::Rejected => "rejected",
            CallOutcome::TransportError => "transport_error",
        }
    }
}

/// Processor metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ProcessorMetrics {
    _private: (),
}

impl Default for ProcessorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ProcessorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ProcessorMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn inc_events_received(&self) {
        self.inner().events_received.inc();
    }

    pub fn inc_events_malformed(&self) {
        self.inner().events_malformed.inc();
    }

    pub fn observe_event_processing(&self, duration_secs: f64) {
        self.inner().event_processing_seconds.observe(duration_secs);
    }

    pub fn inc_reports_processed(&self) {
        self.inner().reports_processed.inc();
    }

    pub fn inc_report_load_errors(&self) {
        self.inner().report_load_errors.inc();
    }

    /// Record one service call with its outcome and latency
    pub fn record_service_call(
        &self,
        operation: Operation,
        outcome: CallOutcome,
        duration_secs: f64,
    ) {
        let inner = self.inner();
        inner
            .service_calls
            .with_label_values(&[operation.path(), outcome.as_str()])
            .inc();
        inner
            .service_call_latency_seconds
            .with_label_values(&[operation.path()])
            .observe(duration_secs);
    }
}

/// Structured logger for processor events
///
/// Provides consistent JSON-formatted log records for the consumer
/// lifecycle, dropped events and recommendation service traffic.
#[derive(Clone)]
pub struct StructuredLogger {
    service_name: String,
}

impl StructuredLogger {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Log processor startup
    pub fn log_startup(&self, version: &str, topic: &str) {
        info!(
            event = "processor_started",
            service = %self.service_name,
            version = %version,
            topic = %topic,
            "Started listening for upload events"
        );
    }

    /// Log processor shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "processor_shutdown",
            service = %self.service_name,
            reason = %reason,
            "Report processor shutting down"
        );
    }

    /// Log an event that was dropped without processing
    pub fn log_event_dropped(&self, reason: &str) {
        error!(
            event = "event_dropped",
            service = %self.service_name,
            reason = %reason,
            "Incorrect event received on upload topic"
        );
    }

    /// Log a recommendation service response
    pub fn log_service_response(
        &self,
        operation: Operation,
        experiment_name: &str,
        status: u16,
        body: &str,
    ) {
        if (200..300).contains(&status) {
            info!(
                event = "service_response",
                service = %self.service_name,
                operation = %operation,
                experiment_name = %experiment_name,
                status = status,
                body = %body,
                "Recommendation service call succeeded"
            );
        } else {
            warn!(
                event = "service_response",
                service = %self.service_name,
                operation = %operation,
                experiment_name = %experiment_name,
                status = status,
                body = %body,
                "Recommendation service rejected call"
            );
        }
    }

    /// Log a transport failure talking to the recommendation service
    pub fn log_service_failure(&self, operation: Operation, experiment_name: &str, error: &str) {
        warn!(
            event = "service_call_failed",
            service = %self.service_name,
            operation = %operation,
            experiment_name = %experiment_name,
            error = %error,
            "Recommendation service call failed"
        );
    }

    /// Log the outcome of one report file
    pub fn log_report_completed(
        &self,
        reference: &str,
        deployments: usize,
        failed_calls: usize,
        skipped_updates: usize,
    ) {
        info!(
            event = "report_processed",
            service = %self.service_name,
            reference = %reference,
            deployments = deployments,
            failed_calls = failed_calls,
            skipped_updates = skipped_updates,
            "Processed report file"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processor_metrics_creation() {
        // Metrics live in the global registry; repeated handles share it.
        let metrics = ProcessorMetrics::new();
        let other = ProcessorMetrics::new();

        metrics.inc_events_received();
        metrics.inc_events_malformed();
        metrics.observe_event_processing(0.25);
        other.inc_reports_processed();
        other.inc_report_load_errors();
        metrics.record_service_call(Operation::CreateExperiment, CallOutcome::Success, 0.01);
        metrics.record_service_call(Operation::UpdateResults, CallOutcome::Rejected, 0.02);

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "rosocp_service_calls_total"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("rosocp-processor");
        assert_eq!(logger.service_name, "rosocp-processor");
    }
}
