//! Report processing library for resource optimization uploads
//!
//! This crate provides the core functionality for:
//! - Validating upload events into a request context
//! - Loading usage report tables and grouping them by deployment
//! - Driving the create / update / list recommendation call sequence
//! - Consuming events from Kafka or a JSON-lines replay file
//! - Health checks and observability

pub mod consumer;
pub mod context;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod payload;
pub mod report;
pub mod service;
pub mod source;

pub use consumer::{ConsumerConfig, ConsumerLoop, ConsumerStats};
pub use context::build_request_context;
pub use error::{ProcessorError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ProcessorMetrics, StructuredLogger};
pub use orchestrator::{EventOutcome, PipelineConfig, ReportOutcome, ReportPhase, ReportProcessor};
pub use report::{CsvReportLoader, ReportLoader, ReportTable};
pub use service::{KruizeClient, KruizeClientConfig, RecommendationService};
pub use source::{EventSource, JsonLinesSource, SourceMessage};
