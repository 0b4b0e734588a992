//! Report processing pipeline
//!
//! Each report file runs `LoadTable → CreatePhase → UpdatePhase → ListPhase
//! → Done` on its own. Failures are contained at the smallest unit they
//! affect: a file that fails to load skips its remaining phases, a failed
//! call affects only its own deployment.

use crate::error::Result;
use crate::health::{components, HealthRegistry};
use crate::models::{Experiment, RequestContext, TrialInfo};
use crate::observability::{CallOutcome, ProcessorMetrics, StructuredLogger};
use crate::payload::{
    build_create_payload, build_list_params, build_update_payload, ContainerIdentity,
};
use crate::report::{extract, ContainerMetrics, DeploymentUnit, Hierarchy, ReportLoader};
use crate::service::{Operation, RecommendationService, ServiceResponse};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

/// Source of "now" for trial timestamps
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Pipeline settings resolved at startup
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Trial number stamped on every update-results call
    pub trial_number: u32,
    /// Separator between experiment name parts; empty means plain concatenation
    pub experiment_name_separator: String,
    /// Still list recommendations for deployments whose update failed
    pub list_after_failed_update: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            trial_number: 98,
            experiment_name_separator: String::new(),
            list_after_failed_update: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPhase {
    LoadTable,
    CreatePhase,
    UpdatePhase,
    ListPhase,
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallTally {
    pub attempted: usize,
    pub failed: usize,
}

impl CallTally {
    fn record(&mut self, ok: bool) {
        self.attempted += 1;
        if !ok {
            self.failed += 1;
        }
    }
}

/// What happened to one report file
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOutcome {
    pub reference: String,
    /// `Done` on completion, `LoadTable` if the table never loaded
    pub phase: ReportPhase,
    pub load_error: Option<String>,
    pub deployments: usize,
    /// Deployments left out of every phase for an empty container identity
    pub skipped_deployments: usize,
    pub created: CallTally,
    pub updated: CallTally,
    /// Deployments whose update payload could not be built
    pub skipped_updates: usize,
    /// Why each skipped update could not be built
    pub update_errors: Vec<String>,
    pub listed: CallTally,
    pub experiments: Vec<Experiment>,
}

impl ReportOutcome {
    fn new(reference: &str) -> Self {
        Self {
            reference: reference.to_string(),
            phase: ReportPhase::LoadTable,
            load_error: None,
            deployments: 0,
            skipped_deployments: 0,
            created: CallTally::default(),
            updated: CallTally::default(),
            skipped_updates: 0,
            update_errors: Vec::new(),
            listed: CallTally::default(),
            experiments: Vec::new(),
        }
    }

    pub fn failed_calls(&self) -> usize {
        self.created.failed + self.updated.failed + self.listed.failed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventOutcome {
    pub request_id: String,
    pub reports: Vec<ReportOutcome>,
}

/// Drives the three-phase recommendation call sequence for report files
pub struct ReportProcessor {
    loader: Arc<dyn ReportLoader>,
    service: Arc<dyn RecommendationService>,
    config: PipelineConfig,
    clock: Clock,
    metrics: ProcessorMetrics,
    logger: StructuredLogger,
    health: Option<HealthRegistry>,
}

impl ReportProcessor {
    pub fn new(
        loader: Arc<dyn ReportLoader>,
        service: Arc<dyn RecommendationService>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            loader,
            service,
            config,
            clock: Arc::new(Utc::now),
            metrics: ProcessorMetrics::new(),
            logger: StructuredLogger::new("rosocp-processor"),
            health: None,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process every report file of one event, one after another
    pub async fn process_event(&self, context: &RequestContext, files: &[String]) -> EventOutcome {
        let span = info_span!(
            "event",
            request_id = %context.request_id,
            org_id = %context.org_id,
            account = context.account_id.as_deref().unwrap_or("-"),
        );

        async move {
            if files.is_empty() {
                warn!("Event carries no report files");
            }

            let mut reports = Vec::with_capacity(files.len());
            for reference in files {
                reports.push(self.process_report(context, reference).await);
            }

            EventOutcome {
                request_id: context.request_id.clone(),
                reports,
            }
        }
        .instrument(span)
        .await
    }

    /// Run the full phase sequence for a single report file
    pub async fn process_report(&self, context: &RequestContext, reference: &str) -> ReportOutcome {
        let mut outcome = ReportOutcome::new(reference);

        let table = match self.loader.load(reference).await {
            Ok(table) => {
                self.health_success(components::REPORT_LOADER).await;
                table
            }
            Err(e) => {
                warn!(reference = %reference, error = %e, "Unable to load report, skipping file");
                self.metrics.inc_report_load_errors();
                self.health_failure(components::REPORT_LOADER, e.to_string()).await;
                outcome.load_error = Some(e.to_string());
                return outcome;
            }
        };

        let hierarchy = Hierarchy::new(&table);
        let mut units = hierarchy.units();
        outcome.deployments = units.len();
        units.retain(|unit| {
            let missing = unit.rows.iter().find_map(|row| row.missing_container_identity());
            if let Some(column) = missing {
                warn!(
                    reference = %reference,
                    namespace = %unit.namespace,
                    deployment = %unit.deployment,
                    column = column,
                    "Skipping deployment with empty container identity"
                );
                outcome.skipped_deployments += 1;
            }
            missing.is_none()
        });
        info!(
            reference = %reference,
            rows = table.len(),
            deployments = units.len(),
            "Report loaded"
        );

        outcome.phase = ReportPhase::CreatePhase;
        self.create_phase(context, &units, &mut outcome).await;

        outcome.phase = ReportPhase::UpdatePhase;
        let experiments = self.update_phase(context, &units, &mut outcome).await;

        outcome.phase = ReportPhase::ListPhase;
        self.list_phase(&experiments, &mut outcome).await;
        outcome.experiments = experiments;

        outcome.phase = ReportPhase::Done;
        self.metrics.inc_reports_processed();
        self.logger.log_report_completed(
            reference,
            outcome.deployments,
            outcome.failed_calls(),
            outcome.skipped_updates,
        );
        outcome
    }

    async fn create_phase(
        &self,
        context: &RequestContext,
        units: &[DeploymentUnit<'_>],
        outcome: &mut ReportOutcome,
    ) {
        for unit in units {
            let containers = unit.rows.iter().map(|&row| ContainerIdentity::from(row)).collect();
            let payload = build_create_payload(
                unit.namespace,
                unit.deployment,
                containers,
                context,
                &self.config.experiment_name_separator,
            );

            let ok = self
                .dispatch(
                    Operation::CreateExperiment,
                    &payload.experiment_name,
                    self.service.create_experiment(&payload),
                )
                .await;
            outcome.created.record(ok);
        }
    }

    async fn update_phase(
        &self,
        context: &RequestContext,
        units: &[DeploymentUnit<'_>],
        outcome: &mut ReportOutcome,
    ) -> Vec<Experiment> {
        let separator = &self.config.experiment_name_separator;
        let trial = TrialInfo::at(self.config.trial_number, (self.clock)());
        let mut experiments = Vec::with_capacity(units.len());

        for unit in units {
            let experiment = Experiment::new(context, unit.namespace, unit.deployment, separator);

            let metrics = unit
                .rows
                .iter()
                .map(|&row| extract(row))
                .collect::<Result<Vec<ContainerMetrics>>>();

            let ok = match metrics {
                Ok(containers) => {
                    let payload = build_update_payload(
                        unit.namespace,
                        unit.deployment,
                        containers,
                        context,
                        &trial,
                        separator,
                    );
                    let ok = self
                        .dispatch(
                            Operation::UpdateResults,
                            &payload.experiment_name,
                            self.service.update_results(&payload),
                        )
                        .await;
                    outcome.updated.record(ok);
                    ok
                }
                Err(e) => {
                    warn!(
                        experiment_name = %experiment.experiment_name,
                        namespace = %unit.namespace,
                        deployment = %unit.deployment,
                        error = %e,
                        "Skipping update-results for deployment"
                    );
                    outcome.skipped_updates += 1;
                    outcome.update_errors.push(e.to_string());
                    false
                }
            };

            if ok || self.config.list_after_failed_update {
                experiments.push(experiment);
            }
        }

        experiments
    }

    async fn list_phase(&self, experiments: &[Experiment], outcome: &mut ReportOutcome) {
        for experiment in experiments {
            let params = build_list_params(experiment);
            let ok = self
                .dispatch(
                    Operation::ListRecommendations,
                    &experiment.experiment_name,
                    self.service.list_recommendations(&params),
                )
                .await;
            outcome.listed.record(ok);
        }
    }

    /// Await one service call, log and count it. Never propagates failure.
    async fn dispatch<F>(&self, operation: Operation, experiment_name: &str, call: F) -> bool
    where
        F: Future<Output = Result<ServiceResponse>> + Send,
    {
        let started = Instant::now();
        let result = call.await;
        let elapsed = started.elapsed().as_secs_f64();

        match result {
            Ok(response) => {
                self.logger.log_service_response(
                    operation,
                    experiment_name,
                    response.status,
                    &response.body,
                );
                let ok = response.is_success();
                let call_outcome = if ok {
                    CallOutcome::Success
                } else {
                    CallOutcome::Rejected
                };
                self.metrics.record_service_call(operation, call_outcome, elapsed);
                // A rejection still proves the service is reachable
                self.health_success(components::RECOMMENDATION_SERVICE).await;
                ok
            }
            Err(e) => {
                self.logger
                    .log_service_failure(operation, experiment_name, &e.to_string());
                self.metrics
                    .record_service_call(operation, CallOutcome::TransportError, elapsed);
                self.health_failure(components::RECOMMENDATION_SERVICE, e.to_string())
                    .await;
                debug!(operation = %operation, "Continuing after failed call");
                false
            }
        }
    }

    async fn health_success(&self, component: &str) {
        if let Some(health) = &self.health {
            health.record_success(component).await;
        }
    }

    async fn health_failure(&self, component: &str, message: String) {
        if let Some(health) = &self.health {
            health.record_failure(component, message).await;
        }
    }
}
