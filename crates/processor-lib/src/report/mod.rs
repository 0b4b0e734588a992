//! Report file loading and decomposition
//!
//! This module provides:
//! - Typed report rows parsed from CSV
//! - A loader for local paths and HTTP(S) references
//! - The namespace/deployment/container hierarchy view
//! - Per-container metric extraction

mod extract;
mod hierarchy;
mod table;


pub use extract::{
    extract, ContainerMetrics, GeneralInfo, MetricEntry, MetricKind, MetricResults,
    PeakStatistic, Units,
};
pub use hierarchy::{DeploymentUnit, Hierarchy};
pub use table::{ReportRow, ReportTable};

use crate::error::{ProcessorError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Source of report tables
#[async_trait]
pub trait ReportLoader: Send + Sync {
    /// Load the table behind a report reference
    async fn load(&self, reference: &str) -> Result<ReportTable>;
}

/// Loads CSV reports from HTTP(S) URLs or the local filesystem
pub struct CsvReportLoader {
    http: reqwest::Client,
}

impl CsvReportLoader {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProcessorError::report_load("<client>", e))?;
        Ok(Self { http })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn fetch(&self, reference: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(reference)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProcessorError::report_load(reference, e))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| ProcessorError::report_load(reference, e))?;
        Ok(body.to_vec())
    }
}

fn is_remote(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

#[async_trait]
impl ReportLoader for CsvReportLoader {
    async fn load(&self, reference: &str) -> Result<ReportTable> {
        let bytes = if is_remote(reference) {
            self.fetch(reference).await?
        } else {
            tokio::fs::read(reference)
                .await
                .map_err(|e| ProcessorError::report_load(reference, e))?
        };

        let table = ReportTable::from_csv(reference, bytes.as_slice())?;
        debug!(reference = %reference, rows = table.len(), "Loaded report table");
        Ok(table)
    }
}
