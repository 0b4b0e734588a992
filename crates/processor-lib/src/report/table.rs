//! Typed report rows and the in-memory report table

use crate::error::{ProcessorError, Result};
use serde::Deserialize;
use std::io::Read;

use super::extract::MetricKind;

/// One container observation from a report file.
///
/// Identity columns default to an empty string when absent. An empty
/// namespace or deployment rejects the whole table; an empty container or
/// image only affects the deployment the row belongs to. An aggregate is
/// `None` when its column is absent from the file or the cell is empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReportRow {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub deployment_name: String,
    #[serde(default)]
    pub container_name: String,
    #[serde(default)]
    pub image_name: String,
    #[serde(rename = "cpu_request_sum_container")]
    pub cpu_request_sum: Option<f64>,
    #[serde(rename = "cpu_request_avg_container")]
    pub cpu_request_avg: Option<f64>,
    #[serde(rename = "cpu_limit_sum_container")]
    pub cpu_limit_sum: Option<f64>,
    #[serde(rename = "cpu_limit_avg_container")]
    pub cpu_limit_avg: Option<f64>,
    #[serde(rename = "cpu_usage_max_container")]
    pub cpu_usage_max: Option<f64>,
    #[serde(rename = "cpu_usage_avg_container")]
    pub cpu_usage_avg: Option<f64>,
    #[serde(rename = "cpu_throttle_max_container")]
    pub cpu_throttle_max: Option<f64>,
    #[serde(rename = "cpu_throttle_avg_container")]
    pub cpu_throttle_avg: Option<f64>,
    #[serde(rename = "mem_request_sum_container")]
    pub mem_request_sum: Option<f64>,
    #[serde(rename = "mem_request_avg_container")]
    pub mem_request_avg: Option<f64>,
    #[serde(rename = "mem_limit_sum_container")]
    pub mem_limit_sum: Option<f64>,
    #[serde(rename = "mem_limit_avg_container")]
    pub mem_limit_avg: Option<f64>,
    #[serde(rename = "mem_usage_max_container")]
    pub mem_usage_max: Option<f64>,
    #[serde(rename = "mem_usage_avg_container")]
    pub mem_usage_avg: Option<f64>,
    #[serde(rename = "mem-rss_usage_max_container")]
    pub mem_rss_usage_max: Option<f64>,
    #[serde(rename = "mem-rss_usage_avg_container")]
    pub mem_rss_usage_avg: Option<f64>,
}

impl ReportRow {
    /// Returns the (sum or max, avg) pair backing a metric kind
    pub fn pair(&self, kind: MetricKind) -> (Option<f64>, Option<f64>) {
        match kind {
            MetricKind::CpuRequest => (self.cpu_request_sum, self.cpu_request_avg),
            MetricKind::CpuLimit => (self.cpu_limit_sum, self.cpu_limit_avg),
            MetricKind::CpuUsage => (self.cpu_usage_max, self.cpu_usage_avg),
            MetricKind::CpuThrottle => (self.cpu_throttle_max, self.cpu_throttle_avg),
            MetricKind::MemoryRequest => (self.mem_request_sum, self.mem_request_avg),
            MetricKind::MemoryLimit => (self.mem_limit_sum, self.mem_limit_avg),
            MetricKind::MemoryUsage => (self.mem_usage_max, self.mem_usage_avg),
            MetricKind::MemoryRss => (self.mem_rss_usage_max, self.mem_rss_usage_avg),
        }
    }

    /// First empty container identity column, if any
    pub fn missing_container_identity(&self) -> Option<&'static str> {
        if self.container_name.is_empty() {
            Some("container_name")
        } else if self.image_name.is_empty() {
            Some("image_name")
        } else {
            None
        }
    }

    /// Every row must name its namespace and deployment
    fn validate(&self, row: usize) -> Result<()> {
        let grouping = [
            ("namespace", &self.namespace),
            ("deployment_name", &self.deployment_name),
        ];
        for (column, value) in grouping {
            if value.is_empty() {
                return Err(ProcessorError::MalformedReport { row, column });
            }
        }
        Ok(())
    }
}

/// Rows of one report file, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportTable {
    rows: Vec<ReportRow>,
}

impl ReportTable {
    /// Build a table from already-typed rows, validating grouping columns
    pub fn from_rows(rows: Vec<ReportRow>) -> Result<Self> {
        for (index, row) in rows.iter().enumerate() {
            row.validate(index + 1)?;
        }
        Ok(Self { rows })
    }

    /// Parse CSV with a header row. Unknown columns are ignored.
    pub fn from_csv<R: Read>(reference: &str, reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in csv_reader.deserialize::<ReportRow>() {
            let row = record.map_err(|e| ProcessorError::report_load(reference, e))?;
            rows.push(row);
        }

        Self::from_rows(rows)
    }

    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
