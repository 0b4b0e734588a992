//! Per-container metric extraction
//!
//! Maps the sixteen aggregate columns of a report row onto the eight metric
//! kinds the recommendation service understands. Request and limit metrics
//! carry `sum` and `mean`; usage, throttle and RSS metrics carry `max` and
//! `mean`. Values are passed through unconverted.

use crate::error::{ProcessorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::table::ReportRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    #[serde(rename = "cpuRequest")]
    CpuRequest,
    #[serde(rename = "cpuLimit")]
    CpuLimit,
    #[serde(rename = "cpuUsage")]
    CpuUsage,
    #[serde(rename = "cpuThrottle")]
    CpuThrottle,
    #[serde(rename = "memoryRequest")]
    MemoryRequest,
    #[serde(rename = "memoryLimit")]
    MemoryLimit,
    #[serde(rename = "memoryUsage")]
    MemoryUsage,
    #[serde(rename = "memoryRSS")]
    MemoryRss,
}

/// Statistic paired with `mean` for a metric kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeakStatistic {
    Sum,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Units {
    #[serde(rename = "cores")]
    Cores,
    #[serde(rename = "MiB")]
    MiB,
}

impl MetricKind {
    pub const ALL: [MetricKind; 8] = [
        MetricKind::CpuRequest,
        MetricKind::CpuLimit,
        MetricKind::CpuUsage,
        MetricKind::CpuThrottle,
        MetricKind::MemoryRequest,
        MetricKind::MemoryLimit,
        MetricKind::MemoryUsage,
        MetricKind::MemoryRss,
    ];

    pub fn units(self) -> Units {
        match self {
            MetricKind::CpuRequest
            | MetricKind::CpuLimit
            | MetricKind::CpuUsage
            | MetricKind::CpuThrottle => Units::Cores,
            _ => Units::MiB,
        }
    }

    pub fn peak_statistic(self) -> PeakStatistic {
        match self {
            MetricKind::CpuRequest
            | MetricKind::CpuLimit
            | MetricKind::MemoryRequest
            | MetricKind::MemoryLimit => PeakStatistic::Sum,
            _ => PeakStatistic::Max,
        }
    }

    /// Source columns as (sum or max column, avg column)
    pub fn columns(self) -> (&'static str, &'static str) {
        match self {
            MetricKind::CpuRequest => ("cpu_request_sum_container", "cpu_request_avg_container"),
            MetricKind::CpuLimit => ("cpu_limit_sum_container", "cpu_limit_avg_container"),
            MetricKind::CpuUsage => ("cpu_usage_max_container", "cpu_usage_avg_container"),
            MetricKind::CpuThrottle => ("cpu_throttle_max_container", "cpu_throttle_avg_container"),
            MetricKind::MemoryRequest => ("mem_request_sum_container", "mem_request_avg_container"),
            MetricKind::MemoryLimit => ("mem_limit_sum_container", "mem_limit_avg_container"),
            MetricKind::MemoryUsage => ("mem_usage_max_container", "mem_usage_avg_container"),
            MetricKind::MemoryRss => ("mem-rss_usage_max_container", "mem-rss_usage_avg_container"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralInfo {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sum: Option<f64>,
    pub mean: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max: Option<f64>,
    pub units: Units,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResults {
    pub general_info: GeneralInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    pub results: MetricResults,
}

/// Metrics for one container, shaped the way update-results expects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerMetrics {
    pub container_name: String,
    pub image_name: String,
    #[serde(rename = "container_metrics")]
    pub metrics: BTreeMap<MetricKind, MetricEntry>,
}

/// Extract all eight metric kinds from one row.
///
/// Fails on the first absent aggregate, naming its column. A non-finite
/// value (`NaN`, `inf`) counts as absent.
pub fn extract(row: &ReportRow) -> Result<ContainerMetrics> {
    let mut metrics = BTreeMap::new();

    for kind in MetricKind::ALL {
        let (peak_column, avg_column) = kind.columns();
        let (peak, mean) = row.pair(kind);

        let missing = |column: &'static str| ProcessorError::MissingMetricField {
            container: row.container_name.clone(),
            column,
        };
        let peak = peak
            .filter(|v| v.is_finite())
            .ok_or_else(|| missing(peak_column))?;
        let mean = mean
            .filter(|v| v.is_finite())
            .ok_or_else(|| missing(avg_column))?;

        let (sum, max) = match kind.peak_statistic() {
            PeakStatistic::Sum => (Some(peak), None),
            PeakStatistic::Max => (None, Some(peak)),
        };

        metrics.insert(
            kind,
            MetricEntry {
                results: MetricResults {
                    general_info: GeneralInfo {
                        sum,
                        mean,
                        max,
                        units: kind.units(),
                    },
                },
            },
        );
    }

    Ok(ContainerMetrics {
        container_name: row.container_name.clone(),
        image_name: row.image_name.clone(),
        metrics,
    })
}
