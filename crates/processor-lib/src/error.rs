//! Error taxonomy for the report processing pipeline

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessorError>;

#[derive(Debug, Error)]
pub enum ProcessorError {
    /// Required event fields are absent or empty
    #[error("message missing required field(s): {}", .missing.join(", "))]
    MalformedEvent { missing: Vec<&'static str> },

    /// Message payload is not a decodable event
    #[error("unable to decode event payload: {0}")]
    EventDecode(#[from] serde_json::Error),

    /// A report file could not be read or parsed into a table
    #[error("unable to load report {reference}: {reason}")]
    ReportLoad { reference: String, reason: String },

    /// A report row lacks one of its identity columns
    #[error("malformed report: row {row} has no value for column {column}")]
    MalformedReport { row: usize, column: &'static str },

    /// A container row lacks a required aggregate column
    #[error("container {container} is missing metric column {column}")]
    MissingMetricField {
        container: String,
        column: &'static str,
    },

    /// Transport-level failure talking to the recommendation service
    #[error("recommendation service call {operation} failed: {source}")]
    ServiceTransport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Failure reading from or acknowledging on the message source
    #[error("event source error: {0}")]
    Source(String),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessorError {
    pub(crate) fn report_load(reference: &str, reason: impl ToString) -> Self {
        Self::ReportLoad {
            reference: reference.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_event_lists_every_field() {
        let err = ProcessorError::MalformedEvent {
            missing: vec!["org_id", "request_id", "cluster_id"],
        };
        assert_eq!(
            err.to_string(),
            "message missing required field(s): org_id, request_id, cluster_id"
        );
    }

    #[test]
    fn test_missing_metric_names_column() {
        let err = ProcessorError::MissingMetricField {
            container: "c1".to_string(),
            column: "mem_usage_max_container",
        };
        assert!(err.to_string().contains("mem_usage_max_container"));
    }
}
