//! Core data models for the report processor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upload notification as delivered on the upload topic
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InboundEvent {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub b64_identity: Option<String>,
    #[serde(default)]
    pub metadata: Option<EventMetadata>,
    #[serde(default)]
    pub files: Vec<String>,
}

impl InboundEvent {
    /// Decode a raw message payload
    pub fn from_slice(payload: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventMetadata {
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub cluster_id: Option<String>,
}

/// Validated, immutable context for one inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    pub account_id: Option<String>,
    pub org_id: String,
    pub cluster_id: String,
    pub identity_token: Option<String>,
}

/// Experiment identity recorded during the update phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_name: String,
    pub namespace: String,
    pub deployment_name: String,
}

impl Experiment {
    pub fn new(
        context: &RequestContext,
        namespace: &str,
        deployment_name: &str,
        separator: &str,
    ) -> Self {
        Self {
            experiment_name: experiment_name(context, namespace, deployment_name, separator),
            namespace: namespace.to_string(),
            deployment_name: deployment_name.to_string(),
        }
    }
}

/// Build the experiment key from org, cluster, namespace and deployment.
///
/// With an empty separator this is plain concatenation, which is what the
/// recommendation service has historically been fed. Plain concatenation can
/// collide (`"ab" + "c"` vs `"a" + "bc"`); pass a separator to avoid that.
pub fn experiment_name(
    context: &RequestContext,
    namespace: &str,
    deployment_name: &str,
    separator: &str,
) -> String {
    [
        context.org_id.as_str(),
        context.cluster_id.as_str(),
        namespace,
        deployment_name,
    ]
    .join(separator)
}

/// Trial descriptor sent with every update-results call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialInfo {
    pub trial_number: u32,
    pub trial_timestamp: String,
}

impl TrialInfo {
    pub const TIMESTAMP_FORMAT: &'static str = "%Y%m%d%H%M%S";

    pub fn at(trial_number: u32, timestamp: DateTime<Utc>) -> Self {
        Self {
            trial_number,
            trial_timestamp: timestamp.format(Self::TIMESTAMP_FORMAT).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn context(org: &str, cluster: &str) -> RequestContext {
        RequestContext {
            request_id: "r1".to_string(),
            account_id: Some("a1".to_string()),
            org_id: org.to_string(),
            cluster_id: cluster.to_string(),
            identity_token: None,
        }
    }

    #[test]
    fn test_experiment_name_concatenates_without_separator() {
        let ctx = context("o1", "c1");
        assert_eq!(experiment_name(&ctx, "ns1", "dep1", ""), "o1c1ns1dep1");
    }

    #[test]
    fn test_experiment_name_is_deterministic() {
        let ctx = context("o1", "c1");
        let first = experiment_name(&ctx, "ns1", "dep1", "");
        for _ in 0..5 {
            assert_eq!(experiment_name(&ctx, "ns1", "dep1", ""), first);
        }
    }

    #[test]
    fn test_separator_prevents_collision() {
        let left = context("ab", "c");
        let right = context("a", "bc");

        // Without a separator both tenants map to the same experiment
        assert_eq!(
            experiment_name(&left, "ns", "dep", ""),
            experiment_name(&right, "ns", "dep", "")
        );
        assert_ne!(
            experiment_name(&left, "ns", "dep", "|"),
            experiment_name(&right, "ns", "dep", "|")
        );
        assert_eq!(experiment_name(&left, "ns", "dep", "|"), "ab|c|ns|dep");
    }

    #[test]
    fn test_trial_info_timestamp_format() {
        let ts = Utc.with_ymd_and_hms(2023, 4, 5, 6, 7, 8).unwrap();
        let trial = TrialInfo::at(98, ts);
        assert_eq!(trial.trial_number, 98);
        assert_eq!(trial.trial_timestamp, "20230405060708");
    }

    #[test]
    fn test_event_decodes_with_missing_optional_fields() {
        let event = InboundEvent::from_slice(br#"{"request_id":"r1"}"#).unwrap();
        assert_eq!(event.request_id.as_deref(), Some("r1"));
        assert!(event.metadata.is_none());
        assert!(event.files.is_empty());
    }

    #[test]
    fn test_event_decode_rejects_garbage() {
        assert!(InboundEvent::from_slice(b"not json").is_err());
    }
}
