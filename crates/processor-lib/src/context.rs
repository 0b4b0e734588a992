//! Validation of inbound events into a request context

use crate::error::{ProcessorError, Result};
use crate::models::{InboundEvent, RequestContext};

/// Validate an event and produce the context threaded through processing.
///
/// Every missing required field is reported in one error.
pub fn build_request_context(event: &InboundEvent) -> Result<RequestContext> {
    let metadata = event.metadata.as_ref().ok_or(ProcessorError::MalformedEvent {
        missing: vec!["metadata"],
    })?;

    let org_id = non_empty(metadata.org_id.as_deref());
    let request_id = non_empty(event.request_id.as_deref());
    let cluster_id = non_empty(metadata.cluster_id.as_deref());

    let mut missing = Vec::new();
    if org_id.is_none() {
        missing.push("org_id");
    }
    if request_id.is_none() {
        missing.push("request_id");
    }
    if cluster_id.is_none() {
        missing.push("cluster_id");
    }

    match (request_id, org_id, cluster_id) {
        (Some(request_id), Some(org_id), Some(cluster_id)) => Ok(RequestContext {
            request_id: request_id.to_string(),
            account_id: non_empty(metadata.account.as_deref()).map(str::to_string),
            org_id: org_id.to_string(),
            cluster_id: cluster_id.to_string(),
            identity_token: non_empty(event.b64_identity.as_deref()).map(str::to_string),
        }),
        _ => Err(ProcessorError::MalformedEvent { missing }),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventMetadata;

    fn event(request_id: Option<&str>, org: Option<&str>, cluster: Option<&str>) -> InboundEvent {
        InboundEvent {
            request_id: request_id.map(str::to_string),
            b64_identity: Some("eyJpZGVudGl0eSI6e319".to_string()),
            metadata: Some(EventMetadata {
                org_id: org.map(str::to_string),
                account: Some("a1".to_string()),
                cluster_id: cluster.map(str::to_string),
            }),
            files: vec!["f.csv".to_string()],
        }
    }

    fn missing_fields(result: Result<RequestContext>) -> Vec<&'static str> {
        match result {
            Err(ProcessorError::MalformedEvent { missing }) => missing,
            other => panic!("expected MalformedEvent, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_event_builds_context() {
        let ctx = build_request_context(&event(Some("r1"), Some("o1"), Some("c1"))).unwrap();

        assert_eq!(
            ctx,
            RequestContext {
                request_id: "r1".to_string(),
                account_id: Some("a1".to_string()),
                org_id: "o1".to_string(),
                cluster_id: "c1".to_string(),
                identity_token: Some("eyJpZGVudGl0eSI6e319".to_string()),
            }
        );
    }

    #[test]
    fn test_missing_metadata() {
        let mut ev = event(Some("r1"), Some("o1"), Some("c1"));
        ev.metadata = None;
        assert_eq!(missing_fields(build_request_context(&ev)), vec!["metadata"]);
    }

    #[test]
    fn test_missing_cluster_id() {
        let result = build_request_context(&event(Some("r1"), Some("o1"), None));
        assert_eq!(missing_fields(result), vec!["cluster_id"]);
    }

    #[test]
    fn test_empty_strings_count_as_missing() {
        let result = build_request_context(&event(Some(""), Some("o1"), Some("")));
        assert_eq!(missing_fields(result), vec!["request_id", "cluster_id"]);
    }

    #[test]
    fn test_all_missing_fields_reported_together() {
        let result = build_request_context(&event(None, None, None));
        let err = match result {
            Err(err) => err,
            Ok(_) => panic!("expected error"),
        };
        let message = err.to_string();
        assert!(message.contains("org_id"));
        assert!(message.contains("request_id"));
        assert!(message.contains("cluster_id"));
    }

    #[test]
    fn test_optional_fields_absent() {
        let mut ev = event(Some("r1"), Some("o1"), Some("c1"));
        ev.b64_identity = None;
        if let Some(metadata) = ev.metadata.as_mut() {
            metadata.account = None;
        }

        let ctx = build_request_context(&ev).unwrap();
        assert!(ctx.account_id.is_none());
        assert!(ctx.identity_token.is_none());
    }
}
