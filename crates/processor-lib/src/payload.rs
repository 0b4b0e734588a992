//! Request payloads for the recommendation service
//!
//! Builders are pure: no I/O, no clocks. The trial descriptor for
//! update-results is supplied by the caller.

use crate::models::{experiment_name, Experiment, RequestContext, TrialInfo};
use crate::report::{ContainerMetrics, ReportRow};
use serde::{Deserialize, Serialize};

pub const PERFORMANCE_PROFILE: &str = "resource_optimization";
pub const MODE: &str = "monitor";
pub const TARGET_CLUSTER: &str = "remote";
pub const MEASUREMENT_DURATION: &str = "15min";
pub const RECOMMENDATION_THRESHOLD: &str = "0.1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialSettings {
    pub measurement_duration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationSettings {
    pub threshold: String,
}

/// Container identity registered with an experiment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerIdentity {
    pub container_name: String,
    pub image_name: String,
}

impl From<&ReportRow> for ContainerIdentity {
    fn from(row: &ReportRow) -> Self {
        Self {
            container_name: row.container_name.clone(),
            image_name: row.image_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateExperimentPayload {
    #[serde(rename = "performanceProfile")]
    pub performance_profile: String,
    pub mode: String,
    #[serde(rename = "targetCluster")]
    pub target_cluster: String,
    pub trial_settings: TrialSettings,
    pub recommendation_settings: RecommendationSettings,
    pub experiment_name: String,
    pub namespace: String,
    pub deployment_name: String,
    pub containers: Vec<ContainerIdentity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultInfo {
    pub trial_info: TrialInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentResults {
    pub deployment_name: String,
    pub namespace: String,
    pub pod_metrics: Vec<serde_json::Value>,
    pub containers: Vec<ContainerMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateResultsPayload {
    pub experiment_name: String,
    pub info: ResultInfo,
    pub deployments: Vec<DeploymentResults>,
}

/// Query parameters for listRecommendations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    pub experiment_name: String,
    pub deployment_name: String,
    pub namespace: String,
}

pub fn build_create_payload(
    namespace: &str,
    deployment: &str,
    containers: Vec<ContainerIdentity>,
    context: &RequestContext,
    separator: &str,
) -> CreateExperimentPayload {
    CreateExperimentPayload {
        performance_profile: PERFORMANCE_PROFILE.to_string(),
        mode: MODE.to_string(),
        target_cluster: TARGET_CLUSTER.to_string(),
        trial_settings: TrialSettings {
            measurement_duration: MEASUREMENT_DURATION.to_string(),
        },
        recommendation_settings: RecommendationSettings {
            threshold: RECOMMENDATION_THRESHOLD.to_string(),
        },
        experiment_name: experiment_name(context, namespace, deployment, separator),
        namespace: namespace.to_string(),
        deployment_name: deployment.to_string(),
        containers,
    }
}

pub fn build_update_payload(
    namespace: &str,
    deployment: &str,
    containers: Vec<ContainerMetrics>,
    context: &RequestContext,
    trial: &TrialInfo,
    separator: &str,
) -> UpdateResultsPayload {
    UpdateResultsPayload {
        experiment_name: experiment_name(context, namespace, deployment, separator),
        info: ResultInfo {
            trial_info: trial.clone(),
        },
        deployments: vec![DeploymentResults {
            deployment_name: deployment.to_string(),
            namespace: namespace.to_string(),
            pod_metrics: Vec::new(),
            containers,
        }],
    }
}

pub fn build_list_params(experiment: &Experiment) -> ListParams {
    ListParams {
        experiment_name: experiment.experiment_name.clone(),
        deployment_name: experiment.deployment_name.clone(),
        namespace: experiment.namespace.clone(),
    }
}
