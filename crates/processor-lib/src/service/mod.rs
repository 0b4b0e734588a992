//! Recommendation service boundary
//!
//! The orchestrator talks to the service through [`RecommendationService`];
//! [`KruizeClient`] is the HTTP implementation.

mod client;

pub use client::{KruizeClient, KruizeClientConfig};

use crate::error::Result;
use crate::payload::{CreateExperimentPayload, ListParams, UpdateResultsPayload};
use async_trait::async_trait;
use std::fmt;

/// The three calls made against the recommendation service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateExperiment,
    UpdateResults,
    ListRecommendations,
}

impl Operation {
    pub fn path(self) -> &'static str {
        match self {
            Operation::CreateExperiment => "createExperiment",
            Operation::UpdateResults => "updateResults",
            Operation::ListRecommendations => "listRecommendations",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Status and raw body of a service response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResponse {
    pub status: u16,
    pub body: String,
}

impl ServiceResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Client interface for the recommendation service.
///
/// Implementations return `Err` only for transport failures; any HTTP
/// status, including errors, comes back as a [`ServiceResponse`].
#[async_trait]
pub trait RecommendationService: Send + Sync {
    async fn create_experiment(&self, payload: &CreateExperimentPayload) -> Result<ServiceResponse>;

    async fn update_results(&self, payload: &UpdateResultsPayload) -> Result<ServiceResponse>;

    async fn list_recommendations(&self, params: &ListParams) -> Result<ServiceResponse>;
}
