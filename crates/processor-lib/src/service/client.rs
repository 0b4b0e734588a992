//! HTTP client for the Kruize recommendation service

use super::{Operation, RecommendationService, ServiceResponse};
use crate::error::{ProcessorError, Result};
use crate::payload::{CreateExperimentPayload, ListParams, UpdateResultsPayload};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Configuration for the recommendation service client
#[derive(Debug, Clone)]
pub struct KruizeClientConfig {
    /// Base URL, e.g. `http://kruize:8080`
    pub base_url: String,
    /// Upper bound for each request
    pub request_timeout: Duration,
}

impl Default for KruizeClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Recommendation service client. No retries; one request per call.
pub struct KruizeClient {
    client: Client,
    base_url: Url,
}

impl KruizeClient {
    pub fn new(config: &KruizeClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| ProcessorError::ServiceTransport {
                operation: "build_client",
                source,
            })?;

        // Relative joins only append when the base path ends with '/'
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, operation: Operation) -> Result<Url> {
        Ok(self.base_url.join(operation.path())?)
    }

    /// POST a single-element JSON array
    async fn post<B: Serialize + Sync>(
        &self,
        operation: Operation,
        body: &B,
    ) -> Result<ServiceResponse> {
        let url = self.endpoint(operation)?;
        debug!(operation = %operation, url = %url, "Sending request");

        let response = self
            .client
            .post(url)
            .json(&[body])
            .send()
            .await
            .map_err(|source| ProcessorError::ServiceTransport {
                operation: operation.path(),
                source,
            })?;

        read_response(operation, response).await
    }
}

async fn read_response(operation: Operation, response: Response) -> Result<ServiceResponse> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|source| ProcessorError::ServiceTransport {
            operation: operation.path(),
            source,
        })?;
    Ok(ServiceResponse { status, body })
}

#[async_trait]
impl RecommendationService for KruizeClient {
    async fn create_experiment(
        &self,
        payload: &CreateExperimentPayload,
    ) -> Result<ServiceResponse> {
        self.post(Operation::CreateExperiment, payload).await
    }

    async fn update_results(&self, payload: &UpdateResultsPayload) -> Result<ServiceResponse> {
        self.post(Operation::UpdateResults, payload).await
    }

    async fn list_recommendations(&self, params: &ListParams) -> Result<ServiceResponse> {
        let operation = Operation::ListRecommendations;
        let url = self.endpoint(operation)?;
        debug!(operation = %operation, url = %url, "Sending request");

        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|source| ProcessorError::ServiceTransport {
                operation: operation.path(),
                source,
            })?;

        read_response(operation, response).await
    }
}
