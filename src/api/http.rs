//! HTTP clients for the experiment and settings collaborators

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{info, warn};

use crate::experiment::{ConclusionPayload, CreateExperimentRequest, Experiment, ResultsSnapshot};

use super::{ExperimentStore, IndexSettingsStore, StoreError};

/// Default timeout for collaborator calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

fn build_client(timeout: Duration) -> reqwest::Client {
    match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Failed to build HTTP client, using default");
            reqwest::Client::new()
        }
    }
}

fn map_send_error(e: reqwest::Error, timeout: Duration) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout(timeout)
    } else {
        StoreError::Unreachable(e.to_string())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Api {
        status: status.as_u16(),
        message: body.chars().take(200).collect(),
    })
}

/// HTTP client for the experiment persistence store and statistics service
pub struct HttpExperimentClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpExperimentClient {
    pub fn new(base_url: String) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: String, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    async fn parse_experiment(&self, response: reqwest::Response) -> Result<Experiment, StoreError> {
        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    async fn post_transition(&self, id: &str, action: &str) -> Result<Experiment, StoreError> {
        let url = format!("{}/experiments/{}/{}", self.base_url, id, action);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;
        let experiment = self.parse_experiment(response).await?;
        info!(experiment = %id, action, status = ?experiment.status, "Experiment transitioned");
        Ok(experiment)
    }
}

#[async_trait]
impl ExperimentStore for HttpExperimentClient {
    async fn create(&self, request: &CreateExperimentRequest) -> Result<Experiment, StoreError> {
        let url = format!("{}/experiments", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;
        let experiment = self.parse_experiment(response).await?;
        info!(
            experiment = %experiment.id,
            index = %experiment.index_name,
            "Experiment created"
        );
        Ok(experiment)
    }

    async fn start(&self, id: &str) -> Result<Experiment, StoreError> {
        self.post_transition(id, "start").await
    }

    async fn stop(&self, id: &str) -> Result<Experiment, StoreError> {
        self.post_transition(id, "stop").await
    }

    async fn fetch_results(&self, id: &str) -> Result<ResultsSnapshot, StoreError> {
        let url = format!("{}/experiments/{}/results", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;
        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    async fn conclude(
        &self,
        id: &str,
        payload: &ConclusionPayload,
    ) -> Result<Experiment, StoreError> {
        let url = format!("{}/experiments/{}/conclude", self.base_url, id);
        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;
        let experiment = self.parse_experiment(response).await?;
        info!(
            experiment = %id,
            winner = ?payload.winner,
            promoted = payload.promoted,
            "Experiment concluded"
        );
        Ok(experiment)
    }
}

/// HTTP client for the index configuration store
///
/// `apply_overrides` is a merge-style update: only the keys present in the
/// override map are touched on the index settings.
pub struct HttpSettingsClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpSettingsClient {
    pub fn new(base_url: String) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: String, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl IndexSettingsStore for HttpSettingsClient {
    async fn apply_overrides(
        &self,
        index_name: &str,
        overrides: &Map<String, Value>,
    ) -> Result<(), StoreError> {
        let url = format!("{}/indexes/{}/settings", self.base_url, index_name);
        let response = self
            .client
            .patch(&url)
            .json(overrides)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;

        match response.status() {
            status if status.is_success() => {
                info!(
                    index = %index_name,
                    keys = overrides.len(),
                    "Variant overrides merged into index settings"
                );
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(StoreError::Api {
                status: 404,
                message: format!("index '{index_name}' not found"),
            }),
            status => {
                let body = response.text().await.unwrap_or_default();
                warn!(index = %index_name, status = %status, "Settings update rejected");
                Err(StoreError::Api {
                    status: status.as_u16(),
                    message: body.chars().take(200).collect(),
                })
            }
        }
    }
}
