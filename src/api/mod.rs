//! External collaborator contracts
//!
//! Follows the same trait-based pattern as the engine's other seams:
//! - `ExperimentStore` / `IndexSettingsStore` traits for abstraction
//! - `HttpExperimentClient` / `HttpSettingsClient` for production (http.rs)
//! - `MockExperimentStore` / `MockSettingsStore` for testing
//!
//! All calls are awaited sequentially by the callers; nothing here retries
//! automatically — retry is operator-initiated.

pub mod http;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

use crate::experiment::{ConclusionPayload, CreateExperimentRequest, Experiment, ResultsSnapshot};

pub use http::{HttpExperimentClient, HttpSettingsClient};

/// Collaborator call failures
///
/// Every variant is retryable from the operator's point of view: the
/// workflow surfaces the error and stays where it was.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("collaborator unreachable: {0}")]
    Unreachable(String),

    #[error("collaborator returned invalid response: {0}")]
    InvalidResponse(String),

    #[error("collaborator call timed out after {0:?}")]
    Timeout(Duration),

    #[error("collaborator rejected request (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}

/// Experiment persistence and statistics collaborator
#[async_trait]
pub trait ExperimentStore: Send + Sync {
    /// Create an experiment in draft status
    async fn create(&self, request: &CreateExperimentRequest) -> Result<Experiment, StoreError>;

    /// Transition a draft experiment to running
    async fn start(&self, id: &str) -> Result<Experiment, StoreError>;

    /// Manually stop a running experiment
    async fn stop(&self, id: &str) -> Result<Experiment, StoreError>;

    /// Fetch the latest results snapshot
    async fn fetch_results(&self, id: &str) -> Result<ResultsSnapshot, StoreError>;

    /// Conclude the experiment with the decision payload
    async fn conclude(
        &self,
        id: &str,
        payload: &ConclusionPayload,
    ) -> Result<Experiment, StoreError>;
}

/// Index configuration collaborator
///
/// Promotion merges a variant's query overrides into the base index's live
/// settings. Must succeed before a conclusion may claim `promoted: true`.
#[async_trait]
pub trait IndexSettingsStore: Send + Sync {
    async fn apply_overrides(
        &self,
        index_name: &str,
        overrides: &Map<String, Value>,
    ) -> Result<(), StoreError>;
}

/// Mock experiment store for testing
///
/// Records conclude calls and returns preconfigured responses.
#[cfg(test)]
pub struct MockExperimentStore {
    pub snapshot: std::sync::Mutex<ResultsSnapshot>,
    pub concluded: std::sync::Mutex<Vec<(String, ConclusionPayload)>>,
    pub conclude_error: std::sync::Mutex<Option<String>>,
    pub fetch_error: std::sync::Mutex<Option<String>>,
    pub fetch_count: std::sync::atomic::AtomicU32,
}

#[cfg(test)]
impl MockExperimentStore {
    pub fn new(snapshot: ResultsSnapshot) -> Self {
        Self {
            snapshot: std::sync::Mutex::new(snapshot),
            concluded: std::sync::Mutex::new(Vec::new()),
            conclude_error: std::sync::Mutex::new(None),
            fetch_error: std::sync::Mutex::new(None),
            fetch_count: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub fn failing_conclude(snapshot: ResultsSnapshot, message: &str) -> Self {
        let store = Self::new(snapshot);
        *store.conclude_error.lock().unwrap() = Some(message.to_string());
        store
    }

    pub fn conclude_calls(&self) -> Vec<(String, ConclusionPayload)> {
        self.concluded.lock().unwrap().clone()
    }

    pub fn fetches(&self) -> u32 {
        self.fetch_count.load(std::sync::atomic::Ordering::Relaxed)
    }
}

#[cfg(test)]
#[async_trait]
#[allow(clippy::unwrap_used)]
impl ExperimentStore for MockExperimentStore {
    async fn create(&self, request: &CreateExperimentRequest) -> Result<Experiment, StoreError> {
        Ok(Experiment {
            id: "exp-mock".to_string(),
            name: request.name.clone(),
            index_name: request.index_name.clone(),
            status: crate::experiment::ExperimentStatus::Draft,
            traffic_split: request.traffic_split,
            control: request.control.clone(),
            variant: request.variant.clone(),
            primary_metric: request.primary_metric.clone(),
            minimum_days: request.minimum_days,
            created_at: chrono::Utc::now(),
            started_at: None,
            ended_at: None,
            conclusion: None,
        })
    }

    async fn start(&self, id: &str) -> Result<Experiment, StoreError> {
        Err(StoreError::InvalidResponse(format!(
            "start not configured for {id}"
        )))
    }

    async fn stop(&self, id: &str) -> Result<Experiment, StoreError> {
        Err(StoreError::InvalidResponse(format!(
            "stop not configured for {id}"
        )))
    }

    async fn fetch_results(&self, _id: &str) -> Result<ResultsSnapshot, StoreError> {
        self.fetch_count
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        if let Some(message) = self.fetch_error.lock().unwrap().clone() {
            return Err(StoreError::Unreachable(message));
        }
        Ok(self.snapshot.lock().unwrap().clone())
    }

    async fn conclude(
        &self,
        id: &str,
        payload: &ConclusionPayload,
    ) -> Result<Experiment, StoreError> {
        if let Some(message) = self.conclude_error.lock().unwrap().clone() {
            return Err(StoreError::Unreachable(message));
        }
        self.concluded
            .lock()
            .unwrap()
            .push((id.to_string(), payload.clone()));
        Ok(Experiment {
            id: id.to_string(),
            name: "concluded".to_string(),
            index_name: "products".to_string(),
            status: crate::experiment::ExperimentStatus::Concluded,
            traffic_split: 0.5,
            control: crate::experiment::ControlSpec::default(),
            variant: crate::experiment::VariantSpec {
                name: "variant".to_string(),
                query_overrides: None,
                index_name: None,
            },
            primary_metric: "conversionRate".to_string(),
            minimum_days: 7,
            created_at: chrono::Utc::now(),
            started_at: None,
            ended_at: Some(chrono::Utc::now()),
            conclusion: Some(crate::experiment::ConclusionRecord {
                winner: payload.winner,
                reason: payload.reason.clone(),
                control_metric: payload.control_metric,
                variant_metric: payload.variant_metric,
                confidence: payload.confidence,
                significant: payload.significant,
                promoted: payload.promoted,
            }),
        })
    }
}

/// Mock settings store for testing
///
/// Records applied overrides and optionally fails every call.
#[cfg(test)]
#[derive(Default)]
pub struct MockSettingsStore {
    pub applied: std::sync::Mutex<Vec<(String, Map<String, Value>)>>,
    pub fail_with: std::sync::Mutex<Option<String>>,
}

#[cfg(test)]
impl MockSettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        let store = Self::default();
        *store.fail_with.lock().unwrap() = Some(message.to_string());
        store
    }

    pub fn applied_calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.applied.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
#[allow(clippy::unwrap_used)]
impl IndexSettingsStore for MockSettingsStore {
    async fn apply_overrides(
        &self,
        index_name: &str,
        overrides: &Map<String, Value>,
    ) -> Result<(), StoreError> {
        if let Some(message) = self.fail_with.lock().unwrap().clone() {
            return Err(StoreError::Unreachable(message));
        }
        self.applied
            .lock()
            .unwrap()
            .push((index_name.to_string(), overrides.clone()));
        Ok(())
    }
}
