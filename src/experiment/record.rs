//! Experiment record, lifecycle status and conclusion wire types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Experiment lifecycle status
///
/// Created in `Draft`, moves to `Running` on start, `Stopped` on a manual
/// stop, and `Concluded` on a successful decision call. `Draft` and
/// `Concluded` are terminal with respect to the decision workflow.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentStatus {
    Draft,
    Running,
    Stopped,
    Concluded,
}

/// Control arm descriptor — always named "control"
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ControlSpec {
    pub name: String,
}

impl Default for ControlSpec {
    fn default() -> Self {
        Self {
            name: "control".to_string(),
        }
    }
}

/// Variant arm descriptor
///
/// Exactly one of `query_overrides` (variant runs inside the base index with
/// overridden query settings) or `index_name` (variant runs against a
/// separate index) is populated.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VariantSpec {
    pub name: String,

    /// Query-override map applied on top of the base index settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_overrides: Option<Map<String, Value>>,

    /// Separate index serving the variant arm
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
}

/// Server-owned experiment record
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    pub id: String,
    pub name: String,
    pub index_name: String,
    pub status: ExperimentStatus,

    /// Fraction of traffic assigned to the variant, in (0, 1)
    pub traffic_split: f64,

    pub control: ControlSpec,
    pub variant: VariantSpec,

    /// Metric identifier as stored by the server; may use either spelling
    /// convention, normalize via `engine::metric::resolve_metric`
    pub primary_metric: String,

    pub minimum_days: u32,

    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<ConclusionRecord>,
}

impl Experiment {
    /// Overrides that promotion would merge into the base index settings
    ///
    /// Non-empty only for a query-override variant; a separate-index variant
    /// has nothing promotable.
    pub fn promotable_overrides(&self) -> Option<&Map<String, Value>> {
        self.variant
            .query_overrides
            .as_ref()
            .filter(|m| !m.is_empty())
    }
}

/// Which arm won the experiment
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Control,
    Variant,
}

/// Request body for the create-experiment collaborator
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateExperimentRequest {
    pub name: String,
    pub index_name: String,
    /// Variant traffic fraction in (0, 1)
    pub traffic_split: f64,
    pub control: ControlSpec,
    pub variant: VariantSpec,
    pub primary_metric: String,
    pub minimum_days: u32,
}

/// Conclusion sent once by the decision workflow
///
/// `promoted` is true only when the settings-update call actually succeeded
/// before this payload was sent.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConclusionPayload {
    pub winner: Option<Winner>,
    pub reason: String,
    pub control_metric: f64,
    pub variant_metric: f64,
    pub confidence: f64,
    pub significant: bool,
    pub promoted: bool,
}

/// Conclusion record as persisted by the server
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConclusionRecord {
    pub winner: Option<Winner>,
    pub reason: String,
    pub control_metric: f64,
    pub variant_metric: f64,
    pub confidence: f64,
    pub significant: bool,
    pub promoted: bool,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ExperimentStatus::Running).unwrap();
        assert_eq!(json, "\"running\"");
        let status: ExperimentStatus = serde_json::from_str("\"concluded\"").unwrap();
        assert_eq!(status, ExperimentStatus::Concluded);
    }

    #[test]
    fn test_winner_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Winner::Variant).unwrap(),
            "\"variant\""
        );
        let w: Winner = serde_json::from_str("\"control\"").unwrap();
        assert_eq!(w, Winner::Control);
    }

    #[test]
    fn test_variant_spec_omits_absent_fields() {
        let variant = VariantSpec {
            name: "variant".to_string(),
            query_overrides: None,
            index_name: Some("products_v2".to_string()),
        };
        let json = serde_json::to_value(&variant).unwrap();
        assert!(json.get("queryOverrides").is_none());
        assert_eq!(json["indexName"], "products_v2");
    }

    #[test]
    fn test_promotable_overrides_requires_non_empty_map() {
        let mut overrides = Map::new();
        overrides.insert("enableSynonyms".to_string(), Value::Bool(false));

        let mut experiment = experiment_with_overrides(Some(overrides));
        assert!(experiment.promotable_overrides().is_some());

        experiment.variant.query_overrides = Some(Map::new());
        assert!(experiment.promotable_overrides().is_none());

        experiment.variant.query_overrides = None;
        assert!(experiment.promotable_overrides().is_none());
    }

    fn experiment_with_overrides(overrides: Option<Map<String, Value>>) -> Experiment {
        Experiment {
            id: "exp-1".to_string(),
            name: "synonyms off".to_string(),
            index_name: "products".to_string(),
            status: ExperimentStatus::Running,
            traffic_split: 0.5,
            control: ControlSpec::default(),
            variant: VariantSpec {
                name: "variant".to_string(),
                query_overrides: overrides,
                index_name: None,
            },
            primary_metric: "conversionRate".to_string(),
            minimum_days: 7,
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            ended_at: None,
            conclusion: None,
        }
    }
}
