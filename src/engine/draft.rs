//! In-progress experiment configuration
//!
//! The draft backs the four-step creation wizard: identity (name + base
//! index), variant definition, traffic split, and review. Step gating and
//! `finalize` validate the same invariants — the wizard blocks early, and
//! `finalize` re-checks everything in case step gating was bypassed.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::experiment::{ControlSpec, CreateExperimentRequest, VariantSpec};

use super::metric::PrimaryMetric;

/// First wizard step
pub const FIRST_STEP: u8 = 1;

/// Last wizard step (review)
pub const LAST_STEP: u8 = 4;

/// Draft invariant violations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("experiment name cannot be empty")]
    EmptyName,

    #[error("a base index must be selected")]
    MissingIndex,

    #[error("variant index name cannot be empty")]
    EmptyVariantIndex,

    #[error("variant index must differ from the base index '{0}'")]
    VariantIndexSameAsBase(String),

    #[error("cannot advance from step {0}")]
    StepBlocked(u8),
}

/// How the variant arm is realized
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariantMode {
    /// Variant runs inside the base index with overridden query settings
    QueryOverride,
    /// Variant runs against a separate index
    SeparateIndex,
}

/// Query-setting toggles for a query-override variant
///
/// The boolean toggles are always part of the payload; the filter string is
/// trimmed and omitted when blank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryOverrideDraft {
    pub enable_synonyms: bool,
    pub enable_typo_tolerance: bool,
    pub enable_personalization: bool,
    pub filters: String,
}

impl Default for QueryOverrideDraft {
    fn default() -> Self {
        Self {
            enable_synonyms: true,
            enable_typo_tolerance: true,
            enable_personalization: false,
            filters: String::new(),
        }
    }
}

impl QueryOverrideDraft {
    /// Build the override map sent to the server (and later, on promotion,
    /// merged into the base index settings)
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(
            "enableSynonyms".to_string(),
            Value::Bool(self.enable_synonyms),
        );
        map.insert(
            "enableTypoTolerance".to_string(),
            Value::Bool(self.enable_typo_tolerance),
        );
        map.insert(
            "enablePersonalization".to_string(),
            Value::Bool(self.enable_personalization),
        );
        let filters = self.filters.trim();
        if !filters.is_empty() {
            map.insert("filters".to_string(), Value::String(filters.to_string()));
        }
        map
    }
}

/// Mutable experiment configuration owned by the creation workflow
#[derive(Clone, Debug)]
pub struct ExperimentDraft {
    pub name: String,
    pub index_name: String,
    pub primary_metric: PrimaryMetric,
    pub variant_mode: VariantMode,
    pub overrides: QueryOverrideDraft,
    pub variant_index_name: String,
    traffic_split_percent: u8,
    minimum_days: u32,
    step: u8,
}

impl Default for ExperimentDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl ExperimentDraft {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            index_name: String::new(),
            primary_metric: PrimaryMetric::ConversionRate,
            variant_mode: VariantMode::QueryOverride,
            overrides: QueryOverrideDraft::default(),
            variant_index_name: String::new(),
            traffic_split_percent: 50,
            minimum_days: 7,
            step: FIRST_STEP,
        }
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn traffic_split_percent(&self) -> u8 {
        self.traffic_split_percent
    }

    /// Clamped to [1, 99]
    pub fn set_traffic_split_percent(&mut self, percent: i64) {
        self.traffic_split_percent = percent.clamp(1, 99) as u8;
    }

    pub fn minimum_days(&self) -> u32 {
        self.minimum_days
    }

    /// Floored at 1
    pub fn set_minimum_days(&mut self, days: u32) {
        self.minimum_days = days.max(1);
    }

    /// Step-specific validity predicate
    ///
    /// Step 1 needs a trimmed non-empty name and a chosen index; step 2 is
    /// always valid in query-override mode, and in separate-index mode needs
    /// a non-empty variant index distinct from the base; steps 3 and 4 carry
    /// no constraints (split and days are clamped at the setters).
    pub fn can_advance(&self, from_step: u8) -> bool {
        match from_step {
            1 => !self.name.trim().is_empty() && !self.index_name.is_empty(),
            2 => match self.variant_mode {
                VariantMode::QueryOverride => true,
                VariantMode::SeparateIndex => self.validate_variant_index().is_ok(),
            },
            _ => true,
        }
    }

    /// Advance the step cursor, enforcing the current step's predicate
    pub fn advance(&mut self) -> Result<u8, ValidationError> {
        if !self.can_advance(self.step) {
            return Err(ValidationError::StepBlocked(self.step));
        }
        if self.step < LAST_STEP {
            self.step += 1;
        }
        Ok(self.step)
    }

    /// Move back one step; never blocked
    pub fn back(&mut self) -> u8 {
        if self.step > FIRST_STEP {
            self.step -= 1;
        }
        self.step
    }

    fn validate_variant_index(&self) -> Result<(), ValidationError> {
        let variant_index = self.variant_index_name.trim();
        if variant_index.is_empty() {
            return Err(ValidationError::EmptyVariantIndex);
        }
        if variant_index == self.index_name {
            return Err(ValidationError::VariantIndexSameAsBase(
                self.index_name.clone(),
            ));
        }
        Ok(())
    }

    /// Build the variant descriptor for the create call
    pub fn build_variant_payload(&self) -> VariantSpec {
        match self.variant_mode {
            VariantMode::QueryOverride => VariantSpec {
                name: "variant".to_string(),
                query_overrides: Some(self.overrides.to_map()),
                index_name: None,
            },
            VariantMode::SeparateIndex => VariantSpec {
                name: "variant".to_string(),
                query_overrides: None,
                index_name: Some(self.variant_index_name.trim().to_string()),
            },
        }
    }

    /// Produce the create-experiment request, re-validating every prior
    /// step's invariant regardless of the current step cursor
    pub fn finalize(&self) -> Result<CreateExperimentRequest, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.index_name.is_empty() {
            return Err(ValidationError::MissingIndex);
        }
        if self.variant_mode == VariantMode::SeparateIndex {
            self.validate_variant_index()?;
        }

        debug!(
            name = %self.name.trim(),
            index = %self.index_name,
            split_percent = self.traffic_split_percent,
            "Finalizing experiment draft"
        );

        Ok(CreateExperimentRequest {
            name: self.name.trim().to_string(),
            index_name: self.index_name.clone(),
            traffic_split: f64::from(self.traffic_split_percent) / 100.0,
            control: ControlSpec::default(),
            variant: self.build_variant_payload(),
            primary_metric: self.primary_metric.id().to_string(),
            minimum_days: self.minimum_days,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn valid_draft() -> ExperimentDraft {
        let mut draft = ExperimentDraft::new();
        draft.name = "synonyms off".to_string();
        draft.index_name = "products".to_string();
        draft
    }

    #[test]
    fn test_step_one_blocked_until_name_and_index() {
        let mut draft = ExperimentDraft::new();
        assert!(!draft.can_advance(1));
        assert_eq!(draft.advance(), Err(ValidationError::StepBlocked(1)));

        draft.name = "   ".to_string();
        draft.index_name = "products".to_string();
        assert!(!draft.can_advance(1), "whitespace-only name must not pass");

        draft.name = "synonyms off".to_string();
        assert!(draft.can_advance(1));
        assert_eq!(draft.advance().unwrap(), 2);
    }

    #[test]
    fn test_query_override_mode_step_two_always_valid() {
        let draft = valid_draft();
        assert_eq!(draft.variant_mode, VariantMode::QueryOverride);
        assert!(draft.can_advance(2));
    }

    #[test]
    fn test_separate_index_requires_distinct_non_empty_index() {
        let mut draft = valid_draft();
        draft.variant_mode = VariantMode::SeparateIndex;

        assert!(!draft.can_advance(2));

        draft.variant_index_name = "products".to_string();
        assert!(!draft.can_advance(2), "same index as base must not pass");

        draft.variant_index_name = "products_v2".to_string();
        assert!(draft.can_advance(2));
    }

    #[test]
    fn test_later_steps_always_advance() {
        let mut draft = valid_draft();
        draft.advance().unwrap();
        assert_eq!(draft.advance().unwrap(), 3);
        assert_eq!(draft.advance().unwrap(), 4);
        // Advancing from the last step stays put
        assert_eq!(draft.advance().unwrap(), 4);
        assert_eq!(draft.back(), 3);
    }

    #[test]
    fn test_setters_clamp_instead_of_failing() {
        let mut draft = valid_draft();
        draft.set_traffic_split_percent(0);
        assert_eq!(draft.traffic_split_percent(), 1);
        draft.set_traffic_split_percent(150);
        assert_eq!(draft.traffic_split_percent(), 99);
        draft.set_minimum_days(0);
        assert_eq!(draft.minimum_days(), 1);
    }

    #[test]
    fn test_variant_payload_includes_toggles_and_trimmed_filter() {
        let mut draft = valid_draft();
        draft.overrides.enable_synonyms = false;
        draft.overrides.filters = "  category:books ".to_string();

        let payload = draft.build_variant_payload();
        assert_eq!(payload.name, "variant");
        let overrides = payload.query_overrides.unwrap();
        assert_eq!(overrides["enableSynonyms"], false);
        assert_eq!(overrides["enableTypoTolerance"], true);
        assert_eq!(overrides["enablePersonalization"], false);
        assert_eq!(overrides["filters"], "category:books");
        assert!(payload.index_name.is_none());
    }

    #[test]
    fn test_variant_payload_omits_blank_filter() {
        let mut draft = valid_draft();
        draft.overrides.filters = "   ".to_string();
        let overrides = draft.build_variant_payload().query_overrides.unwrap();
        assert!(!overrides.contains_key("filters"));
        // The boolean toggles are always present
        assert_eq!(overrides.len(), 3);
    }

    #[test]
    fn test_variant_payload_separate_index() {
        let mut draft = valid_draft();
        draft.variant_mode = VariantMode::SeparateIndex;
        draft.variant_index_name = " products_v2 ".to_string();

        let payload = draft.build_variant_payload();
        assert!(payload.query_overrides.is_none());
        assert_eq!(payload.index_name.unwrap(), "products_v2");
    }

    #[test]
    fn test_finalize_converts_percent_to_fraction() {
        let mut draft = valid_draft();
        draft.set_traffic_split_percent(30);
        draft.set_minimum_days(14);
        draft.primary_metric = PrimaryMetric::RevenuePerSearch;

        let request = draft.finalize().unwrap();
        assert_eq!(request.name, "synonyms off");
        assert_eq!(request.index_name, "products");
        assert!((request.traffic_split - 0.30).abs() < f64::EPSILON);
        assert_eq!(request.control.name, "control");
        assert_eq!(request.primary_metric, "revenuePerSearch");
        assert_eq!(request.minimum_days, 14);
    }

    #[test]
    fn test_finalize_rechecks_earlier_steps() {
        // Defense in depth: even with the cursor on the review step, a
        // violated step-2 invariant fails finalize.
        let mut draft = valid_draft();
        draft.advance().unwrap();
        draft.advance().unwrap();
        draft.advance().unwrap();
        assert_eq!(draft.step(), 4);

        draft.variant_mode = VariantMode::SeparateIndex;
        draft.variant_index_name = "products".to_string();
        assert_eq!(
            draft.finalize().unwrap_err(),
            ValidationError::VariantIndexSameAsBase("products".to_string())
        );

        draft.name = String::new();
        assert_eq!(draft.finalize().unwrap_err(), ValidationError::EmptyName);
    }
}
