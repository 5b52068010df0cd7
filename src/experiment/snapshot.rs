//! Results snapshot produced by the statistics service
//!
//! The snapshot is read-only to the engine. All statistical figures
//! (z-scores, p-values, CUPED adjustment, SRM detection, Bayesian posterior,
//! interleaving) are computed upstream; the engine only derives gate flags,
//! notices and the conclusion payload from them. Missing optional sections
//! mean "not yet available", never an error.

use serde::{Deserialize, Serialize};

use super::record::{ConclusionRecord, Winner};

/// Per-arm aggregates and derived rates
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArmStats {
    pub searches: u64,
    pub users: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub revenue: f64,

    pub ctr: f64,
    pub conversion_rate: f64,
    pub revenue_per_search: f64,
    pub zero_result_rate: f64,
    pub abandonment_rate: f64,
    pub mean_click_rank: f64,
}

/// Readiness gate computed by the statistics service
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GateStats {
    pub minimum_n_reached: bool,
    pub minimum_days_reached: bool,
    /// Upstream's own `minimum_n_reached && minimum_days_reached`; the
    /// engine re-derives it from the two booleans rather than trusting it
    pub ready_to_read: bool,
    pub required_searches_per_arm: u64,
    pub current_searches_per_arm: u64,
    pub progress_pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_days_remaining: Option<f64>,
}

/// Frequentist significance result for the primary metric
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Significance {
    pub z_score: f64,
    pub p_value: f64,
    /// Achieved confidence in [0, 1]
    pub confidence: f64,
    pub significant: bool,
    pub relative_improvement: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Winner>,
}

/// Bayesian posterior summary
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bayesian {
    pub prob_variant_better: f64,
}

/// Team-draft interleaving analysis summary
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Interleaving {
    pub queries: u64,
    pub control_wins: u64,
    pub variant_wins: u64,
    pub ties: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preference: Option<Winner>,
}

/// Full results snapshot for one experiment
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResultsSnapshot {
    pub control: ArmStats,
    pub variant: ArmStats,
    pub gate: GateStats,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub significance: Option<Significance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bayesian: Option<Bayesian>,

    pub sample_ratio_mismatch: bool,
    pub cuped_applied: bool,

    #[serde(default)]
    pub guard_rail_alerts: Vec<String>,
    pub outlier_users_excluded: u64,
    pub no_stable_id_queries: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub interleaving: Option<Interleaving>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<ConclusionRecord>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_snapshot_parses_without_optional_sections() {
        // Before sample size is reached the service omits significance,
        // bayesian and interleaving entirely.
        let json = serde_json::json!({
            "control": {
                "searches": 120, "users": 80, "clicks": 30, "conversions": 4,
                "revenue": 51.0, "ctr": 0.25, "conversionRate": 0.033,
                "revenuePerSearch": 0.42, "zeroResultRate": 0.08,
                "abandonmentRate": 0.4, "meanClickRank": 2.7
            },
            "variant": {
                "searches": 118, "users": 78, "clicks": 35, "conversions": 5,
                "revenue": 60.0, "ctr": 0.29, "conversionRate": 0.042,
                "revenuePerSearch": 0.5, "zeroResultRate": 0.07,
                "abandonmentRate": 0.38, "meanClickRank": 2.5
            },
            "gate": {
                "minimumNReached": false, "minimumDaysReached": false,
                "readyToRead": false, "requiredSearchesPerArm": 10000,
                "currentSearchesPerArm": 118, "progressPct": 1.18
            },
            "sampleRatioMismatch": false,
            "cupedApplied": false,
            "guardRailAlerts": [],
            "outlierUsersExcluded": 0,
            "noStableIdQueries": 3
        });

        let snapshot: ResultsSnapshot = serde_json::from_value(json).unwrap();
        assert!(snapshot.significance.is_none());
        assert!(snapshot.bayesian.is_none());
        assert!(snapshot.interleaving.is_none());
        assert!(snapshot.conclusion.is_none());
        assert_eq!(snapshot.gate.required_searches_per_arm, 10000);
        assert!(snapshot.gate.estimated_days_remaining.is_none());
    }

    #[test]
    fn test_snapshot_parses_significance_with_winner() {
        let json = serde_json::json!({
            "control": {
                "searches": 20000, "users": 9000, "clicks": 5000,
                "conversions": 700, "revenue": 9100.0, "ctr": 0.25,
                "conversionRate": 0.035, "revenuePerSearch": 0.455,
                "zeroResultRate": 0.06, "abandonmentRate": 0.35,
                "meanClickRank": 2.4
            },
            "variant": {
                "searches": 20100, "users": 9050, "clicks": 5600,
                "conversions": 830, "revenue": 10900.0, "ctr": 0.278,
                "conversionRate": 0.041, "revenuePerSearch": 0.542,
                "zeroResultRate": 0.055, "abandonmentRate": 0.33,
                "meanClickRank": 2.2
            },
            "gate": {
                "minimumNReached": true, "minimumDaysReached": true,
                "readyToRead": true, "requiredSearchesPerArm": 10000,
                "currentSearchesPerArm": 20000, "progressPct": 100.0,
                "estimatedDaysRemaining": 0.0
            },
            "significance": {
                "zScore": 3.1, "pValue": 0.0019, "confidence": 0.9981,
                "significant": true, "relativeImprovement": 0.171,
                "winner": "variant"
            },
            "bayesian": { "probVariantBetter": 0.997 },
            "sampleRatioMismatch": false,
            "cupedApplied": true,
            "guardRailAlerts": ["zeroResultRate regressed on variant"],
            "outlierUsersExcluded": 12,
            "noStableIdQueries": 410
        });

        let snapshot: ResultsSnapshot = serde_json::from_value(json).unwrap();
        let sig = snapshot.significance.unwrap();
        assert!(sig.significant);
        assert_eq!(sig.winner, Some(Winner::Variant));
        assert!(snapshot.cuped_applied);
        assert_eq!(snapshot.guard_rail_alerts.len(), 1);
    }
}
