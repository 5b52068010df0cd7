//! Read-only projections of a results snapshot for display
//!
//! Only the invariant-bearing derivations live here: data-quality notices
//! and the handful of formatting rules other surfaces must reproduce.
//! Missing optional snapshot sections degrade to "notice absent", never an
//! error.

use crate::experiment::ResultsSnapshot;

use super::metric::resolve_metric;

/// Fraction of unstable-ID queries above which data quality is flagged
pub const UNSTABLE_ID_NOTICE_THRESHOLD: f64 = 0.05;

/// Diagnostic notices derived from a snapshot
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultsNotices {
    /// Queries without a stable user id, as a fraction of all searches
    pub unstable_id_fraction: f64,
    /// True once the unstable-ID fraction exceeds 5%
    pub low_data_quality: bool,
    /// Number of excluded outlier users, when any were excluded
    pub outliers_excluded: Option<u64>,
    /// Guard-rail regression alerts, verbatim from the statistics service
    pub guard_rail_alerts: Vec<String>,
    /// Traffic split observed does not match the configured split
    pub sample_ratio_mismatch: bool,
    /// Variance reduction was applied to the significance figures
    pub cuped_applied: bool,
}

/// Derive display notices from a snapshot
pub fn derive_notices(snapshot: &ResultsSnapshot) -> ResultsNotices {
    let total_searches = snapshot.control.searches + snapshot.variant.searches;
    let unstable_id_fraction = if total_searches == 0 {
        0.0
    } else {
        snapshot.no_stable_id_queries as f64 / total_searches as f64
    };

    ResultsNotices {
        unstable_id_fraction,
        low_data_quality: unstable_id_fraction > UNSTABLE_ID_NOTICE_THRESHOLD,
        outliers_excluded: (snapshot.outlier_users_excluded > 0)
            .then_some(snapshot.outlier_users_excluded),
        guard_rail_alerts: snapshot.guard_rail_alerts.clone(),
        sample_ratio_mismatch: snapshot.sample_ratio_mismatch,
        cuped_applied: snapshot.cuped_applied,
    }
}

/// Display-ready primary metric figures for both arms
#[derive(Clone, Debug, PartialEq)]
pub struct MetricFigures {
    pub label: String,
    pub control: String,
    pub variant: String,
    pub relative_improvement: Option<String>,
    /// Whether the observed change favors the variant, accounting for the
    /// metric's direction of improvement (zero-result and abandonment
    /// rates improve downward)
    pub improvement_favorable: Option<bool>,
}

/// Format the primary metric for both arms
///
/// The metric identifier goes through the same normalization as everywhere
/// else; either spelling produces identical figures.
pub fn metric_figures(metric_id: &str, snapshot: &ResultsSnapshot) -> MetricFigures {
    let metric = resolve_metric(metric_id);
    let currency = metric
        .metric
        .is_some_and(|m| m == super::metric::PrimaryMetric::RevenuePerSearch);
    // Unknown metrics fall back to the CTR extractor, which improves upward
    let higher_is_better = metric.metric.map_or(true, |m| m.higher_is_better());

    let render = |value: f64| {
        if currency {
            format_currency(value)
        } else {
            format_percent(value)
        }
    };

    let significance = snapshot.significance.as_ref();
    MetricFigures {
        label: metric.label.clone(),
        control: render(metric.extract(&snapshot.control)),
        variant: render(metric.extract(&snapshot.variant)),
        relative_improvement: significance
            .map(|s| format_relative_improvement(s.relative_improvement)),
        improvement_favorable: significance.map(|s| {
            if higher_is_better {
                s.relative_improvement > 0.0
            } else {
                s.relative_improvement < 0.0
            }
        }),
    }
}

/// Format a rate in [0, 1] as a percentage with two decimals
pub fn format_percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

/// Format a monetary amount with two decimals
pub fn format_currency(amount: f64) -> String {
    format!("${amount:.2}")
}

/// Format a signed relative improvement, e.g. "+5.2%"
pub fn format_relative_improvement(relative: f64) -> String {
    format!("{:+.1}%", relative * 100.0)
}
