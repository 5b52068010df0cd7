//! Primary metric catalog and name normalization
//!
//! The statistics service is permitted to spell metric identifiers in either
//! camelCase or snake_case. Everything inside the engine works on the closed
//! `PrimaryMetric` enum; `resolve_metric` is the single ingress point that
//! maps external identifiers onto it. Unknown identifiers degrade to the raw
//! identifier as a display label with the CTR extractor — never an error.

use crate::experiment::ArmStats;

/// Supported primary metrics
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimaryMetric {
    Ctr,
    ConversionRate,
    RevenuePerSearch,
    ZeroResultRate,
    AbandonmentRate,
}

impl PrimaryMetric {
    /// Parse either accepted spelling of a metric identifier
    pub fn parse(id: &str) -> Option<Self> {
        match id {
            "ctr" | "clickThroughRate" | "click_through_rate" => Some(Self::Ctr),
            "conversionRate" | "conversion_rate" => Some(Self::ConversionRate),
            "revenuePerSearch" | "revenue_per_search" => Some(Self::RevenuePerSearch),
            "zeroResultRate" | "zero_result_rate" => Some(Self::ZeroResultRate),
            "abandonmentRate" | "abandonment_rate" => Some(Self::AbandonmentRate),
            _ => None,
        }
    }

    /// Canonical identifier used when sending a metric name to collaborators
    pub fn id(&self) -> &'static str {
        match self {
            Self::Ctr => "ctr",
            Self::ConversionRate => "conversionRate",
            Self::RevenuePerSearch => "revenuePerSearch",
            Self::ZeroResultRate => "zeroResultRate",
            Self::AbandonmentRate => "abandonmentRate",
        }
    }

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ctr => "Click-through rate",
            Self::ConversionRate => "Conversion rate",
            Self::RevenuePerSearch => "Revenue per search",
            Self::ZeroResultRate => "Zero-result rate",
            Self::AbandonmentRate => "Abandonment rate",
        }
    }

    /// Extract this metric's value from an arm's aggregates
    pub fn extract(&self, arm: &ArmStats) -> f64 {
        match self {
            Self::Ctr => arm.ctr,
            Self::ConversionRate => arm.conversion_rate,
            Self::RevenuePerSearch => arm.revenue_per_search,
            Self::ZeroResultRate => arm.zero_result_rate,
            Self::AbandonmentRate => arm.abandonment_rate,
        }
    }

    /// Is a higher value better for this metric?
    ///
    /// Zero-result and abandonment rates improve downward; the rest upward.
    pub fn higher_is_better(&self) -> bool {
        !matches!(self, Self::ZeroResultRate | Self::AbandonmentRate)
    }
}

/// A resolved metric: display label plus extraction behavior
///
/// `metric` is `None` for identifiers the catalog does not recognize; those
/// keep the raw identifier as the label and extract CTR as the fallback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub label: String,
    pub metric: Option<PrimaryMetric>,
}

impl MetricDescriptor {
    pub fn extract(&self, arm: &ArmStats) -> f64 {
        match self.metric {
            Some(metric) => metric.extract(arm),
            None => arm.ctr,
        }
    }
}

/// Normalize a metric identifier at the results boundary
///
/// Accepts both spelling conventions; never fails.
pub fn resolve_metric(id: &str) -> MetricDescriptor {
    match PrimaryMetric::parse(id) {
        Some(metric) => MetricDescriptor {
            label: metric.label().to_string(),
            metric: Some(metric),
        },
        None => MetricDescriptor {
            label: id.to_string(),
            metric: None,
        },
    }
}
