//! Pre-launch runtime estimation
//!
//! Predicts, for a chosen traffic split, how many calendar days each of four
//! canonical effect-size scenarios needs to reach an adequate sample. The
//! baseline day counts were computed offline for a 50/50 split; skewing the
//! split slows the experiment by the ratio between 50% and the smaller arm,
//! because sample adequacy is limited by whichever arm fills slowest.

/// A canonical effect-size scenario with its 50/50 baseline duration
#[derive(Clone, Copy, Debug)]
pub struct RuntimeScenario {
    pub name: &'static str,
    /// Expected relative improvement, e.g. 5.0 for +5%
    pub relative_effect_pct: f64,
    /// Days to adequate sample at a 50/50 split
    pub baseline_days: u32,
}

/// Static scenario table. Durations grow sharply as the detectable effect
/// shrinks; the second entry is the "typical" scenario the warning policy
/// keys off.
pub const RUNTIME_SCENARIOS: [RuntimeScenario; 4] = [
    RuntimeScenario {
        name: "large",
        relative_effect_pct: 10.0,
        baseline_days: 4,
    },
    RuntimeScenario {
        name: "typical",
        relative_effect_pct: 5.0,
        baseline_days: 25,
    },
    RuntimeScenario {
        name: "small",
        relative_effect_pct: 2.0,
        baseline_days: 150,
    },
    RuntimeScenario {
        name: "minimal",
        relative_effect_pct: 1.0,
        baseline_days: 600,
    },
];

/// Typical-scenario estimate above this many days shows a warning
pub const LONG_RUNTIME_DAYS: u32 = 90;

/// Typical-scenario estimate above this many days shows the danger variant
pub const VERY_LONG_RUNTIME_DAYS: u32 = 365;

/// Warning severity derived from the typical scenario's estimate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuntimeWarning {
    /// Typical estimate exceeds 90 days
    Long,
    /// Typical estimate exceeds a full year
    VeryLong,
}

/// Estimate for a single scenario at the chosen split
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScenarioEstimate {
    pub name: &'static str,
    pub estimated_days: u32,
}

/// Full estimation result
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeEstimate {
    pub scenarios: [ScenarioEstimate; 4],
    pub warning: Option<RuntimeWarning>,
}

impl RuntimeEstimate {
    /// The "typical" scenario estimate the warning policy is based on
    pub fn typical_days(&self) -> u32 {
        self.scenarios[1].estimated_days
    }
}

/// Estimate experiment runtime for a traffic split
///
/// `split_percent` is the variant's share of traffic. Out-of-range values
/// are clamped to [1, 99], never rejected. The estimate is symmetric in the
/// split: a 90/10 experiment is exactly as slow as a 10/90 one, both being
/// bottlenecked by the same 10% arm.
pub fn estimate_runtime(split_percent: i64) -> RuntimeEstimate {
    let split = split_percent.clamp(1, 99);
    let bottleneck = split.min(100 - split);
    let scale = 50.0 / bottleneck as f64;

    let mut scenarios = [ScenarioEstimate {
        name: "",
        estimated_days: 0,
    }; 4];
    for (slot, scenario) in scenarios.iter_mut().zip(RUNTIME_SCENARIOS.iter()) {
        *slot = ScenarioEstimate {
            name: scenario.name,
            estimated_days: (scenario.baseline_days as f64 * scale).round() as u32,
        };
    }

    let typical = scenarios[1].estimated_days;
    let warning = if typical > VERY_LONG_RUNTIME_DAYS {
        Some(RuntimeWarning::VeryLong)
    } else if typical > LONG_RUNTIME_DAYS {
        Some(RuntimeWarning::Long)
    } else {
        None
    };

    RuntimeEstimate { scenarios, warning }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_even_split_matches_baseline_table() {
        let estimate = estimate_runtime(50);
        for (got, want) in estimate.scenarios.iter().zip(RUNTIME_SCENARIOS.iter()) {
            assert_eq!(got.estimated_days, want.baseline_days);
        }
        assert!(estimate.warning.is_none());
    }

    #[test]
    fn test_bottleneck_symmetry_over_full_range() {
        // 90/10 and 10/90 share the same 10% bottleneck arm and must produce
        // identical estimates, not merely "larger split is faster".
        for split in 1..=99 {
            assert_eq!(
                estimate_runtime(split),
                estimate_runtime(100 - split),
                "asymmetry at split {split}"
            );
        }
    }

    #[test]
    fn test_ten_percent_split_scales_by_five() {
        let estimate = estimate_runtime(10);
        // typical baseline 25d * (50/10) = 125d
        assert_eq!(estimate.typical_days(), 125);
        assert_eq!(estimate.warning, Some(RuntimeWarning::Long));

        // Mirror split: identical figures via the same bottleneck rule
        let mirrored = estimate_runtime(90);
        assert_eq!(mirrored.typical_days(), 125);
        assert_eq!(mirrored.warning, Some(RuntimeWarning::Long));
    }

    #[test]
    fn test_extreme_split_triggers_danger_warning() {
        // bottleneck 1% -> scale 50 -> typical 1250d
        let estimate = estimate_runtime(1);
        assert_eq!(estimate.typical_days(), 1250);
        assert_eq!(estimate.warning, Some(RuntimeWarning::VeryLong));
    }

    #[test]
    fn test_no_warning_at_or_below_ninety_days() {
        // bottleneck 20% -> scale 2.5 -> typical 62.5 -> 63d, no warning
        let estimate = estimate_runtime(20);
        assert_eq!(estimate.typical_days(), 63);
        assert!(estimate.warning.is_none());

        // bottleneck 14% -> typical round(89.28) = 89d, still no warning
        assert!(estimate_runtime(14).warning.is_none());

        // bottleneck 13% -> typical round(96.15) = 96d, warning
        assert_eq!(estimate_runtime(13).warning, Some(RuntimeWarning::Long));
    }

    #[test]
    fn test_invalid_split_is_clamped_not_rejected() {
        assert_eq!(estimate_runtime(0), estimate_runtime(1));
        assert_eq!(estimate_runtime(-40), estimate_runtime(1));
        assert_eq!(estimate_runtime(100), estimate_runtime(99));
        assert_eq!(estimate_runtime(250), estimate_runtime(99));
    }

    #[test]
    fn test_larger_bottleneck_is_never_slower() {
        let mut previous = estimate_runtime(1).typical_days();
        for split in 2..=50 {
            let current = estimate_runtime(split).typical_days();
            assert!(current <= previous, "estimate grew at split {split}");
            previous = current;
        }
    }
}
