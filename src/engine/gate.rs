//! Readiness gate evaluation
//!
//! Pure derivation of decision-readiness flags from an experiment's status
//! and the gate section of a results snapshot. No side effects, no errors;
//! all gate fields are present once an experiment has left draft.

use crate::experiment::{ExperimentStatus, GateStats};

/// Decision-readiness flags
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateFlags {
    /// Status permits declaring a winner at all (running or stopped)
    pub eligible_to_decide: bool,
    /// Both sample size and minimum observation window are satisfied
    pub hard_ready: bool,
    /// Sample size is adequate but the minimum window has not elapsed;
    /// declaring now risks novelty-effect bias and needs confirmation
    pub soft_ready: bool,
    /// A declare action is permitted (hard without friction, soft only
    /// through the explicit confirmation step)
    pub can_declare: bool,
}

/// Derive gate flags from experiment status and snapshot gate
///
/// `hard_ready` is re-derived from the two upstream booleans instead of
/// trusting the service's own `ready_to_read` aggregate.
pub fn evaluate_gate(status: ExperimentStatus, gate: &GateStats) -> GateFlags {
    let eligible_to_decide = matches!(
        status,
        ExperimentStatus::Running | ExperimentStatus::Stopped
    );
    let hard_ready = gate.minimum_n_reached && gate.minimum_days_reached;
    let soft_ready = gate.minimum_n_reached && !gate.minimum_days_reached;
    GateFlags {
        eligible_to_decide,
        hard_ready,
        soft_ready,
        can_declare: eligible_to_decide && (hard_ready || soft_ready),
    }
}
