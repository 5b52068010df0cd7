//! Winner declaration workflow
//!
//! Models the declare → confirm → decide → submit sequence as a tagged
//! union of states so illegal combinations (e.g. submitting without an open
//! decision, concluding twice) are unrepresentable. The submit operation
//! performs the ordered promote → conclude collaborator calls: a conclusion
//! must never claim `promoted: true` unless the settings update actually
//! succeeded first.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ExperimentStore, IndexSettingsStore, StoreError};
use crate::experiment::{
    ConclusionPayload, ConclusionRecord, Experiment, ResultsSnapshot, Winner,
};

use super::gate::{evaluate_gate, GateFlags};
use super::metric::resolve_metric;

/// Workflow failures
#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("experiment is not ready for a decision")]
    NotDeclarable,

    #[error("operation '{0}' is not valid in the current workflow state")]
    InvalidTransition(&'static str),

    #[error("promotion is not available for this variant")]
    PromotionUnavailable,

    #[error("a decision workflow is already open for experiment {0}")]
    AlreadyOpen(String),

    #[error(transparent)]
    Collaborator(#[from] StoreError),
}

/// Operator's winner selection in the decision view
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WinnerChoice {
    Control,
    Variant,
    None,
}

impl WinnerChoice {
    fn to_winner(self) -> Option<Winner> {
        match self {
            Self::Control => Some(Winner::Control),
            Self::Variant => Some(Winner::Variant),
            Self::None => None,
        }
    }
}

/// Editable decision view-model
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionForm {
    pub winner: WinnerChoice,
    pub reason: String,
    pub promote: bool,
}

/// Workflow state
#[derive(Clone, Debug)]
pub enum DecisionState {
    /// No decision in progress
    Idle,
    /// Sample size reached before the minimum window elapsed; the operator
    /// must explicitly acknowledge the novelty-effect risk
    SoftGateConfirm,
    /// Decision dialog open with editable form
    DecisionOpen(DecisionForm),
    /// Promote/conclude calls in flight; edits and snapshot refreshes are
    /// not applied
    Submitting(DecisionForm),
    /// Conclusion persisted, dialog dismissed
    Concluded(ConclusionRecord),
}

/// One open decision workflow for one experiment
///
/// Exclusively owned by the surface that opened it; use `WorkflowRegistry`
/// to enforce one workflow per experiment id.
pub struct DecisionWorkflow {
    experiment: Experiment,
    snapshot: ResultsSnapshot,
    state: DecisionState,
}

impl DecisionWorkflow {
    pub fn new(experiment: Experiment, snapshot: ResultsSnapshot) -> Self {
        Self {
            experiment,
            snapshot,
            state: DecisionState::Idle,
        }
    }

    pub fn state(&self) -> &DecisionState {
        &self.state
    }

    pub fn experiment(&self) -> &Experiment {
        &self.experiment
    }

    /// Current gate flags for this experiment and snapshot
    pub fn gate_flags(&self) -> GateFlags {
        evaluate_gate(self.experiment.status, &self.snapshot.gate)
    }

    /// Promotion is offered only for a query-override variant with a
    /// non-empty override map; copying settings to a separate variant index
    /// is not a defined semantic.
    pub fn can_promote(&self) -> bool {
        self.experiment.promotable_overrides().is_some()
    }

    /// The open form, if the dialog is open or submitting
    pub fn form(&self) -> Option<&DecisionForm> {
        match &self.state {
            DecisionState::DecisionOpen(form) | DecisionState::Submitting(form) => Some(form),
            _ => None,
        }
    }

    /// Operator clicked "declare winner"
    ///
    /// Hard-ready opens the decision dialog directly; soft-ready interposes
    /// the mandatory confirmation step first.
    pub fn declare(&mut self) -> Result<(), DecisionError> {
        if !matches!(self.state, DecisionState::Idle) {
            return Err(DecisionError::InvalidTransition("declare"));
        }
        let flags = self.gate_flags();
        if !flags.can_declare {
            return Err(DecisionError::NotDeclarable);
        }
        if flags.hard_ready {
            info!(experiment = %self.experiment.id, "Opening decision dialog");
            self.state = DecisionState::DecisionOpen(self.default_form());
        } else {
            info!(
                experiment = %self.experiment.id,
                "Sample size reached before minimum duration, asking for confirmation"
            );
            self.state = DecisionState::SoftGateConfirm;
        }
        Ok(())
    }

    /// Operator acknowledged the soft-gate risk and chose to proceed
    pub fn confirm_soft_gate(&mut self) -> Result<(), DecisionError> {
        if !matches!(self.state, DecisionState::SoftGateConfirm) {
            return Err(DecisionError::InvalidTransition("confirm_soft_gate"));
        }
        info!(experiment = %self.experiment.id, "Soft gate acknowledged, opening decision dialog");
        self.state = DecisionState::DecisionOpen(self.default_form());
        Ok(())
    }

    /// Close the confirmation or decision dialog, discarding edits
    ///
    /// Not available while a submit is in flight — it runs to completion or
    /// failure.
    pub fn cancel(&mut self) -> Result<(), DecisionError> {
        match self.state {
            DecisionState::Idle
            | DecisionState::SoftGateConfirm
            | DecisionState::DecisionOpen(_) => {
                self.state = DecisionState::Idle;
                Ok(())
            }
            DecisionState::Submitting(_) | DecisionState::Concluded(_) => {
                Err(DecisionError::InvalidTransition("cancel"))
            }
        }
    }

    pub fn set_winner(&mut self, winner: WinnerChoice) -> Result<(), DecisionError> {
        match &mut self.state {
            DecisionState::DecisionOpen(form) => {
                form.winner = winner;
                Ok(())
            }
            _ => Err(DecisionError::InvalidTransition("set_winner")),
        }
    }

    pub fn set_reason(&mut self, reason: String) -> Result<(), DecisionError> {
        match &mut self.state {
            DecisionState::DecisionOpen(form) => {
                form.reason = reason;
                Ok(())
            }
            _ => Err(DecisionError::InvalidTransition("set_reason")),
        }
    }

    /// Toggle promotion; rejected when promotion is not offered
    pub fn set_promote(&mut self, promote: bool) -> Result<(), DecisionError> {
        if promote && !self.can_promote() {
            return Err(DecisionError::PromotionUnavailable);
        }
        match &mut self.state {
            DecisionState::DecisionOpen(form) => {
                form.promote = promote;
                Ok(())
            }
            _ => Err(DecisionError::InvalidTransition("set_promote")),
        }
    }

    /// Apply a fresher results snapshot from the background poller
    ///
    /// Ignored while submitting so the in-flight decision is computed from
    /// the snapshot the operator was looking at.
    pub fn apply_snapshot(&mut self, snapshot: ResultsSnapshot) {
        if matches!(self.state, DecisionState::Submitting(_)) {
            debug!(
                experiment = %self.experiment.id,
                "Submit in flight, holding back fresher snapshot"
            );
            return;
        }
        self.snapshot = snapshot;
    }

    /// Submit the decision: promote first when requested, then conclude
    ///
    /// Either collaborator failure leaves the dialog open with the
    /// operator's edits intact so the submit can be retried. The settings
    /// collaborator is never called unless promotion was both requested and
    /// available.
    pub async fn submit(
        &mut self,
        settings: &dyn IndexSettingsStore,
        store: &dyn ExperimentStore,
    ) -> Result<ConclusionRecord, DecisionError> {
        let form = match std::mem::replace(&mut self.state, DecisionState::Idle) {
            DecisionState::DecisionOpen(form) => form,
            other => {
                self.state = other;
                return Err(DecisionError::InvalidTransition("submit"));
            }
        };
        self.state = DecisionState::Submitting(form.clone());

        let promote_applied = form.promote && self.can_promote();
        if promote_applied {
            // Overrides are present whenever can_promote holds
            let overrides = match self.experiment.promotable_overrides() {
                Some(overrides) => overrides,
                None => {
                    self.state = DecisionState::DecisionOpen(form);
                    return Err(DecisionError::PromotionUnavailable);
                }
            };
            if let Err(e) = settings
                .apply_overrides(&self.experiment.index_name, overrides)
                .await
            {
                warn!(
                    experiment = %self.experiment.id,
                    error = %e,
                    "Promotion failed, aborting submit before conclude"
                );
                self.state = DecisionState::DecisionOpen(form);
                return Err(e.into());
            }
            info!(
                experiment = %self.experiment.id,
                index = %self.experiment.index_name,
                "Variant overrides promoted to base index"
            );
        }

        let metric = resolve_metric(&self.experiment.primary_metric);
        let significance = self.snapshot.significance.as_ref();
        let payload = ConclusionPayload {
            winner: form.winner.to_winner(),
            reason: form.reason.clone(),
            control_metric: metric.extract(&self.snapshot.control),
            variant_metric: metric.extract(&self.snapshot.variant),
            confidence: significance.map(|s| s.confidence).unwrap_or(0.0),
            significant: significance.map(|s| s.significant).unwrap_or(false),
            promoted: promote_applied,
        };

        match store.conclude(&self.experiment.id, &payload).await {
            Ok(updated) => {
                let record = updated.conclusion.unwrap_or(ConclusionRecord {
                    winner: payload.winner,
                    reason: payload.reason,
                    control_metric: payload.control_metric,
                    variant_metric: payload.variant_metric,
                    confidence: payload.confidence,
                    significant: payload.significant,
                    promoted: payload.promoted,
                });
                self.experiment.status = updated.status;
                self.experiment.ended_at = updated.ended_at;
                self.state = DecisionState::Concluded(record.clone());
                info!(
                    experiment = %self.experiment.id,
                    winner = ?record.winner,
                    promoted = record.promoted,
                    "Decision submitted"
                );
                Ok(record)
            }
            Err(e) => {
                warn!(
                    experiment = %self.experiment.id,
                    error = %e,
                    "Conclude call failed, decision stays open for retry"
                );
                self.state = DecisionState::DecisionOpen(form);
                Err(e.into())
            }
        }
    }

    /// Defaults for the freshly opened decision dialog
    ///
    /// Winner mirrors the significance result; the reason is a template the
    /// operator can freely edit; promotion starts unchecked.
    fn default_form(&self) -> DecisionForm {
        let winner = match self.snapshot.significance.as_ref().and_then(|s| s.winner) {
            Some(Winner::Control) => WinnerChoice::Control,
            Some(Winner::Variant) => WinnerChoice::Variant,
            None => WinnerChoice::None,
        };
        DecisionForm {
            winner,
            reason: self.default_reason(),
            promote: false,
        }
    }

    fn default_reason(&self) -> String {
        let metric = resolve_metric(&self.experiment.primary_metric);
        match self.snapshot.significance.as_ref() {
            Some(sig) if sig.significant => {
                let side = match sig.winner {
                    Some(Winner::Control) => "Control",
                    Some(Winner::Variant) => "Variant",
                    // Significant but no winner reported upstream; leave the
                    // reason to the operator rather than claim either way
                    None => return String::new(),
                };
                format!(
                    "{side} won on {} with {:.1}% confidence",
                    metric.label,
                    sig.confidence * 100.0
                )
            }
            Some(_) => "No significant difference between arms".to_string(),
            None => String::new(),
        }
    }

    #[cfg(test)]
    fn force_state(&mut self, state: DecisionState) {
        self.state = state;
    }
}

/// Enforces at most one open decision workflow per experiment id
///
/// The registry hands out RAII tickets; dropping a ticket releases the id.
#[derive(Clone, Default)]
pub struct WorkflowRegistry {
    open: Arc<Mutex<HashSet<String>>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim an experiment id for a new workflow
    pub fn open(&self, experiment_id: &str) -> Result<WorkflowTicket, DecisionError> {
        let mut open = self
            .open
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !open.insert(experiment_id.to_string()) {
            return Err(DecisionError::AlreadyOpen(experiment_id.to_string()));
        }
        Ok(WorkflowTicket {
            experiment_id: experiment_id.to_string(),
            open: self.open.clone(),
        })
    }
}

/// Exclusive claim on an experiment's decision workflow
pub struct WorkflowTicket {
    experiment_id: String,
    open: Arc<Mutex<HashSet<String>>>,
}

impl Drop for WorkflowTicket {
    fn drop(&mut self) {
        let mut open = self
            .open
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        open.remove(&self.experiment_id);
    }
}
