//! Experiment lifecycle and decision engine
//!
//! Everything with algorithmic content lives here: runtime estimation
//! before launch, draft validation during creation, gate evaluation and the
//! winner-declaration workflow once results flow in.

pub mod decision;
pub mod draft;
pub mod estimator;
pub mod gate;
pub mod metric;
pub mod poller;
pub mod presentation;

pub use decision::{
    DecisionError, DecisionForm, DecisionState, DecisionWorkflow, WinnerChoice, WorkflowRegistry,
    WorkflowTicket,
};
pub use draft::{ExperimentDraft, QueryOverrideDraft, ValidationError, VariantMode};
pub use estimator::{estimate_runtime, RuntimeEstimate, RuntimeWarning};
pub use gate::{evaluate_gate, GateFlags};
pub use metric::{resolve_metric, MetricDescriptor, PrimaryMetric};
pub use poller::{spawn_snapshot_poller, SnapshotPoller, DEFAULT_POLL_INTERVAL};
pub use presentation::{derive_notices, metric_figures, MetricFigures, ResultsNotices};
