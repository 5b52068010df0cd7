//! Server-owned experiment records and wire types
//!
//! These types mirror the shapes exchanged with the experiment persistence
//! store and the statistics service. The engine only reads and writes the
//! fields that matter for decisions; everything else passes through.

pub mod record;
pub mod snapshot;

pub use record::{
    ConclusionPayload, ConclusionRecord, ControlSpec, CreateExperimentRequest, Experiment,
    ExperimentStatus, VariantSpec, Winner,
};
pub use snapshot::{
    ArmStats, Bayesian, GateStats, Interleaving, ResultsSnapshot, Significance,
};
