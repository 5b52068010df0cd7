//! koe — search experiment lifecycle and decision engine
//!
//! Runs controlled experiments against a search index: an operator defines
//! a control and a variant treatment, splits live traffic between them,
//! waits for an adequate sample, and decides whether to keep the variant.
//!
//! The crate covers the experiment lifecycle and the statistical-gating
//! decision machinery:
//!
//! - [`engine::estimator`] — pre-launch runtime prediction for a traffic split
//! - [`engine::draft`] — wizard-backed experiment configuration and validation
//! - [`engine::gate`] — decision-readiness flags from a results snapshot
//! - [`engine::decision`] — the declare/confirm/submit workflow with ordered
//!   promote-then-conclude collaborator calls
//! - [`engine::presentation`] — data-quality notices and display figures
//! - [`engine::poller`] — background snapshot refresh
//!
//! Statistical figures themselves (significance, CUPED, SRM, Bayesian
//! posterior, interleaving) are computed by an external statistics service
//! and only consumed here; see [`api`] for the collaborator contracts.

pub mod api;
pub mod engine;
pub mod experiment;
