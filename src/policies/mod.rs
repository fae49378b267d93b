//! Failure handling policies.
//!
//! This module groups the knobs that decide what the orchestrator does when a
//! unit fails (returns an error or panics).
//!
//! ## Contents
//! - [`FailurePolicy`] isolate the failed unit, or begin shutdown (fail fast)
//!
//! ## Quick wiring
//! ```text
//! Config { failure: FailurePolicy, .. }
//!      └─► the orchestrator applies it after a unit returns Err / panics:
//!           - Isolate  → record the failure, keep the rest running
//!           - FailFast → record the failure, trigger Stopping
//! ```
//!
//! Workers are never restarted, whatever the policy.

mod failure;

pub use failure::FailurePolicy;
