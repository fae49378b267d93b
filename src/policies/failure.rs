//! # Failure policies for units.
//!
//! [`FailurePolicy`] determines how a unit failure affects the rest of the process.
//!
//! - [`FailurePolicy::Isolate`] the unit is marked failed; other units keep running (default).
//! - [`FailurePolicy::FailFast`] the unit is marked failed and the orchestrator begins stopping.
//!
//! In both cases the failure is reported as [`EventKind::UnitFailed`](crate::EventKind::UnitFailed)
//! and surfaces from [`Orchestrator::wait`](crate::Orchestrator::wait) as
//! [`RuntimeError::UnitsFailed`](crate::RuntimeError::UnitsFailed).

/// Policy controlling the reaction to a failed unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Record the failure and keep the other units running (default).
    #[default]
    Isolate,
    /// Record the failure and trigger process-wide stopping.
    FailFast,
}

impl FailurePolicy {
    /// Returns true if a failure should trigger stopping.
    #[inline]
    pub fn stops_on_failure(&self) -> bool {
        matches!(self, FailurePolicy::FailFast)
    }
}
