//! Error types used by the gracevisor runtime and its workers.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`] - errors raised by the orchestrator itself (registration
//!   misconfiguration, failed units reported by [`Orchestrator::wait`](crate::Orchestrator::wait)).
//! - [`WorkerError`] - errors returned (or panics caught) from a worker body.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging.

use thiserror::Error;

/// # Errors produced by the orchestrator.
///
/// Registration errors are misconfigurations: the unit was never counted or
/// spawned, so the caller decides whether the process should go on.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A unit was registered with an empty display name.
    #[error("unit name must not be empty")]
    InvalidName,

    /// A unit with the same display name is already registered.
    #[error("unit {name:?} is already registered")]
    DuplicateUnit {
        /// Name of the rejected unit.
        name: String,
    },

    /// Registration attempted after shutdown began.
    #[error("orchestrator is stopping; unit {name:?} rejected")]
    Closed {
        /// Name of the rejected unit.
        name: String,
    },

    /// Shutdown completed, but some units finished with an error.
    #[error("{} unit(s) failed: {failed:?}", failed.len())]
    UnitsFailed {
        /// Names of the failed units, in registration order.
        failed: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use gracevisor::RuntimeError;
    ///
    /// let err = RuntimeError::Closed { name: "db".into() };
    /// assert_eq!(err.as_label(), "runtime_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::InvalidName => "runtime_invalid_name",
            RuntimeError::DuplicateUnit { .. } => "runtime_duplicate_unit",
            RuntimeError::Closed { .. } => "runtime_closed",
            RuntimeError::UnitsFailed { .. } => "runtime_units_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::InvalidName => "empty unit name".to_string(),
            RuntimeError::DuplicateUnit { name } => format!("duplicate unit: {name}"),
            RuntimeError::Closed { name } => format!("registration closed: {name}"),
            RuntimeError::UnitsFailed { failed } => format!("failed units={failed:?}"),
        }
    }
}

/// # Errors produced by worker execution.
///
/// Workers return `Result<(), WorkerError>`. A panic inside a worker is caught
/// at the unit boundary and converted to [`WorkerError::Panicked`].
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// Worker logic failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Worker panicked; the panic was caught by the orchestrator.
    #[error("panicked: {info}")]
    Panicked {
        /// Panic payload, when it was a string.
        info: String,
    },

    /// Worker observed cancellation and gave up early.
    ///
    /// Treated as a graceful stop, not a failure.
    #[error("context cancelled")]
    Canceled,
}

impl WorkerError {
    /// Shorthand for [`WorkerError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        WorkerError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use gracevisor::WorkerError;
    ///
    /// assert_eq!(WorkerError::fail("boom").as_label(), "worker_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Fail { .. } => "worker_failed",
            WorkerError::Panicked { .. } => "worker_panicked",
            WorkerError::Canceled => "worker_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            WorkerError::Fail { error } => format!("error: {error}"),
            WorkerError::Panicked { info } => format!("panic: {info}"),
            WorkerError::Canceled => "context cancelled".to_string(),
        }
    }

    /// Whether this outcome marks the unit as failed.
    ///
    /// Returns `false` for [`WorkerError::Canceled`].
    pub fn is_failure(&self) -> bool {
        !matches!(self, WorkerError::Canceled)
    }
}

/// Extracts a printable message from a caught panic payload.
pub(crate) fn panic_info(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_info_reads_str_and_string_payloads() {
        let a = std::panic::catch_unwind(|| panic!("plain")).unwrap_err();
        assert_eq!(panic_info(a.as_ref()), "plain");

        let b = std::panic::catch_unwind(|| panic!("formatted {}", 7)).unwrap_err();
        assert_eq!(panic_info(b.as_ref()), "formatted 7");
    }

    #[test]
    fn units_failed_message_lists_names() {
        let err = RuntimeError::UnitsFailed {
            failed: vec!["db".into(), "cache".into()],
        };
        assert_eq!(err.to_string(), r#"2 unit(s) failed: ["db", "cache"]"#);
        assert_eq!(err.as_message(), r#"failed units=["db", "cache"]"#);
    }

    #[test]
    fn canceled_is_not_a_failure() {
        assert!(!WorkerError::Canceled.is_failure());
        assert!(WorkerError::fail("x").is_failure());
        assert!(
            WorkerError::Panicked {
                info: "boom".into()
            }
            .is_failure()
        );
    }
}
