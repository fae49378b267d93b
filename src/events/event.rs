//! # Lifecycle events emitted by the orchestrator and its units.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Unit events**: one unit's lifecycle (starting, ready, stopped, failed)
//! - **Phase events**: orchestrator transitions (all ready, shutdown requested, all stopped)
//! - **Terminal events**: hook failures and the final `Bye` marker
//!
//! The [`Event`] struct carries the metadata: timestamp, sequence number, unit name and reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Each subscriber receives events in emission order (one FIFO queue per subscriber);
//! events of concurrently running units may interleave, `seq` gives the exact order.
//!
//! ## Example
//! ```rust
//! use gracevisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::UnitFailed)
//!     .with_unit("db")
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::UnitFailed);
//! assert_eq!(ev.unit.as_deref(), Some("db"));
//! assert_eq!(ev.reason.as_deref(), Some("connection refused"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Unit events ===
    /// Unit task was spawned and is about to run.
    ///
    /// Sets:
    /// - `unit`: unit name
    UnitStarting,

    /// Unit reported readiness (or was assumed ready, for bare units).
    ///
    /// Sets:
    /// - `unit`: unit name
    UnitReady,

    /// Unit returned normally or after observing cancellation.
    ///
    /// Sets:
    /// - `unit`: unit name
    UnitStopped,

    /// Unit returned an error or panicked.
    ///
    /// Sets:
    /// - `unit`: unit name
    /// - `reason`: error message
    UnitFailed,

    // === Phase events ===
    /// The init barrier released: every registered unit is ready.
    ///
    /// Published at most once.
    AllReady,

    /// Stopping began.
    ///
    /// Sets:
    /// - `reason`: cause (`manual`, a signal name, or `unit failed: <name>`)
    ShutdownRequested,

    /// The shutdown barrier released: every unit returned.
    AllStopped,

    // === Terminal events ===
    /// A shutdown hook panicked; remaining hooks still run.
    ///
    /// Sets:
    /// - `unit`: `hook#<index>`
    /// - `reason`: panic message
    HookFailed,

    /// Terminal actions finished; the exit policy is applied next.
    Bye,
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the unit, if applicable.
    pub unit: Option<Arc<str>>,
    /// Human-readable reason (errors, shutdown cause).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            unit: None,
            reason: None,
        }
    }

    /// Attaches a unit name.
    #[inline]
    pub fn with_unit(mut self, unit: impl Into<Arc<str>>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn is_unit_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::UnitStarting
                | EventKind::UnitReady
                | EventKind::UnitStopped
                | EventKind::UnitFailed
        )
    }
}
