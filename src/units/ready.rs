//! # Readiness handle for reporting units.
//!
//! A reporting unit receives a [`Ready`] handle next to its cancellation token
//! and calls [`Ready::ready`] once its own bootstrap is done. The call releases
//! the unit's slot in the init barrier, which is what
//! [`Orchestrator::ready`](crate::Orchestrator::ready) waits on.
//!
//! ## Rules
//! - `ready()` consumes the handle: a unit cannot report twice.
//! - Dropping the handle without reporting does **not** release the slot.
//!   A unit that keeps running without reporting blocks `Orchestrator::ready` forever.
//! - When the unit returns without having reported, the runner releases the slot
//!   itself (before the shutdown slot), so `wait()` can still complete.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Shared readiness state of one unit.
///
/// `release` is idempotent: only the first call runs the notification, and a
/// concurrent second caller returns only after that notification finished.
pub(crate) struct ReadySlot {
    reported: Mutex<bool>,
    notify: Box<dyn Fn() + Send + Sync>,
}

impl ReadySlot {
    pub(crate) fn new(notify: impl Fn() + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            reported: Mutex::new(false),
            notify: Box::new(notify),
        })
    }

    /// Marks the unit ready. Returns `false` if it already was.
    pub(crate) fn release(&self) -> bool {
        let mut reported = self.reported.lock().unwrap_or_else(PoisonError::into_inner);
        if *reported {
            return false;
        }
        (self.notify)();
        *reported = true;
        true
    }

    pub(crate) fn is_released(&self) -> bool {
        *self.reported.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle a reporting unit uses to signal that it finished bootstrapping.
///
/// ## Example
/// ```rust
/// use gracevisor::{Unit, WorkerError};
///
/// let unit = Unit::reporting("listener", |ctx, ready| async move {
///     // bind sockets, open files...
///     ready.ready();
///     ctx.cancelled().await;
///     // close everything
///     Ok::<(), WorkerError>(())
/// });
/// assert_eq!(unit.name(), "listener");
/// ```
pub struct Ready {
    slot: Arc<ReadySlot>,
}

impl Ready {
    pub(crate) fn new(slot: Arc<ReadySlot>) -> Self {
        Self { slot }
    }

    /// Reports readiness to the orchestrator.
    pub fn ready(self) {
        self.slot.release();
    }
}

impl fmt::Debug for Ready {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ready")
            .field("reported", &self.slot.is_released())
            .finish()
    }
}
