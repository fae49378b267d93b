//! # Unit registry.
//!
//! Keeps one record per registered unit (name, shape, status) in registration order,
//! and the "closed" flag that rejects registrations once stopping began.
//!
//! ## Rules
//! - Admission and closing are serialized on one mutex: a unit is either counted
//!   into both barriers **before** stopping begins, or rejected.
//! - Status moves forward only: `Pending → Ready → Stopped | Failed`.
//! - Names are unique and non-empty.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::RuntimeError;
use crate::units::UnitKind;

/// Lifecycle status of one unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnitStatus {
    /// Spawned, readiness not reported yet.
    Pending,
    /// Readiness reported (or assumed, for bare units).
    Ready,
    /// Returned normally or after cancellation.
    Stopped,
    /// Returned an error or panicked.
    Failed(String),
}

impl UnitStatus {
    /// True once the unit's execution returned.
    pub fn is_finished(&self) -> bool {
        matches!(self, UnitStatus::Stopped | UnitStatus::Failed(_))
    }
}

/// Snapshot of one unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitInfo {
    /// Display name.
    pub name: String,
    /// Invocation shape.
    pub kind: UnitKind,
    /// Current status.
    pub status: UnitStatus,
}

struct State {
    units: Vec<UnitInfo>,
    closed: bool,
}

pub(crate) struct Registry {
    state: Mutex<State>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State {
                units: Vec::new(),
                closed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a new unit and runs `count` under the registry lock.
    ///
    /// Returns the unit id (its registration index) and whatever `count` produced.
    pub(crate) fn admit<T>(
        &self,
        name: &str,
        kind: UnitKind,
        count: impl FnOnce() -> T,
    ) -> Result<(usize, T), RuntimeError> {
        if name.is_empty() {
            return Err(RuntimeError::InvalidName);
        }

        let mut state = self.lock();
        if state.closed {
            return Err(RuntimeError::Closed { name: name.into() });
        }
        if state.units.iter().any(|u| u.name == name) {
            return Err(RuntimeError::DuplicateUnit { name: name.into() });
        }

        let counted = count();
        state.units.push(UnitInfo {
            name: name.into(),
            kind,
            status: UnitStatus::Pending,
        });
        Ok((state.units.len() - 1, counted))
    }

    /// Rejects every later registration.
    pub(crate) fn close(&self) {
        self.lock().closed = true;
    }

    /// Updates a unit's status. A finished status is final.
    pub(crate) fn set_status(&self, id: usize, status: UnitStatus) {
        if let Some(unit) = self.lock().units.get_mut(id) {
            if !unit.status.is_finished() {
                unit.status = status;
            }
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<UnitInfo> {
        self.lock().units.clone()
    }

    /// Names of units whose execution has not returned yet.
    pub(crate) fn running(&self) -> Vec<String> {
        self.lock()
            .units
            .iter()
            .filter(|u| !u.status.is_finished())
            .map(|u| u.name.clone())
            .collect()
    }

    /// Names of failed units, in registration order.
    pub(crate) fn failed(&self) -> Vec<String> {
        self.lock()
            .units
            .iter()
            .filter(|u| matches!(u.status, UnitStatus::Failed(_)))
            .map(|u| u.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn admit_validates_and_counts() {
        let reg = Registry::new();
        let counted = Cell::new(0);
        let bump = || {
            counted.set(counted.get() + 1);
            counted.get()
        };

        assert_eq!(reg.admit("db", UnitKind::Reporting, bump), Ok((0, 1)));
        assert_eq!(
            reg.admit("", UnitKind::Bare, bump),
            Err(RuntimeError::InvalidName)
        );
        assert_eq!(
            reg.admit("db", UnitKind::Bare, bump),
            Err(RuntimeError::DuplicateUnit { name: "db".into() })
        );
        assert_eq!(counted.get(), 1);

        reg.close();
        assert_eq!(
            reg.admit("cache", UnitKind::Bare, bump),
            Err(RuntimeError::Closed {
                name: "cache".into()
            })
        );
        assert_eq!(counted.get(), 1);
    }

    #[test]
    fn running_and_failed_follow_status() {
        let reg = Registry::new();
        let (a, ()) = reg.admit("a", UnitKind::OneShot, || {}).unwrap();
        let (b, ()) = reg.admit("b", UnitKind::Bare, || {}).unwrap();
        let (c, ()) = reg.admit("c", UnitKind::Reporting, || {}).unwrap();

        reg.set_status(a, UnitStatus::Stopped);
        reg.set_status(b, UnitStatus::Failed("boom".into()));
        reg.set_status(c, UnitStatus::Ready);

        assert_eq!(reg.running(), vec!["c".to_string()]);
        assert_eq!(reg.failed(), vec!["b".to_string()]);
        assert_eq!(reg.snapshot()[2].status, UnitStatus::Ready);

        reg.set_status(a, UnitStatus::Ready);
        assert_eq!(reg.snapshot()[0].status, UnitStatus::Stopped);
    }
}
