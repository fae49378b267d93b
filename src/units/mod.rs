//! # Worker units and their shapes.
//!
//! This module provides the worker-side types:
//! - [`Unit`] - a named worker in one of the supported shapes
//! - [`UnitKind`] - the shape, for introspection
//! - [`Ready`] - readiness handle given to reporting units
//! - [`Service`] - trait for struct-backed reporting units

mod ready;
mod service;
mod unit;

pub(crate) use ready::ReadySlot;
pub(crate) use unit::Work;

pub use ready::Ready;
pub use service::Service;
pub use unit::{Unit, UnitKind, WorkFuture, WorkResult};
