//! Lifecycle events.
//!
//! This module holds the event **data model** published by the orchestrator and
//! the unit runner. Delivery is done by [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//!
//! ## Quick reference
//! - **Publishers**: `Orchestrator` (phase events, hooks, `Bye`), `core::runner` (unit events).
//! - **Consumers**: every [`Subscribe`](crate::Subscribe) in the set, including
//!   [`LogWriter`](crate::LogWriter) unless the orchestrator is silent.

mod event;

pub use event::{Event, EventKind};
