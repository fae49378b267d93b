//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the fan-out [`SubscriberSet`]
//! and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Orchestrator / unit runner ── emit(Event) ──► SubscriberSet
//!                                                   │
//!                                     ┌─────────────┼─────────────┐
//!                                     ▼             ▼             ▼
//!                                 LogWriter      Custom A      Custom B
//! ```

mod log;
mod set;

pub use log::LogWriter;
pub use set::{Subscribe, SubscriberSet};
