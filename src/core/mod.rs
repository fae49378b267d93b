//! Runtime core: orchestration and lifecycle.
//!
//! The public API from this module is [`Orchestrator`] (plus its builder and
//! config), which registers units, tracks readiness and drives graceful shutdown.
//!
//! Internal modules:
//! - [`orchestrator`]: phases, barriers, hooks, terminal actions;
//! - [`runner`]: runs one unit and normalizes its shape into barrier releases and events;
//! - [`registry`]: unit records and admission;
//! - [`latch`]: counted barrier built on a watch channel;
//! - [`shutdown`]: cross-platform shutdown signal handling;
//! - [`builder`]: subscriber wiring and signal watcher startup.

mod builder;
mod config;
mod latch;
mod orchestrator;
mod registry;
mod runner;
mod shutdown;

pub use builder::OrchestratorBuilder;
pub use config::Config;
pub use orchestrator::{Orchestrator, Phase};
pub use registry::{UnitInfo, UnitStatus};
pub use shutdown::{Signal, StopCause, wait_for_shutdown_signal};
