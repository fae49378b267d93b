//! # LogWriter - lifecycle event printer
//!
//! A subscriber that renders incoming [`Event`]s through `tracing`.
//! The orchestrator installs it unless [`Config::silent`](crate::Config::silent) is set.
//!
//! ## Example output
//! ```text
//! INFO gracevisor: start unit="db"
//! INFO gracevisor: ready unit="db"
//! INFO gracevisor: ---- all ready ----
//! INFO gracevisor: ---- shutdown ---- cause="SIGINT"
//! INFO gracevisor: stop unit="db"
//! WARN gracevisor: failed unit="cache" err="panicked: boom"
//! INFO gracevisor: ---- bye ----
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let unit = e.unit.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::UnitStarting => tracing::info!(unit, "start"),
            EventKind::UnitReady => tracing::debug!(unit, "ready"),
            EventKind::UnitStopped => tracing::info!(unit, "stop"),
            EventKind::UnitFailed => tracing::warn!(unit, err = reason, "failed"),
            EventKind::AllReady => tracing::info!("---- all ready ----"),
            EventKind::ShutdownRequested => tracing::info!(cause = reason, "---- shutdown ----"),
            EventKind::AllStopped => tracing::debug!("all units stopped"),
            EventKind::HookFailed => {
                tracing::warn!(hook = unit, err = reason, "shutdown hook failed")
            }
            EventKind::Bye => tracing::info!("---- bye ----"),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
