//! # gracevisor
//!
//! **Gracevisor** is a small process-lifecycle orchestrator for async Rust services.
//!
//! It starts a set of named units, tells you when all of them finished bootstrapping,
//! and on a termination signal (or an explicit cancel) stops them in an orderly way:
//! one cancellation for everyone, wait for every unit to return, run shutdown hooks,
//! flush the event stream, then apply the exit policy.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │     Unit     │   │     Unit     │   │     Unit     │
//!     │  (oneshot)   │   │ (reporting)  │   │    (bare)    │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Orchestrator                                                     │
//! │  - root CancellationToken (units get child tokens)                │
//! │  - init barrier      (ready() waits on it)                        │
//! │  - shutdown barrier  (wait() waits on it)                         │
//! │  - Registry          (names, shapes, statuses)                    │
//! │  - shutdown hooks    (run once, in order)                         │
//! │  - SubscriberSet     (fans out to LogWriter + custom subscribers) │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │  run_unit()  │   │  run_unit()  │   │  run_unit()  │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ UnitStarting     │ UnitStarting     │ UnitStarting    │ AllReady
//!      │ UnitReady        │ UnitReady        │ UnitReady       │ ShutdownRequested
//!      │ UnitStopped      │ UnitFailed       │ UnitStopped     │ AllStopped, Bye
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                 SubscriberSet (per-subscriber queues)             │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Idle ──register()──► Running ──cancel() / SIGINT / SIGTERM / SIGHUP / fail-fast──► Stopping
//!
//! Stopping:
//!   ├─► registry closed (late register() → RuntimeError::Closed)
//!   ├─► publish ShutdownRequested{ cause }
//!   └─► root token cancelled → every unit's ctx fires
//!
//! wait():
//!   ├─► init barrier      (every unit ready or returned)
//!   ├─► shutdown barrier  (every unit returned)
//!   └─► AllStopped → hooks → Bye → drain subscribers → linger → exit policy ──► Stopped
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                    |
//! |-------------------|---------------------------------------------------------------|---------------------------------------|
//! | **Orchestration** | Register units, await readiness, stop gracefully.             | [`Orchestrator`], [`Phase`]           |
//! | **Units**         | Oneshot, reporting, bare and struct-backed workers.           | [`Unit`], [`Ready`], [`Service`]      |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, auditing).      | [`Subscribe`], [`LogWriter`]          |
//! | **Policies**      | Isolate a failed unit or stop everything.                     | [`FailurePolicy`]                     |
//! | **Errors**        | Typed errors for registration, shutdown and unit execution.   | [`RuntimeError`], [`WorkerError`]     |
//! | **Configuration** | Exit code, signals, logging, linger.                          | [`Config`]                            |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use gracevisor::{Config, Orchestrator, Unit, WorkerError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config { silent: true, signals: false, ..Config::default() };
//!     let orch = Orchestrator::new(cfg);
//!
//!     orch.register(Unit::oneshot("migrate", || async {
//!         Ok::<(), WorkerError>(())
//!     }))?;
//!     orch.register(Unit::reporting("http", |ctx, ready| async move {
//!         tokio::time::sleep(Duration::from_millis(10)).await; // bind, warm caches...
//!         ready.ready();
//!         ctx.cancelled().await;
//!         Ok(())
//!     }))?;
//!     orch.on_shutdown(|| println!("closing database pool"));
//!
//!     orch.ready().await;
//!     // Normally: orch.wait().await? and let SIGTERM do the rest.
//!     orch.cancel().await?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod policies;
mod subscribers;
mod units;

// ---- Public re-exports ----

pub use core::{
    Config, Orchestrator, OrchestratorBuilder, Phase, Signal, StopCause, UnitInfo, UnitStatus,
    wait_for_shutdown_signal,
};
pub use error::{RuntimeError, WorkerError};
pub use events::{Event, EventKind};
pub use policies::FailurePolicy;
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use units::{Ready, Service, Unit, UnitKind, WorkFuture, WorkResult};
