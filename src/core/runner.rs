//! # Run one unit from spawn to completion.
//!
//! Normalizes every [`Unit`](crate::Unit) shape into the same sequence of
//! barrier releases and events.
//!
//! ## Event flow
//!
//! ```text
//! OneShot:    UnitStarting → f() → UnitReady → UnitStopped | UnitFailed
//! Reporting:  UnitStarting → f(ctx, ready) ─ ready.ready() → UnitReady
//!                                          └ return        → UnitStopped | UnitFailed
//! Bare:       UnitStarting → UnitReady → f(ctx) → UnitStopped | UnitFailed
//! ```
//!
//! ## Rules
//! - The init slot is always released **before** the shutdown slot.
//! - A reporting unit that returns without calling `ready()` gets its init slot
//!   released at return (with a warning), so `wait()` never hangs on it.
//! - Panics are caught here and reported as [`WorkerError::Panicked`].
//! - `Err(WorkerError::Canceled)` is a graceful stop, not a failure.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tokio_util::task::task_tracker::TaskTrackerToken;

use crate::core::Orchestrator;
use crate::error::{WorkerError, panic_info};
use crate::events::{Event, EventKind};
use crate::units::{Ready, ReadySlot, Work, WorkResult};

/// Drives `work` to completion, reporting to `orch`.
///
/// `tracked` is the unit's slot in the shutdown barrier; it is released when this returns.
pub(crate) async fn run_unit(
    orch: Arc<Orchestrator>,
    id: usize,
    name: Arc<str>,
    work: Work,
    ctx: CancellationToken,
    tracked: TaskTrackerToken,
) {
    orch.emit(Event::new(EventKind::UnitStarting).with_unit(name.clone()));

    let slot = {
        let orch = Arc::clone(&orch);
        let name = name.clone();
        ReadySlot::new(move || orch.mark_ready(id, &name))
    };

    let reporting = matches!(work, Work::Reporting(_));
    let res = match work {
        Work::OneShot(f) => catch(async move { f().await }).await,
        Work::Reporting(f) => {
            let ready = Ready::new(Arc::clone(&slot));
            catch(async move { f(ctx, ready).await }).await
        }
        Work::Bare(f) => {
            slot.release();
            catch(async move { f(ctx).await }).await
        }
    };

    if slot.release() && reporting {
        tracing::warn!(unit = %name, "returned without reporting readiness");
    }
    orch.finish(id, &name, res);
    drop(tracked);
}

/// Runs `fut`, converting a panic into [`WorkerError::Panicked`].
async fn catch<F>(fut: F) -> WorkResult
where
    F: Future<Output = WorkResult>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => Err(WorkerError::Panicked {
            info: panic_info(panic.as_ref()),
        }),
    }
}
