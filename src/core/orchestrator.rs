//! # Orchestrator: registration, readiness, and graceful shutdown.
//!
//! The [`Orchestrator`] owns the root cancellation token, the init and shutdown
//! barriers, the unit registry, the shutdown hooks and the subscriber set.
//!
//! ## Phases
//! ```text
//! Idle ──register()──► Running ──cancel() / signal / fail-fast──► Stopping ──wait()──► Stopped
//! ```
//!
//! ## Shutdown path
//! ```text
//! cancel() ─┐
//! signal   ─┼─► begin_stop(cause)      first caller only: close registry,
//! fail-fast┘                           publish ShutdownRequested, fire token
//!
//! wait()      first call spawns the driver task; every caller awaits the `stopped` token
//!
//! driver (one task, independent of any caller's future):
//!   1. init barrier        → every unit ready (or returned)
//!   2. root token          → stopping began
//!   3. shutdown barrier    → every unit returned
//!   4. terminal actions, exactly once:
//!        AllStopped → hooks in order → Bye → drain subscribers → linger → exit policy
//! ```
//!
//! Dropping a `wait()` future (`select!`, `timeout`, an aborted task) does not
//! interrupt the sequence; a later `wait()` or `cancel()` picks up the same outcome.
//!
//! ## Barriers
//! - The init barrier starts with one reserved slot for the registration phase,
//!   released by the first `ready()` / `wait()` / `cancel()`. Until then no caller
//!   can observe "ready", even with zero units spawned.
//! - `register()` counts the unit into both barriers before it returns, under the
//!   same lock that stopping takes, so a unit is either fully counted or rejected.
//! - The shutdown barrier is a [`TaskTracker`]: each unit holds a tracker token
//!   until it returned, and stopping closes the tracker.
//!
//! ## Example
//! ```rust
//! use gracevisor::{Config, Orchestrator, Unit, WorkerError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config { silent: true, signals: false, ..Config::default() };
//!     let orch = Orchestrator::new(cfg);
//!
//!     orch.register(Unit::reporting("server", |ctx, ready| async move {
//!         ready.ready();
//!         ctx.cancelled().await;
//!         Ok::<(), WorkerError>(())
//!     }))?;
//!     orch.on_shutdown(|| println!("flushed"));
//!
//!     orch.ready().await;
//!     orch.cancel().await?;
//!     Ok(())
//! }
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::core::builder::OrchestratorBuilder;
use crate::core::latch::Latch;
use crate::core::registry::{Registry, UnitInfo, UnitStatus};
use crate::core::runner;
use crate::core::shutdown::StopCause;
use crate::core::Config;
use crate::error::{RuntimeError, panic_info};
use crate::events::{Event, EventKind};
use crate::subscribers::SubscriberSet;
use crate::units::{Unit, WorkResult};

type Hook = Box<dyn FnOnce() + Send + 'static>;

/// Lifecycle phase of an [`Orchestrator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Phase {
    /// Constructed, no unit registered yet.
    Idle = 0,
    /// At least one unit registered.
    Running = 1,
    /// Token fired; units are winding down.
    Stopping = 2,
    /// Terminal actions ran.
    Stopped = 3,
}

impl Phase {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Phase::Idle,
            1 => Phase::Running,
            2 => Phase::Stopping,
            _ => Phase::Stopped,
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Coordinates unit startup, readiness, cancellation and shutdown for one process.
pub struct Orchestrator {
    cfg: Config,
    /// Root token; units and collaborators only ever get child tokens.
    token: CancellationToken,
    /// Fired once terminal actions completed.
    stopped: CancellationToken,
    init: Latch,
    tracker: TaskTracker,
    registry: Registry,
    hooks: Mutex<Vec<Hook>>,
    subs: Mutex<Option<SubscriberSet>>,
    cause: Mutex<Option<StopCause>>,
    exit_code: AtomicI32,
    phase: AtomicU8,

    // one-shot transition flags
    stopping: AtomicBool,
    waiting: AtomicBool,
    finished: AtomicBool,
    sealed: AtomicBool,
    announced: AtomicBool,
}

impl Orchestrator {
    /// Returns a builder for configuring subscribers.
    pub fn builder(cfg: Config) -> OrchestratorBuilder {
        OrchestratorBuilder::new(cfg)
    }

    /// Builds an orchestrator with default subscribers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(cfg: Config) -> Arc<Self> {
        OrchestratorBuilder::new(cfg).build()
    }

    pub(crate) fn new_internal(cfg: Config, subs: SubscriberSet) -> Self {
        let exit_code = AtomicI32::new(cfg.exit_code);
        Self {
            cfg,
            token: CancellationToken::new(),
            stopped: CancellationToken::new(),
            init: Latch::new(1),
            tracker: TaskTracker::new(),
            registry: Registry::new(),
            hooks: Mutex::new(Vec::new()),
            subs: Mutex::new(Some(subs)),
            cause: Mutex::new(None),
            exit_code,
            phase: AtomicU8::new(Phase::Idle as u8),
            stopping: AtomicBool::new(false),
            waiting: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            sealed: AtomicBool::new(false),
            announced: AtomicBool::new(false),
        }
    }

    // ---------------------------
    // Registration
    // ---------------------------

    /// Registers and spawns a unit.
    ///
    /// Returns once the unit is counted into both barriers. Rejects empty and
    /// duplicate names, and any registration after stopping began.
    ///
    /// Must be called from within a tokio runtime.
    pub fn register(self: &Arc<Self>, unit: Unit) -> Result<(), RuntimeError> {
        let kind = unit.kind();
        let (name, work) = unit.into_parts();

        let (id, tracked) = self
            .registry
            .admit(&name, kind, || {
                self.init.add(1);
                self.tracker.token()
            })
            .inspect_err(|e| tracing::error!(unit = %name, error = %e, "registration rejected"))?;

        let _ = self.phase.compare_exchange(
            Phase::Idle as u8,
            Phase::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );

        let ctx = self.token.child_token();
        tokio::spawn(runner::run_unit(
            Arc::clone(self),
            id,
            Arc::from(&*name),
            work,
            ctx,
            tracked,
        ));
        Ok(())
    }

    /// Registers units in order, stopping at the first rejected one.
    ///
    /// Units registered before the error keep running.
    pub fn register_all(
        self: &Arc<Self>,
        units: impl IntoIterator<Item = Unit>,
    ) -> Result<(), RuntimeError> {
        units.into_iter().try_for_each(|unit| self.register(unit))
    }

    /// Appends a hook run once after every unit returned.
    ///
    /// Hooks run in append order on the task driving [`wait`](Self::wait); a
    /// panicking hook is reported and the next one still runs. Hooks appended
    /// after terminal actions began are dropped.
    pub fn on_shutdown(&self, hook: impl FnOnce() + Send + 'static) {
        let mut hooks = lock(&self.hooks);
        if self.finished.load(Ordering::Acquire) {
            tracing::warn!("shutdown hook registered after shutdown; ignored");
            return;
        }
        hooks.push(Box::new(hook));
    }

    // ---------------------------
    // Control
    // ---------------------------

    /// Waits until every registered unit reported readiness.
    ///
    /// A reporting unit that never calls `ready()` (and never returns) blocks this forever.
    pub async fn ready(&self) {
        self.seal();
        self.init.wait().await;
        if !self.announced.swap(true, Ordering::AcqRel) {
            self.emit(Event::new(EventKind::AllReady));
        }
    }

    /// Alias of [`ready`](Self::ready).
    pub async fn done(&self) {
        self.ready().await
    }

    /// Begins stopping (once) and waits for the full shutdown sequence.
    pub async fn cancel(self: &Arc<Self>) -> Result<(), RuntimeError> {
        self.begin_stop(StopCause::Manual);
        self.wait().await
    }

    /// Alias of [`cancel`](Self::cancel).
    pub async fn stop(self: &Arc<Self>) -> Result<(), RuntimeError> {
        self.cancel().await
    }

    /// Begins stopping without waiting.
    ///
    /// Returns `false` if stopping had already begun.
    pub fn request_stop(&self) -> bool {
        self.begin_stop(StopCause::Manual)
    }

    /// Waits through Stopping → Stopped and applies the exit policy.
    ///
    /// Blocks until stopping begins (signal, [`cancel`](Self::cancel), fail-fast unit).
    /// Concurrent and repeated calls all return after the same, single terminal sequence,
    /// which runs on its own task: dropping this future does not abort it.
    ///
    /// Returns [`RuntimeError::UnitsFailed`] if any unit failed. With a non-zero
    /// exit code the process exits instead of returning.
    pub async fn wait(self: &Arc<Self>) -> Result<(), RuntimeError> {
        self.seal();
        if !self.waiting.swap(true, Ordering::AcqRel) {
            let orch = Arc::clone(self);
            tokio::spawn(async move { orch.drive().await });
        }
        self.stopped.cancelled().await;
        self.outcome()
    }

    /// Alias of [`wait`](Self::wait).
    pub async fn shutdown(self: &Arc<Self>) -> Result<(), RuntimeError> {
        self.wait().await
    }

    /// Sets the exit status applied after shutdown (`0` = return normally).
    pub fn set_exit(&self, code: i32) {
        self.exit_code.store(code, Ordering::Release);
    }

    /// Returns a token that fires when stopping begins.
    ///
    /// It is a child of the root token: cancelling it does not stop the orchestrator.
    pub fn context(&self) -> CancellationToken {
        self.token.child_token()
    }

    // ---------------------------
    // Introspection
    // ---------------------------

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Why stopping began, if it did.
    pub fn cause(&self) -> Option<StopCause> {
        lock(&self.cause).clone()
    }

    /// Snapshot of every registered unit, in registration order.
    pub fn units(&self) -> Vec<UnitInfo> {
        self.registry.snapshot()
    }

    /// Names of units that have not returned yet.
    pub fn running(&self) -> Vec<String> {
        self.registry.running()
    }

    /// Configured exit status.
    pub fn exit_code(&self) -> i32 {
        self.exit_code.load(Ordering::Acquire)
    }

    // ---------------------------
    // Internals
    // ---------------------------

    pub(crate) fn stopped_token(&self) -> CancellationToken {
        self.stopped.clone()
    }

    /// Releases the reserved registration slot of the init barrier (once).
    fn seal(&self) {
        if !self.sealed.swap(true, Ordering::AcqRel) {
            self.init.done();
        }
    }

    /// Idle/Running → Stopping. Only the first caller has any effect.
    pub(crate) fn begin_stop(&self, cause: StopCause) -> bool {
        if self.stopping.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.registry.close();
        self.tracker.close();
        *lock(&self.cause) = Some(cause.clone());
        self.phase.fetch_max(Phase::Stopping as u8, Ordering::AcqRel);

        self.emit(Event::new(EventKind::ShutdownRequested).with_reason(cause.to_string()));
        self.token.cancel();
        true
    }

    pub(crate) fn emit(&self, ev: Event) {
        if let Some(set) = lock(&self.subs).as_ref() {
            set.emit(&ev);
        }
    }

    /// Called by the runner when a unit becomes ready.
    pub(crate) fn mark_ready(&self, id: usize, name: &str) {
        self.registry.set_status(id, UnitStatus::Ready);
        self.emit(Event::new(EventKind::UnitReady).with_unit(name));
        self.init.done();
    }

    /// Called by the runner when a unit returned, before its shutdown slot is released.
    pub(crate) fn finish(&self, id: usize, name: &str, res: WorkResult) {
        match res {
            Err(e) if e.is_failure() => {
                let reason = e.to_string();
                self.registry.set_status(id, UnitStatus::Failed(reason.clone()));
                self.emit(
                    Event::new(EventKind::UnitFailed)
                        .with_unit(name)
                        .with_reason(reason),
                );
                if self.cfg.failure.stops_on_failure() {
                    self.begin_stop(StopCause::UnitFailed(name.to_string()));
                }
            }
            _ => {
                self.registry.set_status(id, UnitStatus::Stopped);
                self.emit(Event::new(EventKind::UnitStopped).with_unit(name));
            }
        }
    }

    /// Stopping → Stopped. Runs once, on the task spawned by the first `wait()`.
    async fn drive(&self) {
        self.init.wait().await;
        self.token.cancelled().await;
        self.tracker.wait().await;
        self.terminate().await;
    }

    /// Terminal actions, exactly once.
    async fn terminate(&self) {
        if self.finished.swap(true, Ordering::AcqRel) {
            return;
        }
        self.emit(Event::new(EventKind::AllStopped));

        let hooks = std::mem::take(&mut *lock(&self.hooks));
        for (i, hook) in hooks.into_iter().enumerate() {
            if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(hook)) {
                self.emit(
                    Event::new(EventKind::HookFailed)
                        .with_unit(format!("hook#{i}"))
                        .with_reason(panic_info(panic.as_ref())),
                );
            }
        }
        self.emit(Event::new(EventKind::Bye));

        let subs = lock(&self.subs).take();
        if let Some(set) = subs {
            set.shutdown().await;
        }
        if let Some(delay) = self.cfg.linger_delay() {
            tokio::time::sleep(delay).await;
        }

        self.phase.store(Phase::Stopped as u8, Ordering::Release);

        let code = self.exit_code();
        if code != 0 {
            std::process::exit(code);
        }
        self.stopped.cancel();
    }

    fn outcome(&self) -> Result<(), RuntimeError> {
        let failed = self.registry.failed();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(RuntimeError::UnitsFailed { failed })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;
    use crate::policies::FailurePolicy;
    use crate::subscribers::Subscribe;
    use crate::units::{Ready, Service, UnitKind};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::time::{Instant, sleep, timeout};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Event>>);

    impl Recorder {
        fn count(&self, kind: EventKind) -> usize {
            self.0.lock().unwrap().iter().filter(|e| e.kind == kind).count()
        }

        fn kinds_for(&self, unit: &str) -> Vec<EventKind> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.is_unit_event() && e.unit.as_deref() == Some(unit))
                .map(|e| e.kind)
                .collect()
        }

        fn kinds(&self) -> Vec<EventKind> {
            self.0.lock().unwrap().iter().map(|e| e.kind).collect()
        }
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().unwrap().push(ev.clone());
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    fn quiet() -> Config {
        Config {
            silent: true,
            signals: false,
            ..Config::default()
        }
    }

    fn build(cfg: Config) -> (Arc<Orchestrator>, Arc<Recorder>) {
        let rec = Arc::new(Recorder::default());
        let orch = Orchestrator::builder(cfg)
            .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
            .build();
        (orch, rec)
    }

    fn blocker(name: &'static str) -> Unit {
        Unit::bare(name, |ctx| async move {
            ctx.cancelled().await;
            Ok(())
        })
    }

    #[tokio::test(start_paused = true)]
    async fn oneshot_units_are_ready_without_delay() {
        let (orch, _rec) = build(quiet());
        let ran = Arc::new(AtomicUsize::new(0));

        for name in ["a", "b", "c"] {
            let ran = ran.clone();
            orch.register(Unit::oneshot(name, move || async move {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();
        }

        let start = Instant::now();
        orch.ready().await;
        assert!(start.elapsed() < Duration::from_millis(1));
        assert_eq!(ran.load(Ordering::SeqCst), 3);

        orch.cancel().await.unwrap();
        assert_eq!(orch.phase(), Phase::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn reporting_unit_gates_ready_and_wait() {
        let (orch, _rec) = build(quiet());
        orch.register(Unit::reporting("slow", |ctx, ready| async move {
            sleep(Duration::from_millis(100)).await;
            ready.ready();
            ctx.cancelled().await;
            sleep(Duration::from_millis(500)).await;
            Ok(())
        }))
        .unwrap();

        let start = Instant::now();
        orch.ready().await;
        let to_ready = start.elapsed();
        assert!(to_ready >= Duration::from_millis(100));
        assert!(to_ready < Duration::from_millis(150));

        let start = Instant::now();
        orch.cancel().await.unwrap();
        let to_stop = start.elapsed();
        assert!(to_stop >= Duration::from_millis(500));
        assert!(to_stop < Duration::from_millis(550));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_cancel_runs_one_transition() {
        let (orch, rec) = build(quiet());
        let hook_runs = Arc::new(AtomicUsize::new(0));
        orch.register(blocker("db")).unwrap();
        {
            let hook_runs = hook_runs.clone();
            orch.on_shutdown(move || {
                hook_runs.fetch_add(1, Ordering::SeqCst);
            });
        }

        let a = tokio::spawn({
            let orch = orch.clone();
            async move { orch.cancel().await }
        });
        let b = tokio::spawn({
            let orch = orch.clone();
            async move { orch.cancel().await }
        });
        assert_eq!(a.await.unwrap(), Ok(()));
        assert_eq!(b.await.unwrap(), Ok(()));

        // A third, late call is a no-op.
        assert_eq!(orch.cancel().await, Ok(()));
        assert!(!orch.request_stop());

        assert_eq!(rec.count(EventKind::ShutdownRequested), 1);
        assert_eq!(rec.count(EventKind::Bye), 1);
        assert_eq!(hook_runs.load(Ordering::SeqCst), 1);
        assert_eq!(orch.cause(), Some(StopCause::Manual));
    }

    #[tokio::test(start_paused = true)]
    async fn hooks_run_in_order_after_units_finish() {
        let (orch, rec) = build(quiet());
        let finished = Arc::new(AtomicUsize::new(0));
        let log = Arc::new(Mutex::new(Vec::<String>::new()));

        for (name, delay) in [("a", 10), ("b", 30)] {
            let finished = finished.clone();
            orch.register(Unit::bare(name, move |ctx| async move {
                ctx.cancelled().await;
                sleep(Duration::from_millis(delay)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();
        }

        for hook in ["h1", "h2"] {
            let (log, finished) = (log.clone(), finished.clone());
            orch.on_shutdown(move || {
                let mut log = log.lock().unwrap();
                log.push(format!("{hook}:start:{}", finished.load(Ordering::SeqCst)));
                log.push(format!("{hook}:end"));
            });
        }

        orch.cancel().await.unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["h1:start:2", "h1:end", "h2:start:2", "h2:end"]
        );

        let kinds = rec.kinds();
        let all_stopped = kinds.iter().position(|k| *k == EventKind::AllStopped).unwrap();
        assert_eq!(kinds.last(), Some(&EventKind::Bye));
        let stopped_before = kinds[..all_stopped]
            .iter()
            .filter(|k| **k == EventKind::UnitStopped)
            .count();
        assert_eq!(stopped_before, 2);
    }

    struct Cache(Arc<AtomicUsize>);

    #[async_trait]
    impl Service for Cache {
        async fn run(&self, ctx: CancellationToken, ready: Ready) -> WorkResult {
            ready.ready();
            ctx.cancelled().await;
            sleep(Duration::from_millis(20)).await;
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn wait_returns_after_every_shape_finished() {
        let (orch, rec) = build(quiet());
        let exited = Arc::new(AtomicUsize::new(0));

        let e = exited.clone();
        orch.register(Unit::oneshot("once", move || async move {
            e.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .unwrap();

        let e = exited.clone();
        orch.register(Unit::reporting("rep", move |ctx, ready| async move {
            ready.ready();
            ctx.cancelled().await;
            sleep(Duration::from_millis(40)).await;
            e.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .unwrap();

        let e = exited.clone();
        orch.register(Unit::bare("bare", move |ctx| async move {
            ctx.cancelled().await;
            sleep(Duration::from_millis(10)).await;
            e.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .unwrap();

        orch.register(Unit::service(Arc::new(Cache(exited.clone()))))
            .unwrap();

        orch.ready().await;
        assert_eq!(orch.phase(), Phase::Running);
        assert_eq!(orch.running().len(), 3);

        orch.cancel().await.unwrap();
        assert_eq!(exited.load(Ordering::SeqCst), 4);
        assert!(orch.running().is_empty());
        assert!(orch.units().iter().all(|u| u.status == UnitStatus::Stopped));
        assert_eq!(orch.units()[3].name, "cache");
        assert_eq!(
            rec.kinds_for("rep"),
            vec![
                EventKind::UnitStarting,
                EventKind::UnitReady,
                EventKind::UnitStopped
            ]
        );
        assert_eq!(rec.count(EventKind::AllReady), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn worker_tokens_fire_and_cannot_stop_the_root() {
        let (orch, _rec) = build(quiet());
        let seen = Arc::new(Mutex::new(Vec::<CancellationToken>::new()));

        for name in ["x", "y"] {
            let seen = seen.clone();
            orch.register(Unit::bare(name, move |ctx| async move {
                seen.lock().unwrap().push(ctx.clone());
                ctx.cancelled().await;
                Ok(())
            }))
            .unwrap();
        }
        orch.register(Unit::bare("rogue", |ctx| async move {
            ctx.cancel();
            Ok(())
        }))
        .unwrap();
        let external = orch.context();
        external.cancel();

        orch.ready().await;
        sleep(Duration::from_millis(10)).await;
        assert_eq!(orch.phase(), Phase::Running);
        assert!(!orch.context().is_cancelled());

        orch.cancel().await.unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|t| t.is_cancelled()));
        assert!(orch.context().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn ready_blocks_on_unreported_unit() {
        let (orch, rec) = build(quiet());
        orch.register(Unit::reporting("mute", |ctx, _ready| async move {
            ctx.cancelled().await;
            Ok(())
        }))
        .unwrap();

        assert!(timeout(Duration::from_secs(5), orch.ready()).await.is_err());
        assert_eq!(orch.units()[0].status, UnitStatus::Pending);

        // Returning without reporting still lets shutdown complete.
        orch.cancel().await.unwrap();
        assert_eq!(
            rec.kinds_for("mute"),
            vec![
                EventKind::UnitStarting,
                EventKind::UnitReady,
                EventKind::UnitStopped
            ]
        );
        assert_eq!(rec.count(EventKind::AllReady), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn late_registration_is_counted() {
        let (orch, _rec) = build(quiet());
        orch.ready().await;

        orch.register(Unit::reporting("late", |ctx, ready| async move {
            sleep(Duration::from_millis(50)).await;
            ready.ready();
            ctx.cancelled().await;
            Ok(())
        }))
        .unwrap();

        let start = Instant::now();
        orch.ready().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
        orch.cancel().await.unwrap();
    }

    #[tokio::test]
    async fn registration_rejects_misconfiguration() {
        let (orch, _rec) = build(quiet());
        assert_eq!(orch.phase(), Phase::Idle);

        assert_eq!(
            orch.register(blocker("")),
            Err(RuntimeError::InvalidName)
        );
        orch.register_all([blocker("db"), blocker("queue")]).unwrap();
        assert_eq!(orch.phase(), Phase::Running);
        assert_eq!(
            orch.register(blocker("db")),
            Err(RuntimeError::DuplicateUnit { name: "db".into() })
        );

        orch.request_stop();
        assert_eq!(orch.phase(), Phase::Stopping);
        assert_eq!(
            orch.register(blocker("cache")),
            Err(RuntimeError::Closed {
                name: "cache".into()
            })
        );

        orch.wait().await.unwrap();
        assert_eq!(orch.units().len(), 2);
        assert_eq!(orch.units()[0].kind, UnitKind::Bare);
    }

    async fn explode() -> WorkResult {
        panic!("index out of range")
    }

    #[tokio::test(start_paused = true)]
    async fn isolate_policy_keeps_others_running() {
        let (orch, rec) = build(quiet());
        orch.register(Unit::oneshot("bad", || async {
            Err(WorkerError::fail("disk full"))
        }))
        .unwrap();
        orch.register(Unit::bare("crash", |_ctx| explode())).unwrap();
        orch.register(blocker("good")).unwrap();

        orch.ready().await;
        sleep(Duration::from_millis(10)).await;
        assert_eq!(orch.phase(), Phase::Running);
        assert_eq!(orch.running(), vec!["good".to_string()]);

        let res = orch.cancel().await;
        assert_eq!(
            res,
            Err(RuntimeError::UnitsFailed {
                failed: vec!["bad".into(), "crash".into()]
            })
        );
        assert_eq!(
            orch.units()[1].status,
            UnitStatus::Failed("panicked: index out of range".into())
        );
        assert_eq!(rec.count(EventKind::UnitFailed), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fail_fast_policy_begins_stopping() {
        let cfg = Config {
            failure: FailurePolicy::FailFast,
            ..quiet()
        };
        let (orch, rec) = build(cfg);
        orch.register(blocker("steady")).unwrap();
        orch.register(Unit::reporting("flaky", |_ctx, ready| async move {
            ready.ready();
            sleep(Duration::from_millis(30)).await;
            Err(WorkerError::fail("lost connection"))
        }))
        .unwrap();

        let res = orch.wait().await;
        assert_eq!(
            res,
            Err(RuntimeError::UnitsFailed {
                failed: vec!["flaky".into()]
            })
        );
        assert_eq!(orch.cause(), Some(StopCause::UnitFailed("flaky".into())));
        assert_eq!(rec.count(EventKind::ShutdownRequested), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn canceled_error_is_a_graceful_stop() {
        let (orch, _rec) = build(quiet());
        orch.register(Unit::bare("polite", |ctx| async move {
            ctx.cancelled().await;
            Err(WorkerError::Canceled)
        }))
        .unwrap();

        assert_eq!(orch.cancel().await, Ok(()));
        assert_eq!(orch.units()[0].status, UnitStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_hook_does_not_skip_the_rest() {
        let (orch, rec) = build(quiet());
        let ran = Arc::new(AtomicBool::new(false));

        orch.on_shutdown(|| panic!("hook bug"));
        {
            let ran = ran.clone();
            orch.on_shutdown(move || ran.store(true, Ordering::SeqCst));
        }

        orch.cancel().await.unwrap();
        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(rec.count(EventKind::HookFailed), 1);

        // Too late: terminal actions already ran.
        let late = Arc::new(AtomicBool::new(false));
        {
            let late = late.clone();
            orch.on_shutdown(move || late.store(true, Ordering::SeqCst));
        }
        orch.wait().await.unwrap();
        assert!(!late.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_share_one_terminal_sequence() {
        let (orch, rec) = build(quiet());
        orch.register(blocker("db")).unwrap();

        let waiter = tokio::spawn({
            let orch = orch.clone();
            async move { orch.wait().await }
        });
        sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        orch.request_stop();
        assert_eq!(waiter.await.unwrap(), Ok(()));
        assert_eq!(orch.shutdown().await, Ok(()));
        assert_eq!(rec.count(EventKind::Bye), 1);
        assert_eq!(orch.exit_code(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_wait_does_not_strand_later_callers() {
        let (orch, rec) = build(quiet());
        orch.register(blocker("db")).unwrap();

        tokio::select! {
            _ = orch.wait() => panic!("wait returned before stopping began"),
            _ = sleep(Duration::from_millis(10)) => {}
        }
        let aborted = tokio::spawn({
            let orch = orch.clone();
            async move { orch.wait().await }
        });
        sleep(Duration::from_millis(10)).await;
        aborted.abort();

        let res = timeout(Duration::from_secs(60), orch.cancel()).await;
        assert_eq!(res, Ok(Ok(())));
        assert_eq!(orch.phase(), Phase::Stopped);
        assert_eq!(rec.count(EventKind::Bye), 1);
    }

    const CHILD_MODE: &str = "GRACEVISOR_TEST_CHILD";

    fn child_mode() -> Option<String> {
        std::env::var(CHILD_MODE).ok()
    }

    /// Re-runs one test of this binary in a child process with `mode` set.
    fn rerun(test: &str, mode: &str) -> Option<std::process::Output> {
        let exe = std::env::current_exe().ok()?;
        std::process::Command::new(exe)
            .args(["--exact", test, "--nocapture", "--test-threads=1"])
            .env(CHILD_MODE, mode)
            .output()
            .ok()
    }

    struct PrintBye;

    #[async_trait]
    impl Subscribe for PrintBye {
        async fn on_event(&self, ev: &Event) {
            if ev.kind == EventKind::Bye {
                sleep(Duration::from_millis(20)).await;
                println!("bye-delivered");
            }
        }
    }

    #[tokio::test]
    async fn nonzero_exit_code_ends_process_after_hooks_and_drain() {
        const NAME: &str =
            "core::orchestrator::tests::nonzero_exit_code_ends_process_after_hooks_and_drain";

        if child_mode().as_deref() == Some("exit") {
            let cfg = Config {
                exit_code: 1,
                ..quiet()
            };
            let orch = Orchestrator::builder(cfg)
                .with_subscriber(Arc::new(PrintBye))
                .build();
            orch.register(blocker("db")).unwrap();
            orch.on_shutdown(|| println!("hook-ran"));
            orch.set_exit(3);

            let _ = orch.cancel().await;
            println!("wait-returned");
            return;
        }

        let Some(out) = rerun(NAME, "exit") else {
            return;
        };
        let stdout = String::from_utf8_lossy(&out.stdout);
        assert_eq!(out.status.code(), Some(3), "child stdout: {stdout}");

        let hook = stdout.find("hook-ran").expect("hook did not run");
        let bye = stdout.find("bye-delivered").expect("bye was not drained");
        assert!(hook < bye);
        assert!(!stdout.contains("wait-returned"));
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn second_signal_during_shutdown_exits_process() {
        const NAME: &str = "core::orchestrator::tests::second_signal_during_shutdown_exits_process";

        if child_mode().as_deref() == Some("second-signal") {
            let cfg = Config {
                signals: true,
                ..quiet()
            };
            let orch = Orchestrator::new(cfg);
            // Ignores its token, so shutdown never completes on its own.
            orch.register(Unit::bare("stuck", |_ctx| async move {
                sleep(Duration::from_secs(30)).await;
                Ok(())
            }))
            .unwrap();
            sleep(Duration::from_millis(100)).await;

            let pid = std::process::id().to_string();
            for _ in 0..2 {
                let sent = std::process::Command::new("kill")
                    .args(["-TERM", &pid])
                    .status();
                if sent.is_err() {
                    println!("no-kill");
                    return;
                }
                sleep(Duration::from_millis(200)).await;
            }
            println!("still-alive");
            return;
        }

        let Some(out) = rerun(NAME, "second-signal") else {
            return;
        };
        let stdout = String::from_utf8_lossy(&out.stdout);
        if stdout.contains("no-kill") {
            return;
        }
        assert_eq!(out.status.code(), Some(143), "child stdout: {stdout}");
        assert!(!stdout.contains("still-alive"));
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn hangup_signal_begins_stopping() {
        use crate::core::shutdown::Signal;
        use tokio::signal::unix::{SignalKind, signal};

        // Keeps SIGHUP from killing the test process even if the watcher is late.
        let _guard = signal(SignalKind::hangup()).unwrap();

        let cfg = Config {
            signals: true,
            ..quiet()
        };
        let (orch, rec) = build(cfg);
        orch.register(blocker("db")).unwrap();
        sleep(Duration::from_millis(100)).await;

        let pid = std::process::id().to_string();
        let Ok(status) = std::process::Command::new("kill")
            .args(["-HUP", &pid])
            .status()
        else {
            return;
        };
        assert!(status.success());

        let res = timeout(Duration::from_secs(5), orch.wait()).await;
        assert_eq!(res, Ok(Ok(())));
        assert_eq!(orch.cause(), Some(StopCause::Signal(Signal::Hangup)));
        assert_eq!(rec.count(EventKind::ShutdownRequested), 1);
    }
}
