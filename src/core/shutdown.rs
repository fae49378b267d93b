//! # OS signal watcher.
//!
//! Provides [`wait_for_shutdown_signal`] an async helper that completes when the process
//! receives a termination signal, and the background watcher that turns the first
//! such signal into the orchestrator's Stopping transition.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGHUP` (controlling terminal closed)
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]
//!
//! ## Rules
//! - The first signal begins stopping (cause = signal name).
//! - Any signal that arrives while stopping is in progress, whatever started it,
//!   exits the process at once with `128 + signo` (`130` for Ctrl-C). A unit that
//!   ignores its token can still be interrupted by the operator.
//! - Once terminal actions completed the watcher exits.
//! - Registration failure is logged; `cancel()` stays the only way to stop.

use std::fmt;
use std::sync::Weak;

use tokio_util::sync::CancellationToken;

use crate::core::Orchestrator;

/// Termination signal that started shutdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    /// `SIGINT` / Ctrl-C.
    Interrupt,
    /// `SIGTERM`.
    Terminate,
    /// `SIGHUP`.
    Hangup,
}

impl Signal {
    /// Conventional signal name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Hangup => "SIGHUP",
        }
    }

    /// Conventional status of a process killed by this signal (`128 + signo`).
    pub fn exit_code(&self) -> i32 {
        match self {
            Signal::Interrupt => 130,
            Signal::Terminate => 143,
            Signal::Hangup => 129,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the orchestrator began stopping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopCause {
    /// [`Orchestrator::cancel`] was called.
    Manual,
    /// An OS termination signal arrived.
    Signal(Signal),
    /// A unit failed under [`FailurePolicy::FailFast`](crate::FailurePolicy::FailFast).
    UnitFailed(String),
}

impl fmt::Display for StopCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopCause::Manual => f.write_str("manual"),
            StopCause::Signal(sig) => write!(f, "{sig}"),
            StopCause::UnitFailed(name) => write!(f, "unit failed: {name}"),
        }
    }
}

/// Termination signal listeners, registered once and polled repeatedly.
#[cfg(unix)]
struct Listener {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
    hangup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Listener {
    fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    async fn recv(&mut self) -> Signal {
        tokio::select! {
            _ = self.interrupt.recv() => Signal::Interrupt,
            _ = self.terminate.recv() => Signal::Terminate,
            _ = self.hangup.recv()    => Signal::Hangup,
        }
    }
}

#[cfg(not(unix))]
struct Listener;

#[cfg(not(unix))]
impl Listener {
    fn new() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> Signal {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Signal::Interrupt,
            Err(e) => {
                tracing::warn!(error = %e, "ctrl-c handler failed");
                std::future::pending::<Signal>().await
            }
        }
    }
}

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
///
/// Returns the signal received, or `Err` if signal registration fails.
pub async fn wait_for_shutdown_signal() -> std::io::Result<Signal> {
    let mut listener = Listener::new()?;
    Ok(listener.recv().await)
}

/// Spawns the background watcher.
///
/// `stopping` fires when the orchestrator begins stopping, `stopped` once its
/// terminal actions completed. Holds only a weak reference to the orchestrator.
pub(crate) fn spawn_watcher(
    orch: Weak<Orchestrator>,
    stopping: CancellationToken,
    stopped: CancellationToken,
) {
    tokio::spawn(async move {
        let mut listener = match Listener::new() {
            Ok(listener) => listener,
            Err(e) => {
                tracing::warn!(error = %e, "signal handlers unavailable; stop with cancel()");
                return;
            }
        };

        tokio::select! {
            _ = stopping.cancelled() => {}
            sig = listener.recv() => {
                let Some(orch) = orch.upgrade() else { return };
                orch.begin_stop(StopCause::Signal(sig));
            }
        }

        // Stopping: another signal ends the process the way the default disposition would.
        tokio::select! {
            _ = stopped.cancelled() => {}
            sig = listener.recv() => {
                tracing::warn!(signal = %sig, "second signal during shutdown; exiting");
                std::process::exit(sig.exit_code());
            }
        }
    });
}
