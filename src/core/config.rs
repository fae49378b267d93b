//! # Orchestrator configuration.
//!
//! Provides [`Config`] centralized settings for the orchestrator.
//!
//! ## Sentinel values
//! - `exit_code = 0` → `wait()` returns to the caller; anything else ends the process
//! - `linger = 0s` → no pause before the exit policy

use std::time::Duration;

use crate::policies::FailurePolicy;

/// Configuration for an [`Orchestrator`](crate::Orchestrator).
///
/// ## Field semantics
/// - `exit_code`: Exit policy applied once after shutdown hooks (`0` = return normally)
/// - `silent`: Do not install the built-in [`LogWriter`](crate::LogWriter)
/// - `signals`: Arm the OS signal watcher at build time
/// - `failure`: Reaction to a failed unit
/// - `linger`: Extra pause after the final event, before the exit policy (`0s` = none)
///
/// ## Notes
/// All fields are public for flexibility. Prefer using helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Process exit status applied after shutdown.
    ///
    /// - `0` = `wait()` returns to the caller
    /// - `n != 0` = `std::process::exit(n)` once terminal actions ran
    ///
    /// Can be changed at runtime with [`Orchestrator::set_exit`](crate::Orchestrator::set_exit).
    pub exit_code: i32,

    /// Suppress lifecycle logging.
    ///
    /// Custom subscribers still receive every event.
    pub silent: bool,

    /// Listen for SIGINT / SIGTERM / SIGHUP (Ctrl-C on Windows).
    ///
    /// When `false`, only [`Orchestrator::cancel`](crate::Orchestrator::cancel)
    /// (or a fail-fast unit) can begin shutdown.
    pub signals: bool,

    /// What to do when a unit returns an error or panics.
    pub failure: FailurePolicy,

    /// Pause after the final `Bye` event, before the exit policy.
    ///
    /// Subscriber queues are drained regardless; this only helps sinks that
    /// buffer outside the process (e.g. a log shipper).
    pub linger: Duration,
}

impl Config {
    /// Returns the linger pause as an `Option`.
    ///
    /// - `None` → no pause
    /// - `Some(d)` → sleep `d` before the exit policy
    #[inline]
    pub fn linger_delay(&self) -> Option<Duration> {
        if self.linger == Duration::ZERO {
            None
        } else {
            Some(self.linger)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `exit_code = 0` (return to caller)
    /// - `silent = false` (log lifecycle through `tracing`)
    /// - `signals = true` (OS signals begin shutdown)
    /// - `failure = FailurePolicy::Isolate`
    /// - `linger = 0s`
    fn default() -> Self {
        Self {
            exit_code: 0,
            silent: false,
            signals: true,
            failure: FailurePolicy::default(),
            linger: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels() {
        let mut cfg = Config::default();
        assert!(cfg.linger_delay().is_none());
        assert_eq!(cfg.exit_code, 0);
        assert!(cfg.signals);

        cfg.linger = Duration::from_millis(50);
        assert_eq!(cfg.linger_delay(), Some(Duration::from_millis(50)));
    }
}
