//! # Example: one_shot
//!
//! Runs a batch of oneshot units, then stops programmatically. A custom
//! subscriber prints a summary from the event stream; one unit fails to show
//! how failures surface from `cancel()`.
//!
//! ## Run
//! ```bash
//! cargo run --example one_shot
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use gracevisor::{Config, Event, EventKind, Orchestrator, Subscribe, Unit, WorkerError};
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct Tally {
    stopped: AtomicUsize,
    failed: AtomicUsize,
}

#[async_trait]
impl Subscribe for Tally {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::UnitStopped => {
                self.stopped.fetch_add(1, Ordering::Relaxed);
            }
            EventKind::UnitFailed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            EventKind::Bye => println!(
                "summary: {} stopped, {} failed",
                self.stopped.load(Ordering::Relaxed),
                self.failed.load(Ordering::Relaxed)
            ),
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "tally"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = Config {
        signals: false,
        ..Config::default()
    };
    let orch = Orchestrator::builder(cfg)
        .with_subscriber(Arc::new(Tally::default()))
        .build();

    for (name, ms) in [("fetch", 30u64), ("resize", 60), ("upload", 90)] {
        orch.register(Unit::oneshot(name, move || async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok::<(), WorkerError>(())
        }))?;
    }
    orch.register(Unit::oneshot("notify", || async {
        Err(WorkerError::fail("smtp unreachable"))
    }))?;

    orch.ready().await;
    println!("all units done");

    match orch.cancel().await {
        Ok(()) => println!("clean exit"),
        Err(e) => println!("{}: {}", e.as_label(), e.as_message()),
    }
    Ok(())
}
