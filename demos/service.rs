//! # Example: service
//!
//! A long-running service: a reporting HTTP-ish listener, a bare background
//! ticker and a struct-backed cache, stopped by Ctrl-C / SIGTERM / SIGHUP.
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► register "migrate" (oneshot), "listener" (reporting), "ticker" (bare), "cache" (service)
//!   ├─► on_shutdown(flush)
//!   ├─► ready().await        ← all four bootstrapped
//!   └─► wait().await         ← blocks until a signal arrives
//!         ├─► ShutdownRequested{ cause = SIGINT }
//!         ├─► every ctx fires, units return
//!         └─► hooks → Bye → return
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example service
//! # then press Ctrl-C
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gracevisor::{Config, Orchestrator, Ready, Service, Unit, WorkResult, WorkerError};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

struct Cache {
    entries: usize,
}

#[async_trait]
impl Service for Cache {
    async fn run(&self, ctx: CancellationToken, ready: Ready) -> WorkResult {
        tokio::time::sleep(Duration::from_millis(150)).await;
        tracing::info!(entries = self.entries, "cache warmed");
        ready.ready();

        ctx.cancelled().await;
        tracing::info!("cache persisted");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let orch = Orchestrator::new(Config::default());

    orch.register_all([
        Unit::oneshot("migrate", || async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<(), WorkerError>(())
        }),
        Unit::reporting("listener", |ctx, ready| async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            tracing::info!(addr = "127.0.0.1:8080", "listening");
            ready.ready();

            ctx.cancelled().await;
            // drain in-flight requests
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        }),
        Unit::bare("ticker", |ctx| async move {
            let mut tick = tokio::time::interval(Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => return Err(WorkerError::Canceled),
                    _ = tick.tick() => tracing::debug!("tick"),
                }
            }
        }),
        Unit::service(Arc::new(Cache { entries: 1024 })),
    ])?;

    orch.on_shutdown(|| tracing::info!("flushed metrics"));

    orch.ready().await;
    tracing::info!("service up; press Ctrl-C to stop");

    orch.wait().await?;
    Ok(())
}
