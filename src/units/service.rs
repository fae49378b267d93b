//! # Struct-backed workers.
//!
//! [`Service`] is the trait form of a reporting unit: a type with a stable
//! [`name`](Service::name) and an async [`run`](Service::run) that reports
//! readiness and then waits for cancellation. Register it with
//! [`Unit::service`](crate::Unit::service).

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::units::Ready;

/// # Long-running, cancelable service.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use gracevisor::{Ready, Service, WorkerError};
///
/// struct Cache;
///
/// #[async_trait]
/// impl Service for Cache {
///     async fn run(&self, ctx: CancellationToken, ready: Ready) -> Result<(), WorkerError> {
///         // warm up...
///         ready.ready();
///         ctx.cancelled().await;
///         // flush...
///         Ok(())
///     }
/// }
///
/// assert_eq!(Cache.name(), "cache");
/// ```
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Returns a stable, human-readable service name.
    ///
    /// The default is the lowercased type name without its module path.
    fn name(&self) -> String {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Runs the service: bootstrap, `ready.ready()`, wait for `ctx`, clean up.
    async fn run(&self, ctx: CancellationToken, ready: Ready) -> Result<(), WorkerError>;
}

/// `my_app::db::Pool<T>` → `pool`.
fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::short_type_name;

    #[test]
    fn strips_path_and_generics() {
        assert_eq!(short_type_name("my_app::db::Pool<u8>"), "pool");
        assert_eq!(short_type_name("Gamma"), "gamma");
        assert_eq!(short_type_name("a::b::HttpServer"), "httpserver");
    }
}
