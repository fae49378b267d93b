//! # Unit: one worker plus the shape it is invoked with.
//!
//! The shape is chosen by the caller at construction time; there is no runtime probing:
//!
//! | Constructor           | Closure                                  | "ready" means                |
//! |-----------------------|------------------------------------------|------------------------------|
//! | [`Unit::oneshot`]     | `FnOnce() -> Fut`                        | the future completed         |
//! | [`Unit::reporting`]   | `FnOnce(CancellationToken, Ready) -> Fut`| `Ready::ready()` was called  |
//! | [`Unit::bare`]        | `FnOnce(CancellationToken) -> Fut`       | the unit was spawned         |
//! | [`Unit::service`]     | `Arc<dyn Service>` (reporting shape)     | `Ready::ready()` was called  |
//!
//! `Fut: Future<Output = Result<(), WorkerError>> + Send + 'static` in every case.
//!
//! A bare unit cannot tell the orchestrator when its bootstrap is finished, so
//! [`Orchestrator::ready`](crate::Orchestrator::ready) only guarantees it has been spawned.
//! Prefer [`Unit::reporting`] for anything that needs warm-up.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::units::{Ready, Service};

/// Outcome of a worker body.
pub type WorkResult = Result<(), WorkerError>;

/// Boxed worker future.
pub type WorkFuture = Pin<Box<dyn Future<Output = WorkResult> + Send + 'static>>;

/// Closed set of invocation shapes.
pub(crate) enum Work {
    OneShot(Box<dyn FnOnce() -> WorkFuture + Send>),
    Reporting(Box<dyn FnOnce(CancellationToken, Ready) -> WorkFuture + Send>),
    Bare(Box<dyn FnOnce(CancellationToken) -> WorkFuture + Send>),
}

/// Invocation shape of a [`Unit`], for introspection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitKind {
    /// Runs to completion; its return is both readiness and completion.
    OneShot,
    /// Reports readiness explicitly, then blocks until cancellation.
    Reporting,
    /// Blocks until cancellation; ready as soon as it is spawned.
    Bare,
}

/// A named worker ready to be registered with an [`Orchestrator`](crate::Orchestrator).
pub struct Unit {
    name: Cow<'static, str>,
    work: Work,
}

impl Unit {
    /// Fire-and-forget unit: runs once, expected to finish quickly.
    ///
    /// ## Example
    /// ```rust
    /// use gracevisor::{Unit, UnitKind, WorkerError};
    ///
    /// let unit = Unit::oneshot("migrate", || async {
    ///     // apply migrations...
    ///     Ok::<(), WorkerError>(())
    /// });
    /// assert_eq!(unit.kind(), UnitKind::OneShot);
    /// ```
    pub fn oneshot<F, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = WorkResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            work: Work::OneShot(Box::new(move || Box::pin(f()) as WorkFuture)),
        }
    }

    /// Reporting unit: receives the cancellation token and a [`Ready`] handle.
    pub fn reporting<F, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: FnOnce(CancellationToken, Ready) -> Fut + Send + 'static,
        Fut: Future<Output = WorkResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            work: Work::Reporting(Box::new(move |ctx, ready| {
                Box::pin(f(ctx, ready)) as WorkFuture
            })),
        }
    }

    /// Bare unit: receives only the cancellation token.
    ///
    /// Counted as ready once spawned.
    pub fn bare<F, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = WorkResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            work: Work::Bare(Box::new(move |ctx| Box::pin(f(ctx)) as WorkFuture)),
        }
    }

    /// Struct-backed unit, adapted to the reporting shape.
    ///
    /// The display name comes from [`Service::name`].
    pub fn service(svc: Arc<dyn Service>) -> Self {
        let name = svc.name();
        Self {
            name: name.into(),
            work: Work::Reporting(Box::new(move |ctx, ready| {
                Box::pin(async move { svc.run(ctx, ready).await }) as WorkFuture
            })),
        }
    }

    /// Overrides the display name.
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the invocation shape.
    pub fn kind(&self) -> UnitKind {
        match self.work {
            Work::OneShot(_) => UnitKind::OneShot,
            Work::Reporting(_) => UnitKind::Reporting,
            Work::Bare(_) => UnitKind::Bare,
        }
    }

    pub(crate) fn into_parts(self) -> (Cow<'static, str>, Work) {
        (self.name, self.work)
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish()
    }
}
