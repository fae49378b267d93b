//! # Counted latch used for the init barrier.
//!
//! A [`Latch`] holds an outstanding count. [`Latch::add`] raises it,
//! [`Latch::done`] lowers it, and [`Latch::wait`] resolves once it reaches zero
//! (immediately if it already is). Every waiter is woken on the transition to zero.
//!
//! ## Rules
//! - The count never goes below zero: a surplus `done()` is a programming error
//!   (debug assertion, saturating in release builds).
//! - The count may go back up after reaching zero; waiters that already
//!   returned are not affected, new waiters block again.
//!
//! Built on [`tokio::sync::watch`]: the sender holds the count, every
//! waiter subscribes and waits for the value `0`.

use tokio::sync::watch;

pub(crate) struct Latch {
    tx: watch::Sender<usize>,
}

impl Latch {
    /// Creates a latch with `initial` outstanding slots.
    pub(crate) fn new(initial: usize) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Raises the outstanding count by `n`.
    pub(crate) fn add(&self, n: usize) {
        self.tx.send_modify(|count| *count += n);
    }

    /// Releases one slot.
    pub(crate) fn done(&self) {
        self.tx.send_modify(|count| {
            debug_assert!(*count > 0, "latch released below zero");
            *count = count.saturating_sub(1);
        });
    }

    /// Current outstanding count.
    #[cfg(test)]
    pub(crate) fn count(&self) -> usize {
        *self.tx.borrow()
    }

    /// Waits until the count is zero.
    pub(crate) async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn wait_returns_immediately_at_zero() {
        let latch = Latch::new(0);
        latch.wait().await;
        assert_eq!(latch.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn releases_all_waiters_at_zero() {
        let latch = Arc::new(Latch::new(1));
        latch.add(2);
        assert_eq!(latch.count(), 3);

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let l = latch.clone();
                tokio::spawn(async move { l.wait().await })
            })
            .collect();

        latch.done();
        latch.done();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(waiters.iter().all(|w| !w.is_finished()));

        latch.done();
        for w in waiters {
            w.await.unwrap();
        }
    }

    #[tokio::test]
    async fn can_be_raised_again_after_zero() {
        let latch = Latch::new(1);
        latch.done();
        latch.wait().await;

        latch.add(1);
        let pending = tokio::time::timeout(Duration::from_millis(20), latch.wait()).await;
        assert!(pending.is_err());

        latch.done();
        latch.wait().await;
    }
}
