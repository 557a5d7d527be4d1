// src/orchestrator/schedule.rs

//! Cancellable, clock-driven queue of pending spawns.
//!
//! A batch becomes a [`LaunchQueue`] that hands out [`PendingLaunch`]es, one
//! per iteration, in increasing order. Launches are built as they fall due,
//! so the queue is the same size for any batch. Each carries the batch's
//! [`CancelToken`], which is checked immediately before the launch is handed
//! out. The first launch is due at once; every following one is due exactly
//! `delay` after the previous one was handed out, measured on tokio's
//! monotonic clock.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

/// Owner side of a batch cancellation flag.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Observer side of a batch cancellation flag. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Create a fresh, not-yet-cancelled handle/token pair.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the handle cancels. Never resolves if the handle is
    /// dropped without cancelling.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// One iteration waiting to be spawned.
#[derive(Debug, Clone)]
pub struct PendingLaunch {
    pub iteration: u32,
    token: CancelToken,
}

impl PendingLaunch {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Pending spawns of one batch, in firing order.
#[derive(Debug)]
pub struct LaunchQueue {
    next_iteration: u32,
    remaining: u32,
    delay: Duration,
    token: CancelToken,
    last_fired: Option<Instant>,
}

impl LaunchQueue {
    /// Queue `count` iterations starting at `start_iteration`, spaced `delay`
    /// apart and all guarded by `token`.
    pub fn staggered(start_iteration: u32, count: u32, delay: Duration, token: &CancelToken) -> Self {
        Self {
            next_iteration: start_iteration,
            remaining: count,
            delay,
            token: token.clone(),
            last_fired: None,
        }
    }

    /// Wait until the next launch is due and hand it out.
    ///
    /// Returns `None` once the queue is exhausted, or as soon as the batch is
    /// cancelled (the remaining launches are dropped).
    pub async fn next_due(&mut self) -> Option<PendingLaunch> {
        if self.remaining == 0 {
            return None;
        }

        if let Some(last) = self.last_fired {
            let due = last + self.delay;
            tokio::select! {
                biased;
                _ = self.token.cancelled() => {}
                _ = sleep_until(due) => {}
            }
        }

        if self.token.is_cancelled() {
            debug!(
                iteration = self.next_iteration,
                dropped = self.remaining,
                "launch queue cancelled; dropping pending launches"
            );
            self.remaining = 0;
            return None;
        }

        let launch = PendingLaunch {
            iteration: self.next_iteration,
            token: self.token.clone(),
        };
        self.next_iteration = self.next_iteration.saturating_add(1);
        self.remaining -= 1;
        self.last_fired = Some(Instant::now());
        Some(launch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn launches_are_spaced_by_delay() {
        let (_handle, token) = cancel_pair();
        let mut queue = LaunchQueue::staggered(4, 3, Duration::from_secs(60), &token);
        let origin = Instant::now();

        let first = queue.next_due().await.unwrap();
        assert_eq!(first.iteration, 4);
        assert_eq!(Instant::now() - origin, Duration::ZERO);

        let second = queue.next_due().await.unwrap();
        assert_eq!(second.iteration, 5);
        assert_eq!(Instant::now() - origin, Duration::from_secs(60));

        let third = queue.next_due().await.unwrap();
        assert_eq!(third.iteration, 6);
        assert_eq!(Instant::now() - origin, Duration::from_secs(120));

        assert!(queue.next_due().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn delay_counts_from_previous_hand_out() {
        let (_handle, token) = cancel_pair();
        let mut queue = LaunchQueue::staggered(1, 2, Duration::from_secs(10), &token);

        queue.next_due().await.unwrap();
        // Work done by the caller between launches eats into the delay.
        tokio::time::sleep(Duration::from_secs(4)).await;
        let before = Instant::now();
        queue.next_due().await.unwrap();
        assert_eq!(Instant::now() - before, Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_retracts_waiting_launches() {
        let (handle, token) = cancel_pair();
        let mut queue = LaunchQueue::staggered(1, 3, Duration::from_secs(60), &token);

        assert_eq!(queue.next_due().await.unwrap().iteration, 1);

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            handle.cancel();
        });

        let started = Instant::now();
        assert!(queue.next_due().await.is_none());
        assert_eq!(Instant::now() - started, Duration::from_secs(5));
        canceller.await.unwrap();
        assert!(queue.next_due().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn huge_batches_cost_nothing_up_front() {
        let (handle, token) = cancel_pair();
        let mut queue = LaunchQueue::staggered(1, u32::MAX, Duration::from_secs(60), &token);

        assert_eq!(queue.next_due().await.unwrap().iteration, 1);
        assert_eq!(queue.next_due().await.unwrap().iteration, 2);
        handle.cancel();
        assert!(queue.next_due().await.is_none());
    }

    #[tokio::test]
    async fn token_checked_before_first_launch() {
        let (handle, token) = cancel_pair();
        let mut queue = LaunchQueue::staggered(1, 2, Duration::ZERO, &token);
        handle.cancel();
        assert!(queue.next_due().await.is_none());
    }

    #[tokio::test]
    async fn dropped_handle_does_not_cancel() {
        let (handle, token) = cancel_pair();
        let mut queue = LaunchQueue::staggered(1, 2, Duration::from_millis(1), &token);
        drop(handle);

        assert_eq!(queue.next_due().await.unwrap().iteration, 1);
        assert_eq!(queue.next_due().await.unwrap().iteration, 2);
        assert!(!token.is_cancelled());
    }
}
