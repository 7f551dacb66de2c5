//! Timer abstraction the handshake suspends on.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::lock;

#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock scheduler backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Clock that only moves when [`ManualClock::advance`] is called.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
    requested: Mutex<Vec<Duration>>,
    sleepers: AtomicUsize,
    advanced: Notify,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        *lock(&self.now)
    }

    pub fn advance(&self, by: Duration) {
        {
            let mut now = lock(&self.now);
            *now += by;
        }
        self.advanced.notify_waiters();
    }

    /// Number of sleeps currently waiting on this clock.
    pub fn sleepers(&self) -> usize {
        self.sleepers.load(Ordering::SeqCst)
    }

    /// Every duration passed to `sleep`, in call order.
    pub fn requested(&self) -> Vec<Duration> {
        lock(&self.requested).clone()
    }

    /// Yields to the runtime until at least `count` sleeps are pending.
    /// Test helper: busy-yields, so only build it for tests.
    #[cfg(any(test, feature = "test-util"))]
    pub async fn wait_for_sleepers(&self, count: usize) {
        while self.sleepers() < count {
            tokio::task::yield_now().await;
        }
    }

    /// Yields to the runtime until `sleep` has been called `count` times in
    /// total. Unlike [`ManualClock::wait_for_sleepers`] this cannot be
    /// satisfied by a sleeper that is already due but not yet polled.
    #[cfg(any(test, feature = "test-util"))]
    pub async fn wait_for_sleep_calls(&self, count: usize) {
        while lock(&self.requested).len() < count {
            tokio::task::yield_now().await;
        }
    }
}

struct SleeperGuard<'a>(&'a AtomicUsize);

impl Drop for SleeperGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Scheduler for ManualClock {
    async fn sleep(&self, duration: Duration) {
        lock(&self.requested).push(duration);
        let deadline = self.now() + duration;
        self.sleepers.fetch_add(1, Ordering::SeqCst);
        let _guard = SleeperGuard(&self.sleepers);
        loop {
            let notified = self.advanced.notified();
            if self.now() >= deadline {
                return;
            }
            notified.await;
        }
    }
}
