//! Repeated execution on a fixed interval.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Cooperative stop flag shared between the round loop and signal handling.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        let (flag, wake) = &*self.inner;
        *flag.lock().unwrap_or_else(|p| p.into_inner()) = true;
        wake.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        let (flag, _) = &*self.inner;
        *flag.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Sleep up to `timeout`, waking early on [`trigger`](Self::trigger).
    /// Returns whether shutdown was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, wake) = &*self.inner;
        // No deadline when `timeout` does not fit in an `Instant`.
        let deadline = Instant::now().checked_add(timeout);
        let mut triggered = flag.lock().unwrap_or_else(|p| p.into_inner());
        while !*triggered {
            triggered = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    match wake.wait_timeout(triggered, deadline - now) {
                        Ok((guard, _)) => guard,
                        Err(poisoned) => poisoned.into_inner().0,
                    }
                }
                None => wake.wait(triggered).unwrap_or_else(|p| p.into_inner()),
            };
        }
        *triggered
    }
}

/// Runs a round, sleeps for the interval, and repeats until shut down.
pub struct Driver {
    interval: Duration,
    shutdown: Shutdown,
}

impl Driver {
    pub fn new(interval: Duration, shutdown: Shutdown) -> Self {
        Self { interval, shutdown }
    }

    /// Loop until shutdown; returns the exit code of the last round.
    pub fn run<F>(&self, mut round: F) -> i32
    where
        F: FnMut() -> i32,
    {
        let mut last = 0;
        let mut rounds = 0u64;
        while !self.shutdown.is_triggered() {
            last = round();
            rounds += 1;
            tracing::debug!(round = rounds, exit_code = last, "round finished");
            if self.shutdown.wait_timeout(self.interval) {
                break;
            }
        }
        last
    }
}
