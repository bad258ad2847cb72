//! Completion barrier
//!
//! Counts down from a fixed number of events and releases every waiter once
//! the count reaches zero. Single use: there is no way to raise the count
//! again.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Barrier errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BarrierError {
    /// `done` called more times than the barrier was created for
    #[error("completion barrier decremented below zero")]
    Underflow,
}

/// Blocks waiters until a known number of events has happened
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use throttle_core::CompletionBarrier;
///
/// let barrier = Arc::new(CompletionBarrier::new(2));
/// for _ in 0..2 {
///     let barrier = Arc::clone(&barrier);
///     std::thread::spawn(move || barrier.done().unwrap());
/// }
/// barrier.wait();
/// assert!(barrier.is_complete());
/// ```
#[derive(Debug)]
pub struct CompletionBarrier {
    remaining: Mutex<usize>,
    zero: Condvar,
}

impl CompletionBarrier {
    /// Create a barrier that completes after `count` calls to [`done`](Self::done)
    pub fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            zero: Condvar::new(),
        }
    }

    /// Record one event
    ///
    /// The decrement and the wakeup happen under the same lock, so a waiter
    /// can never miss the transition to zero.
    pub fn done(&self) -> Result<(), BarrierError> {
        let mut remaining = self.remaining.lock();
        if *remaining == 0 {
            return Err(BarrierError::Underflow);
        }
        *remaining -= 1;
        if *remaining == 0 {
            self.zero.notify_all();
        }
        Ok(())
    }

    /// Block until every event has been recorded
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            self.zero.wait(&mut remaining);
        }
    }

    /// Block for at most `timeout`; returns whether the barrier completed
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait();
            return true;
        };

        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            if self.zero.wait_until(&mut remaining, deadline).timed_out() {
                return *remaining == 0;
            }
        }
        true
    }

    /// Events still outstanding
    pub fn remaining(&self) -> usize {
        *self.remaining.lock()
    }

    pub fn is_complete(&self) -> bool {
        self.remaining() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_zero_count_is_complete() {
        let barrier = CompletionBarrier::new(0);
        assert!(barrier.is_complete());
        barrier.wait();
        assert_eq!(barrier.done(), Err(BarrierError::Underflow));
    }

    #[test]
    fn test_counts_down() {
        let barrier = CompletionBarrier::new(3);
        barrier.done().unwrap();
        barrier.done().unwrap();
        assert_eq!(barrier.remaining(), 1);
        assert!(!barrier.is_complete());

        barrier.done().unwrap();
        assert!(barrier.is_complete());
        assert_eq!(barrier.done(), Err(BarrierError::Underflow));
    }

    #[test]
    fn test_wait_timeout_expires() {
        let barrier = CompletionBarrier::new(1);
        assert!(!barrier.wait_timeout(Duration::from_millis(20)));
        barrier.done().unwrap();
        assert!(barrier.wait_timeout(Duration::from_millis(20)));
    }

    #[test]
    fn test_wait_releases_all_waiters() {
        let barrier = Arc::new(CompletionBarrier::new(4));

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || barrier.wait())
            })
            .collect();

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(10));
                    barrier.done().unwrap();
                })
            })
            .collect();

        for handle in workers.into_iter().chain(waiters) {
            handle.join().unwrap();
        }
        assert!(barrier.is_complete());
    }
}
