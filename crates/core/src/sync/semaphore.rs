//! Counting semaphore backed by a bounded channel
//!
//! The channel starts out holding one token per permit. Acquiring a permit
//! receives a token, releasing sends it back, so the channel capacity is the
//! hard bound on outstanding permits.

use std::collections::VecDeque;

use tracing::error;

use crate::channel::{Channel, TrySendError};

/// Semaphore errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SemaphoreError {
    /// `release` called without a matching `acquire`
    #[error("semaphore released more times than acquired ({permits} permits)")]
    Overrelease {
        /// Total permits of the semaphore
        permits: usize,
    },
}

/// Counting semaphore for admission control
///
/// Cloning yields another handle to the same pool of permits.
///
/// # Example
///
/// ```
/// use throttle_core::Semaphore;
///
/// let semaphore = Semaphore::new(2);
/// semaphore.acquire();
/// assert_eq!(semaphore.outstanding(), 1);
///
/// semaphore.release().unwrap();
/// assert!(semaphore.release().is_err()); // nothing left to release
/// ```
#[derive(Debug, Clone)]
pub struct Semaphore {
    tokens: Channel<()>,
}

impl Semaphore {
    /// Create a semaphore with `permits` permits, all available
    ///
    /// A semaphore needs at least one permit; zero is raised to one.
    pub fn new(permits: usize) -> Self {
        let permits = permits.max(1);
        let buffer: VecDeque<()> = std::iter::repeat(()).take(permits).collect();
        Self {
            tokens: Channel::with_buffer(permits, buffer),
        }
    }

    /// Acquire a permit, blocking while all permits are checked out
    pub fn acquire(&self) {
        // The token channel is never closed, so a receive always yields a token
        let token = self.tokens.receive();
        debug_assert!(token.is_some());
    }

    /// Acquire a permit if one is available right now
    pub fn try_acquire(&self) -> bool {
        self.tokens.try_receive().is_ok()
    }

    /// Acquire a permit that is released when the returned guard drops
    pub fn acquire_owned(&self) -> Permit {
        self.acquire();
        Permit {
            semaphore: self.clone(),
        }
    }

    /// Return a permit
    ///
    /// Never blocks. Releasing with no permit outstanding is a usage error and
    /// fails with [`SemaphoreError::Overrelease`], leaving the semaphore intact.
    pub fn release(&self) -> Result<(), SemaphoreError> {
        match self.tokens.try_send(()) {
            Ok(()) => Ok(()),
            // A full token buffer means every permit is already home. The
            // token channel is never closed.
            Err(TrySendError::Full(())) | Err(TrySendError::Closed(())) => {
                Err(SemaphoreError::Overrelease {
                    permits: self.permits(),
                })
            }
        }
    }

    /// Total number of permits
    pub fn permits(&self) -> usize {
        self.tokens.capacity()
    }

    /// Permits that can be acquired without blocking
    pub fn available_permits(&self) -> usize {
        self.tokens.len()
    }

    /// Permits acquired and not yet released
    pub fn outstanding(&self) -> usize {
        self.permits() - self.available_permits()
    }
}

/// A permit that returns itself to its [`Semaphore`] when dropped
#[derive(Debug)]
#[must_use = "dropping a permit releases it immediately"]
pub struct Permit {
    semaphore: Semaphore,
}

impl Drop for Permit {
    fn drop(&mut self) {
        if let Err(e) = self.semaphore.release() {
            error!(error = %e, "Failed to release permit");
        }
    }
}
