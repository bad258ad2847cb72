//! Synchronization primitives for the scheduler
//!
//! - [`Semaphore`] - Admission control built on a token channel
//! - [`CompletionBarrier`] - Wait until a fixed number of events has happened

mod barrier;
mod semaphore;

pub use barrier::{BarrierError, CompletionBarrier};
pub use semaphore::{Permit, Semaphore, SemaphoreError};
