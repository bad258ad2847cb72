//! # Throttle Core
//!
//! Blocking primitives and a bounded-concurrency job scheduler.
//!
//! ## Features
//!
//! - **Bounded channels**: Fixed-capacity FIFO with blocking send/receive and one-way close
//! - **Admission control**: Counting semaphore built on a token channel
//! - **Completion barrier**: Block until a known number of jobs have finished
//! - **Job scheduler**: Run N jobs with at most C of them at once, panic-safe
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       JobScheduler                           │
//! │  (admits jobs, spawns job threads, waits for completion)    │
//! └─────────────────────────────────────────────────────────────┘
//!                 │                              │
//!                 ▼                              ▼
//! ┌───────────────────────────────┐  ┌──────────────────────────┐
//! │           Semaphore           │  │    CompletionBarrier     │
//! │  (C tokens, bounds running)   │  │  (remaining N → 0)       │
//! └───────────────────────────────┘  └──────────────────────────┘
//!                 │
//!                 ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Channel<T>                            │
//! │  (Mutex + Condvar, blocking FIFO with close semantics)      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use throttle_core::prelude::*;
//!
//! let scheduler = JobScheduler::new(SchedulerConfig::new(3));
//! let summary = scheduler
//!     .run_indexed(20, |id| {
//!         std::thread::sleep(std::time::Duration::from_millis(1));
//!         println!("{id}");
//!     })
//!     .unwrap();
//!
//! assert_eq!(summary.total, 20);
//! assert!(summary.peak_running <= 3);
//! ```

pub mod channel;
pub mod scheduler;
pub mod sync;

/// Prelude for common imports
pub mod prelude {
    pub use crate::channel::{Channel, ChannelError, Receiver, Sender};
    pub use crate::scheduler::{
        Job, JobScheduler, JobState, RunSummary, SchedulerConfig, SchedulerError,
    };
    pub use crate::sync::{CompletionBarrier, Permit, Semaphore, SemaphoreError};
}

// Re-export key types at crate root
pub use channel::{
    Channel, ChannelError, Receiver, ReceiveTimeoutError, Sender, TryReceiveError, TrySendError,
};
pub use scheduler::{
    ConfigError, Job, JobScheduler, JobState, LoadTracker, RunSummary, SchedulerConfig,
    SchedulerError,
};
pub use sync::{BarrierError, CompletionBarrier, Permit, Semaphore, SemaphoreError};
