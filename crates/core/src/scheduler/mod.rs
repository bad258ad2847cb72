//! Bounded-concurrency job scheduler
//!
//! This module provides:
//! - [`JobScheduler`] - Runs a batch of jobs with at most C running at once
//! - [`SchedulerConfig`] - Concurrency bound and thread settings
//! - [`LoadTracker`] - Current and peak running-job counts
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       JobScheduler::run                      │
//! │                                                              │
//! │  jobs ──► Semaphore::acquire_owned()  (blocks at C running)  │
//! │                    │                                         │
//! │                    ▼                                         │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │     Job threads (one per admitted job, ≤ C live)     │    │
//! │  │  [Job 1] [Job 2] [Job 3] ... [Job N]                 │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! │                    │  on exit (even on panic):               │
//! │                    │  release slot, then barrier.done()      │
//! │                    ▼                                         │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │      CompletionBarrier (remaining = N → 0)          │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! │                    │                                         │
//! │                    ▼                                         │
//! │              RunSummary returned                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod job;
mod load;
mod runner;

pub use config::{
    ConfigError, SchedulerConfig, DEFAULT_MAX_CONCURRENCY, DEFAULT_THREAD_NAME_PREFIX,
};
pub use job::{Job, JobBody, JobState, RunSummary};
pub use load::LoadTracker;
pub use runner::{JobScheduler, SchedulerError};
