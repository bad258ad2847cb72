//! Running-job load tracking
//!
//! Counts how many jobs are in the running state and the highest count seen
//! during a run. Uses atomics so job threads never contend on a lock.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Current and peak number of running jobs
#[derive(Debug, Default)]
pub struct LoadTracker {
    current_load: AtomicUsize,
    peak_load: AtomicUsize,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a job has started running
    pub fn job_started(&self) {
        let load = self.current_load.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_load.fetch_max(load, Ordering::SeqCst);
    }

    /// Record that a job has stopped running
    pub fn job_completed(&self) {
        self.current_load.fetch_sub(1, Ordering::SeqCst);
    }

    /// Jobs running right now
    pub fn current_load(&self) -> usize {
        self.current_load.load(Ordering::SeqCst)
    }

    /// Highest number of jobs seen running at once
    pub fn peak_load(&self) -> usize {
        self.peak_load.load(Ordering::SeqCst)
    }
}
