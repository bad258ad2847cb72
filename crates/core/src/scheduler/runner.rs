//! Job scheduler
//!
//! Admits jobs through a semaphore, runs each admitted job on its own thread
//! and blocks the caller on a completion barrier until every job is done.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, debug_span, error, info, instrument, warn, Span};
use uuid::Uuid;

use super::config::{ConfigError, SchedulerConfig};
use super::job::{Job, JobBody, JobState, RunSummary};
use super::load::LoadTracker;
use crate::sync::{CompletionBarrier, Permit, Semaphore};

/// Scheduler errors
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Configuration rejected before any job was admitted
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    /// The OS refused to start a job thread
    #[error("failed to spawn thread for job {job_id}: {source}")]
    Spawn {
        job_id: usize,
        #[source]
        source: io::Error,
    },
}

/// Settles one admitted job when dropped: release the slot, then decrement
/// the barrier. Runs whether the job body returned, panicked, or never
/// started because its thread could not be spawned.
struct CompletionGuard {
    job_id: usize,
    permit: Option<Permit>,
    barrier: Arc<CompletionBarrier>,
    load: Arc<LoadTracker>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.load.job_completed();
        drop(self.permit.take());
        if let Err(e) = self.barrier.done() {
            error!(job_id = self.job_id, error = %e, "Completion barrier out of sync");
        }
        debug!(job_id = self.job_id, state = %JobState::Completed, "Job completed");
    }
}

/// Runs a batch of jobs with at most `max_concurrency` of them at once
///
/// # Example
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use throttle_core::{JobScheduler, SchedulerConfig};
///
/// let scheduler = JobScheduler::new(SchedulerConfig::new(3));
/// let finished = Arc::new(AtomicUsize::new(0));
///
/// let counter = Arc::clone(&finished);
/// let summary = scheduler
///     .run_indexed(20, move |_id| {
///         counter.fetch_add(1, Ordering::SeqCst);
///     })
///     .unwrap();
///
/// assert_eq!(finished.load(Ordering::SeqCst), 20);
/// assert!(summary.peak_running <= 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct JobScheduler {
    config: SchedulerConfig,
}

impl JobScheduler {
    /// Create a scheduler
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Create a scheduler configured from environment variables
    pub fn from_env() -> Self {
        Self::new(SchedulerConfig::from_env())
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run every job and block until all of them have completed
    ///
    /// Jobs are admitted in submission order; once `max_concurrency` jobs
    /// are running, admission blocks until one of them finishes. There is no
    /// early exit: a job that never returns keeps this call waiting.
    ///
    /// A panicking job is reported in [`RunSummary::panicked`] and does not
    /// affect the other jobs.
    #[instrument(
        skip(self, jobs),
        fields(
            run_id = tracing::field::Empty,
            jobs = jobs.len(),
            max_concurrency = self.config.max_concurrency
        )
    )]
    pub fn run(&self, jobs: Vec<Job>) -> Result<RunSummary, SchedulerError> {
        self.config.validate()?;

        let run_id = Uuid::now_v7();
        let span = Span::current();
        span.record("run_id", tracing::field::display(run_id));

        let total = jobs.len();
        info!(total, "Starting run");

        let started_at = Instant::now();
        let semaphore = Semaphore::new(self.config.max_concurrency);
        let barrier = Arc::new(CompletionBarrier::new(total));
        let load = Arc::new(LoadTracker::new());
        let panicked = Arc::new(Mutex::new(Vec::new()));

        let mut pending = jobs.into_iter();
        let mut spawn_error = None;

        while let Some(job) = pending.next() {
            let (job_id, body) = job.into_parts();
            debug!(job_id, state = %JobState::Pending, "Waiting for slot");

            let permit = semaphore.acquire_owned();
            load.job_started();
            debug!(
                job_id,
                state = %JobState::Admitted,
                running = load.current_load(),
                "Job admitted"
            );

            let guard = CompletionGuard {
                job_id,
                permit: Some(permit),
                barrier: Arc::clone(&barrier),
                load: Arc::clone(&load),
            };

            if let Err(source) = self.spawn(job_id, body, guard, Arc::clone(&panicked), &span) {
                // The guard was dropped with the closure, so this job is settled
                error!(job_id, error = %source, "Failed to spawn job thread");

                let forfeited = pending.len();
                if forfeited > 0 {
                    warn!(forfeited, "Forfeiting jobs that were never admitted");
                }
                for _ in 0..forfeited {
                    if let Err(e) = barrier.done() {
                        error!(error = %e, "Completion barrier out of sync");
                    }
                }

                spawn_error = Some(SchedulerError::Spawn { job_id, source });
                break;
            }
        }

        barrier.wait();

        if let Some(err) = spawn_error {
            return Err(err);
        }

        let mut panicked = std::mem::take(&mut *panicked.lock());
        panicked.sort_unstable();

        let summary = RunSummary {
            run_id,
            total,
            succeeded: total - panicked.len(),
            panicked,
            peak_running: load.peak_load(),
            elapsed: started_at.elapsed(),
        };

        info!(
            succeeded = summary.succeeded,
            panicked = summary.panicked.len(),
            peak_running = summary.peak_running,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Run complete"
        );

        Ok(summary)
    }

    /// Run jobs `1..=count`, each calling `body` with its id
    pub fn run_indexed<F>(&self, count: usize, body: F) -> Result<RunSummary, SchedulerError>
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        let body = Arc::new(body);
        let jobs = (1..=count)
            .map(|id| {
                let body = Arc::clone(&body);
                Job::new(id, move || body(id))
            })
            .collect();
        self.run(jobs)
    }

    /// Start a job thread that owns the job's completion guard
    fn spawn(
        &self,
        job_id: usize,
        body: JobBody,
        guard: CompletionGuard,
        panicked: Arc<Mutex<Vec<usize>>>,
        parent: &Span,
    ) -> io::Result<()> {
        let mut builder =
            thread::Builder::new().name(format!("{}-{}", self.config.thread_name_prefix, job_id));
        if let Some(stack_size) = self.config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let span = debug_span!(parent: parent, "job", job_id);

        builder.spawn(move || {
            let _guard = guard;
            let _entered = span.enter();

            debug!(state = %JobState::Running, "Job running");
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(body)) {
                error!(panic = panic_message(payload.as_ref()), "Job panicked");
                panicked.lock().push(job_id);
            }
        })?;

        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_empty_run_returns_immediately() {
        let scheduler = JobScheduler::default();
        let summary = scheduler.run(Vec::new()).unwrap();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.peak_running, 0);
    }

    #[test]
    fn test_invalid_config_rejected_before_admission() {
        let scheduler = JobScheduler::new(SchedulerConfig {
            max_concurrency: 0,
            ..Default::default()
        });
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);

        let result = scheduler.run(vec![Job::new(1, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })]);

        assert!(matches!(result, Err(SchedulerError::InvalidConfig(_))));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_jobs_run_on_named_threads() {
        let scheduler =
            JobScheduler::new(SchedulerConfig::new(2).with_thread_name_prefix("unit"));
        let names = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&names);
        scheduler
            .run_indexed(3, move |_| {
                let name = thread::current().name().map(str::to_string);
                seen.lock().push(name);
            })
            .unwrap();

        let mut names: Vec<_> = names.lock().iter().flatten().cloned().collect();
        names.sort();
        assert_eq!(names, vec!["unit-1", "unit-2", "unit-3"]);
    }

    #[test]
    fn test_panicking_job_is_reported_and_releases_slot() {
        let scheduler = JobScheduler::new(SchedulerConfig::new(1));
        let completed = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&completed);
        let summary = scheduler
            .run_indexed(4, move |id| {
                if id == 2 {
                    panic!("job {id} failed");
                }
                thread::sleep(Duration::from_millis(5));
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        assert_eq!(summary.total, 4);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.panicked, vec![2]);
        assert_eq!(completed.load(Ordering::SeqCst), 3);
        assert_eq!(summary.peak_running, 1);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload.as_ref()), "owned message");

        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_summary_has_unique_run_ids() {
        let scheduler = JobScheduler::default();
        let first = scheduler.run_indexed(1, |_| {}).unwrap();
        let second = scheduler.run_indexed(1, |_| {}).unwrap();
        assert_ne!(first.run_id, second.run_id);
    }

    #[test]
    fn test_spawn_failure_forfeits_remaining_jobs() {
        // No OS will map a stack this large, so the first spawn fails
        let scheduler =
            JobScheduler::new(SchedulerConfig::new(2).with_stack_size(usize::MAX / 2));
        let ran = Arc::new(AtomicUsize::new(0));

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let counter = Arc::clone(&ran);
        thread::spawn(move || {
            let result = scheduler.run_indexed(5, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            let _ = done_tx.send(result);
        });

        let result = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("run hung after a spawn failure");
        assert!(matches!(
            result,
            Err(SchedulerError::Spawn { job_id: 1, .. })
        ));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}
