//! Jobs, job states and run summaries

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of a job
pub type JobBody = Box<dyn FnOnce() + Send + 'static>;

/// An opaque unit of work identified by its position in a run
pub struct Job {
    id: usize,
    body: JobBody,
}

impl Job {
    /// Create a job from an id and a body
    pub fn new<F>(id: usize, body: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id,
            body: Box::new(body),
        }
    }

    /// The job id
    pub fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn into_parts(self) -> (usize, JobBody) {
        (self.id, self.body)
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Lifecycle of a job inside a run
///
/// ```text
/// ┌─────────┐  slot acquired  ┌──────────┐  thread spawned  ┌─────────┐  body returned  ┌───────────┐
/// │ Pending │ ──────────────► │ Admitted │ ───────────────► │ Running │ ──────────────► │ Completed │
/// └─────────┘                 └──────────┘                  └─────────┘                 └───────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Submitted, waiting for a slot
    Pending,

    /// Holds a slot, thread not yet running
    Admitted,

    /// Body executing
    Running,

    /// Slot released and barrier decremented
    Completed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Admitted => write!(f, "admitted"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique id of the run (also recorded on the run's tracing span)
    pub run_id: Uuid,

    /// Number of jobs submitted
    pub total: usize,

    /// Jobs whose body returned normally
    pub succeeded: usize,

    /// Ids of jobs whose body panicked, ascending
    pub panicked: Vec<usize>,

    /// Highest number of jobs observed running at once
    pub peak_running: usize,

    /// Wall-clock time from first admission to barrier release
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl RunSummary {
    /// Whether every job body returned normally
    pub fn is_success(&self) -> bool {
        self.panicked.is_empty()
    }
}

/// Serde support for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
