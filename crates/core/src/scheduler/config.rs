//! Scheduler configuration

use std::env;

use serde::{Deserialize, Serialize};

/// Default number of jobs allowed to run at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;

/// Default prefix for job thread names
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "throttle-job";

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Invalid configuration
    #[error("invalid scheduler configuration: {0}")]
    InvalidConfig(String),
}

/// Job scheduler configuration
///
/// # Example
///
/// ```
/// use throttle_core::SchedulerConfig;
///
/// let config = SchedulerConfig::default()
///     .with_max_concurrency(8)
///     .with_thread_name_prefix("indexer");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum number of jobs running at the same time
    pub max_concurrency: usize,

    /// Job threads are named `{prefix}-{job_id}`
    pub thread_name_prefix: String,

    /// Stack size for job threads in bytes (platform default if unset)
    #[serde(default)]
    pub stack_size: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            stack_size: None,
        }
    }
}

impl SchedulerConfig {
    /// Create a configuration with the given concurrency bound
    pub fn new(max_concurrency: usize) -> Self {
        Self::default().with_max_concurrency(max_concurrency)
    }

    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `THROTTLE_MAX_CONCURRENCY`: Jobs allowed to run at once (default: 3)
    /// - `THROTTLE_THREAD_PREFIX`: Job thread name prefix (default: throttle-job)
    /// - `THROTTLE_STACK_SIZE`: Job thread stack size in bytes (default: platform)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_concurrency = env::var("THROTTLE_MAX_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_concurrency);

        let thread_name_prefix = env::var("THROTTLE_THREAD_PREFIX")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.thread_name_prefix);

        let stack_size = env::var("THROTTLE_STACK_SIZE")
            .ok()
            .and_then(|v| v.parse().ok());

        Self {
            max_concurrency,
            thread_name_prefix,
            stack_size,
        }
    }

    /// Set maximum concurrency
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Set the job thread name prefix
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the job thread stack size
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::InvalidConfig(
                "max_concurrency must be at least 1".into(),
            ));
        }
        if self.thread_name_prefix.contains('\0') {
            return Err(ConfigError::InvalidConfig(
                "thread_name_prefix must not contain NUL bytes".into(),
            ));
        }
        if self.stack_size == Some(0) {
            return Err(ConfigError::InvalidConfig(
                "stack_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
