// Bounded-concurrency job run command

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use rand::Rng;
use throttle_core::scheduler::{DEFAULT_MAX_CONCURRENCY, DEFAULT_THREAD_NAME_PREFIX};
use throttle_core::{JobScheduler, RunSummary, SchedulerConfig};

use crate::output::{print_field, OutputFormat};

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Number of jobs to run
    #[arg(long, short = 'n', env = "THROTTLE_JOBS", default_value_t = 20)]
    pub jobs: usize,

    /// Maximum number of jobs running at once
    #[arg(
        long,
        short = 'c',
        env = "THROTTLE_MAX_CONCURRENCY",
        default_value_t = DEFAULT_MAX_CONCURRENCY
    )]
    pub max_concurrency: usize,

    /// How long each job works, in milliseconds
    #[arg(long, env = "THROTTLE_JOB_DURATION_MS", default_value_t = 1000)]
    pub job_duration_ms: u64,

    /// Up to this many extra random milliseconds per job
    #[arg(long, env = "THROTTLE_JITTER_MS", default_value_t = 0)]
    pub jitter_ms: u64,

    /// Prefix for job thread names
    #[arg(long, env = "THROTTLE_THREAD_PREFIX", default_value = DEFAULT_THREAD_NAME_PREFIX)]
    pub thread_prefix: String,

    /// Job thread stack size in bytes
    #[arg(long, env = "THROTTLE_STACK_SIZE")]
    pub stack_size: Option<usize>,
}

impl RunArgs {
    fn scheduler_config(&self) -> SchedulerConfig {
        let config = SchedulerConfig::new(self.max_concurrency)
            .with_thread_name_prefix(self.thread_prefix.clone());
        match self.stack_size {
            Some(bytes) => config.with_stack_size(bytes),
            None => config,
        }
    }
}

pub fn run(args: RunArgs, output: OutputFormat, quiet: bool) -> Result<()> {
    let config = args.scheduler_config();
    config.validate().context("Invalid scheduler configuration")?;

    let scheduler = JobScheduler::new(config);
    let work = Duration::from_millis(args.job_duration_ms);
    let jitter_ms = args.jitter_ms;
    let echo_ids = output.is_text();

    let summary = scheduler
        .run_indexed(args.jobs, move |id| {
            let extra = if jitter_ms > 0 {
                rand::thread_rng().gen_range(0..=jitter_ms)
            } else {
                0
            };
            thread::sleep(work + Duration::from_millis(extra));
            if echo_ids {
                println!("{}", id);
            }
        })
        .context("Job run failed")?;

    if output.is_text() {
        println!("done");
        if !quiet {
            print_summary(&summary);
        }
    } else {
        output.print_value(&summary)?;
    }

    if !summary.is_success() {
        tracing::warn!(panicked = ?summary.panicked, "Some jobs panicked");
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    print_field("Run", &summary.run_id.to_string());
    print_field("Jobs", &summary.total.to_string());
    print_field("Succeeded", &summary.succeeded.to_string());
    if !summary.panicked.is_empty() {
        let ids: Vec<String> = summary.panicked.iter().map(|id| id.to_string()).collect();
        print_field("Panicked", &ids.join(", "));
    }
    print_field("Peak running", &summary.peak_running.to_string());
    print_field("Elapsed", &format!("{}ms", summary.elapsed.as_millis()));
}
