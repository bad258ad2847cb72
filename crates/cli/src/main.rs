// Throttle CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: Support text/json/yaml output formats for scripting.
// Design Decision: Logs go to stderr so job output on stdout stays clean.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "throttle")]
#[command(about = "Throttle - run jobs with bounded concurrency")]
#[command(version)]
pub struct Cli {
    /// Output format
    #[arg(long, short, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a batch of jobs with at most N running at once
    Run(commands::run::RunArgs),

    /// Stream values through buffered channels to squaring consumers
    Pipe(commands::pipe::PipeArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "throttle=info,throttle_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    tracing::debug!(output = ?cli.output, "throttle starting");

    match cli.command {
        Commands::Run(args) => commands::run::run(args, cli.output, cli.quiet),
        Commands::Pipe(args) => commands::pipe::run(args, cli.output, cli.quiet),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["throttle", "run"]).unwrap();
        assert_eq!(cli.output, OutputFormat::Text);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.jobs, 20);
                assert_eq!(args.max_concurrency, 3);
                assert_eq!(args.job_duration_ms, 1000);
                assert_eq!(args.jitter_ms, 0);
                assert_eq!(args.thread_prefix, "throttle-job");
            }
            Commands::Pipe(_) => panic!("expected run command"),
        }
    }

    #[test]
    fn test_run_flags() {
        let cli = Cli::try_parse_from([
            "throttle",
            "--output",
            "json",
            "run",
            "-n",
            "5",
            "-c",
            "2",
            "--job-duration-ms",
            "10",
        ])
        .unwrap();

        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.jobs, 5);
                assert_eq!(args.max_concurrency, 2);
                assert_eq!(args.job_duration_ms, 10);
            }
            Commands::Pipe(_) => panic!("expected run command"),
        }
    }

    #[test]
    fn test_pipe_defaults() {
        let cli = Cli::try_parse_from(["throttle", "pipe"]).unwrap();
        match cli.command {
            Commands::Pipe(args) => {
                assert_eq!(args.capacity, 3);
                assert_eq!(args.pipelines, 2);
                assert_eq!(args.values, 4);
            }
            Commands::Run(_) => panic!("expected pipe command"),
        }
    }

    #[test]
    fn test_quiet_applies_to_pipe() {
        let cli = Cli::try_parse_from(["throttle", "pipe", "--quiet", "--capacity", "0"]).unwrap();
        assert!(cli.quiet);
        match cli.command {
            Commands::Pipe(args) => {
                assert_eq!(args.capacity, 0);
                assert!(commands::pipe::run(args, cli.output, cli.quiet).is_ok());
            }
            Commands::Run(_) => panic!("expected pipe command"),
        }
    }

    #[test]
    fn test_rejects_unknown_output_format() {
        assert!(Cli::try_parse_from(["throttle", "--output", "xml", "run"]).is_err());
    }
}
