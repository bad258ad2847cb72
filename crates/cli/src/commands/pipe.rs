// Buffered channel pipeline command
//
// One producer feeds each pipeline's channel; a consumer thread drains it and
// squares every value. The producer blocks whenever a channel is full.

use std::ops::Range;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde::Serialize;
use throttle_core::{Channel, ChannelError, Receiver};

use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct PipeArgs {
    /// Buffer capacity of each channel (0 for unbuffered)
    #[arg(long, env = "THROTTLE_CAPACITY", default_value_t = 3)]
    pub capacity: usize,

    /// Number of independent pipelines
    #[arg(long, default_value_t = 2)]
    pub pipelines: usize,

    /// Values sent through each pipeline
    #[arg(long, default_value_t = 4)]
    pub values: usize,
}

/// Squares produced by one pipeline, in receive order
#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub pipeline: usize,
    pub capacity: usize,
    pub squares: Vec<u64>,
}

/// Closes the channel when the consumer exits, so a consumer that dies
/// early fails the producer's next send instead of leaving it blocked.
struct CloseOnExit(Receiver<u64>);

impl Drop for CloseOnExit {
    fn drop(&mut self) {
        // Already closed by the producer on a normal exit
        let _ = self.0.close();
    }
}

pub fn run(args: PipeArgs, output: OutputFormat, quiet: bool) -> Result<()> {
    let echo = output.is_text();
    let banner = echo && !quiet;

    let pipelines: Vec<(Channel<u64>, JoinHandle<Vec<u64>>)> = (0..args.pipelines)
        .map(|pipeline| -> Result<_> {
            let channel = Channel::<u64>::new(args.capacity);
            let consumer = spawn_consumer(pipeline, channel.receiver(), move |value| {
                let square = value * value;
                if echo {
                    println!("{}", square);
                }
                square
            })?;
            Ok((channel, consumer))
        })
        .collect::<Result<_>>()?;

    if banner {
        println!("producer started");
    }

    for (pipeline, (channel, _)) in pipelines.iter().enumerate() {
        let first = (pipeline * args.values) as u64 + 1;
        feed(pipeline, channel, first..first + args.values as u64)?;
    }

    let mut reports = Vec::with_capacity(pipelines.len());
    for (pipeline, (_, consumer)) in pipelines.into_iter().enumerate() {
        reports.push(PipelineReport {
            pipeline,
            capacity: args.capacity,
            squares: join_consumer(pipeline, consumer)?,
        });
    }

    if banner {
        println!("producer stopped");
    } else if !echo {
        output.print_value(&reports)?;
    }

    Ok(())
}

fn spawn_consumer<F>(pipeline: usize, rx: Receiver<u64>, map: F) -> Result<JoinHandle<Vec<u64>>>
where
    F: Fn(u64) -> u64 + Send + 'static,
{
    thread::Builder::new()
        .name(format!("squares-{}", pipeline))
        .spawn(move || {
            let rx = CloseOnExit(rx);
            rx.0.iter().map(map).collect::<Vec<u64>>()
        })
        .with_context(|| format!("Failed to start consumer for pipeline {}", pipeline))
}

/// Send `values` then close the channel. Stops early if the consumer has gone.
fn feed(pipeline: usize, channel: &Channel<u64>, values: Range<u64>) -> Result<()> {
    for value in values {
        if channel.send(value).is_err() {
            tracing::warn!(pipeline, value, "Consumer exited early, stopping producer");
            break;
        }
    }

    match channel.close() {
        Ok(()) | Err(ChannelError::AlreadyClosed) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn join_consumer(pipeline: usize, consumer: JoinHandle<Vec<u64>>) -> Result<Vec<u64>> {
    consumer
        .join()
        .map_err(|_| anyhow!("Consumer for pipeline {} panicked", pipeline))
}
