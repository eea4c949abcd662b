// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod runtime_env;
pub mod steps;
pub mod types;
pub mod watch;
pub mod workload;

use anyhow::{anyhow, bail, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::engine::orchestrator::WorkloadEstimate;
use crate::engine::{ChannelEvent, ChannelMessage, RunOrchestrator, RunSummary};
use crate::types::Severity;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (the `[run]` section is the request)
/// - the orchestrator (preconditions, watcher, workers)
/// - printing channel events until the run closes
/// - Ctrl-C handling (terminates every worker)
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;
    let request = cfg
        .run_request()
        .ok_or_else(|| anyhow!("{} has no [run] section", args.config))?
        .clone();

    let orchestrator = RunOrchestrator::new(&cfg);

    if args.dry_run {
        print_dry_run(&orchestrator.estimate(&request)?);
        return Ok(());
    }

    let (tx, mut rx) = mpsc::channel::<ChannelMessage>(cfg.config_section().channel_capacity);
    let outcome = orchestrator.start_run(&args.channel, &request, tx).await;

    println!("{}", outcome.title);
    for message in &outcome.messages {
        println!("  {message}");
    }
    match outcome.severity {
        Severity::Info => return Ok(()),
        Severity::Error | Severity::Warning => bail!("{}", outcome.title),
        Severity::Success => {}
    }

    // Ctrl-C → kill the workers; the run then closes normally.
    {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("interrupted; terminating workers");
            orchestrator.terminate_all();
        });
    }

    let summary = loop {
        let Some(message) = rx.recv().await else {
            bail!("event channel closed before the run finished");
        };
        println!("[{}] {}", message.channel, describe(&message.event));
        if let ChannelEvent::ChildProcessHasClosed { summary, .. } = message.event {
            break summary;
        }
    };

    report_summary(&summary)
}

fn describe(event: &ChannelEvent) -> String {
    match event {
        ChannelEvent::ProgressBarReset => "progress reset".to_string(),
        ChannelEvent::ProgressBarIncrement { amount } => {
            format!("progress +{:.2}%", amount * 100.0)
        }
        ChannelEvent::ChildProcessHasSpawned { pid } => format!("worker {pid} started"),
        ChannelEvent::ChildProcessStdout { pid, text, .. } => match pid {
            Some(pid) => format!("{pid}: {}", text.trim_end()),
            None => text.trim_end().to_string(),
        },
        ChannelEvent::ChildProcessStderr { pid, text, style } => {
            format!("{pid} ({style:?}): {}", text.trim_end())
        }
        ChannelEvent::ChildProcessHasErrored {
            pid,
            ordinal,
            error,
        } => match pid {
            Some(pid) => format!("worker {ordinal} ({pid}) failed: {error}"),
            None => format!("worker {ordinal} failed to start: {error}"),
        },
        ChannelEvent::ChildProcessRequestsMediaDisplay { image_path } => {
            format!("image {}", image_path.display())
        }
        ChannelEvent::ChildProcessHasClosed { pid, exit_code, .. } => {
            format!("run closed (last worker {pid}, exit code {exit_code:?})")
        }
    }
}

fn report_summary(summary: &RunSummary) -> Result<()> {
    for record in &summary.exit_records {
        println!(
            "  worker {}: exit code {:?}, signal {:?}",
            record.pid, record.exit_code, record.signal
        );
    }
    for message in &summary.missed_steps_messages {
        println!("  {message}");
    }

    if summary.all_succeeded() {
        info!("run finished successfully");
        Ok(())
    } else {
        bail!(
            "run finished with {} incomplete steps",
            summary.num_incomplete_steps
        )
    }
}

/// Print the estimated workload without starting anything.
fn print_dry_run(estimate: &WorkloadEstimate) {
    println!("xasl-run dry-run");
    println!("  pipeline version = {}", estimate.version);
    println!("  anticipated steps = {}", estimate.workload.len());
    println!("  total weight = {:.2}", estimate.workload.total_weight());
    println!();

    println!("modules ({}):", estimate.steps_per_module.len());
    for (module, steps) in &estimate.steps_per_module {
        println!("  - {module}: {steps} steps");
    }

    debug!("dry-run complete (no execution)");
}
