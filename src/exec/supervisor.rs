// src/exec/supervisor.rs

//! Spawning a cohort of workers and seeing it through to its close.
//!
//! All workers of a run report into one channel. A single task consumes it,
//! so exits are handled strictly one after another: the "last worker
//! exited" branch runs exactly once, and the watcher is taken out of an
//! `Option` before it is closed.
//!
//! Nothing here waits on the run's receiver before [`ProcessSupervisor::spawn`]
//! returns: spawn and spawn-failure events are handed to the background task
//! and sent from there.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::RunRequest;
use crate::engine::{ChannelEvent, ExitRecord, RunSummary};
use crate::errors::{OrchestratorError, Result};
use crate::exec::command::build_command;
use crate::exec::registry::ProcessRegistry;
use crate::exec::worker::{pump_worker, stderr_style, Stream, WorkerHandle, WorkerMessage};
use crate::fs::FileSystem;
use crate::runtime_env::ProcessEnvironment;
use crate::steps::WorkloadTable;
use crate::watch::{NotificationSerializer, WatcherHandle};
use crate::workload::{AnticipatedWorkload, StudyLayout};

/// Per-run state handed to the supervisor once preconditions have passed.
#[derive(Debug)]
pub struct Cohort {
    pub fs: Arc<dyn FileSystem>,
    pub layout: StudyLayout,
    pub table: &'static WorkloadTable,
    pub workload: AnticipatedWorkload,
    pub watcher: WatcherHandle,
    pub serializer: Arc<NotificationSerializer>,
}

#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    registry: ProcessRegistry,
}

impl ProcessSupervisor {
    pub fn new(registry: ProcessRegistry) -> Self {
        Self { registry }
    }

    /// Start `request.workers` workers.
    ///
    /// A worker that fails to start is reported on the channel and not
    /// registered; its siblings still run. Only if none starts is this an
    /// error; the watcher is then closed in the background.
    pub async fn spawn(
        &self,
        request: &RunRequest,
        env: &ProcessEnvironment,
        cohort: Cohort,
    ) -> Result<Vec<WorkerHandle>> {
        let (tx, rx) = mpsc::unbounded_channel::<WorkerMessage>();
        let mut workers = Vec::with_capacity(request.workers);
        let mut announcements = Vec::with_capacity(request.workers);
        let mut first_failure = None;

        for ordinal in 1..=request.workers {
            let mut handle = WorkerHandle::new(ordinal);

            let spawned = build_command(env, request, ordinal)
                .spawn()
                .and_then(|child| match child.id() {
                    Some(pid) => Ok((child, pid)),
                    None => Err(std::io::Error::other("process exited before it was registered")),
                });

            match spawned {
                Ok((child, pid)) => {
                    self.registry.add(pid);
                    handle.started(pid);
                    info!(pid, ordinal, program = ?env.program, "worker spawned");
                    announcements.push(ChannelEvent::ChildProcessHasSpawned { pid });
                    tokio::spawn(pump_worker(child, pid, tx.clone()));
                }
                Err(source) => {
                    error!(ordinal, error = %source, "failed to spawn worker");
                    handle.exited();
                    announcements.push(ChannelEvent::ChildProcessHasErrored {
                        pid: None,
                        ordinal,
                        error: source.to_string(),
                    });
                    first_failure.get_or_insert((ordinal, source));
                }
            }
            workers.push(handle);
        }
        drop(tx);

        if !workers.iter().any(WorkerHandle::is_live) {
            tokio::spawn(abandon(cohort, announcements));
            let (ordinal, source) = first_failure.unwrap_or_else(|| {
                (0, std::io::Error::other("no workers requested"))
            });
            return Err(OrchestratorError::Spawn { ordinal, source });
        }

        tokio::spawn(supervise(
            rx,
            workers.clone(),
            announcements,
            cohort,
            self.registry.clone(),
        ));
        Ok(workers)
    }
}

/// No worker started: report why and stop watching.
async fn abandon(cohort: Cohort, announcements: Vec<ChannelEvent>) {
    cohort.serializer.emit_all(announcements, None).await;
    if let Err(e) = cohort.watcher.close().await {
        warn!(error = %e, "closing watcher after failed spawn");
    }
}

async fn supervise(
    mut rx: mpsc::UnboundedReceiver<WorkerMessage>,
    mut workers: Vec<WorkerHandle>,
    announcements: Vec<ChannelEvent>,
    cohort: Cohort,
    registry: ProcessRegistry,
) {
    cohort.serializer.emit_all(announcements, None).await;

    let Cohort {
        fs,
        layout,
        table,
        workload,
        watcher,
        serializer,
    } = cohort;
    let mut watcher = Some(watcher);
    let mut exit_records = Vec::new();

    while let Some(message) = rx.recv().await {
        let record = match message {
            WorkerMessage::Output {
                pid,
                stream: Stream::Stdout,
                text,
            } => {
                serializer
                    .emit(ChannelEvent::ChildProcessStdout {
                        pid: Some(pid),
                        text,
                        style: None,
                    })
                    .await;
                continue;
            }
            WorkerMessage::Output {
                pid,
                stream: Stream::Stderr,
                text,
            } => {
                let style = stderr_style(&text);
                serializer
                    .emit(ChannelEvent::ChildProcessStderr { pid, text, style })
                    .await;
                continue;
            }
            WorkerMessage::Exited(record) => record,
            WorkerMessage::WaitFailed { pid, error } => {
                let ordinal = ordinal_of(&workers, pid);
                serializer
                    .emit(ChannelEvent::ChildProcessHasErrored {
                        pid: Some(pid),
                        ordinal,
                        error,
                    })
                    .await;
                ExitRecord {
                    pid,
                    exit_code: None,
                    signal: None,
                }
            }
        };

        // Always deregistered, whether or not this closes the cohort.
        registry.remove(record.pid);
        if let Some(worker) = workers.iter_mut().find(|w| w.pid == Some(record.pid)) {
            worker.exited();
        }
        info!(
            pid = record.pid,
            exit_code = ?record.exit_code,
            signal = ?record.signal,
            "worker exited"
        );
        exit_records.push(record);

        if workers.iter().any(WorkerHandle::is_live) {
            continue;
        }
        let Some(watcher) = watcher.take() else {
            continue;
        };

        if let Err(e) = watcher.close().await {
            warn!(error = %e, "closing progress watcher");
        }
        let summary = RunSummary::compute(
            fs.as_ref(),
            &layout,
            table,
            &workload,
            std::mem::take(&mut exit_records),
        );
        info!(
            incomplete = summary.num_incomplete_steps,
            workers_succeeded = summary.workers_succeeded(),
            "run closed"
        );
        serializer
            .emit(ChannelEvent::ChildProcessHasClosed {
                pid: record.pid,
                exit_code: record.exit_code,
                summary,
            })
            .await;
        break;
    }
}

fn ordinal_of(workers: &[WorkerHandle], pid: u32) -> usize {
    workers
        .iter()
        .find(|w| w.pid == Some(pid))
        .map_or(0, |w| w.ordinal)
}
