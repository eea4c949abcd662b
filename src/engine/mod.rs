// src/engine/mod.rs

//! Run orchestration for xasl-run.
//!
//! This module ties together:
//! - workload estimation and runtime environment resolution (preconditions)
//! - the filesystem progress watcher
//! - the process supervisor
//!
//! and defines the per-run event channel that is the only contract with
//! whatever renders progress. The entry point is [`RunOrchestrator`].

use std::path::PathBuf;

use crate::types::OutputStyle;

pub use orchestrator::RunOrchestrator;
pub use outcome::RunOutcome;
pub use sink::EventSink;
pub use summary::{ExitRecord, RunSummary};

/// Events carried on a run's channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The watcher is ready; progress restarts at zero.
    ProgressBarReset,
    /// Fraction of the total workload just completed.
    ProgressBarIncrement { amount: f64 },
    ChildProcessHasSpawned { pid: u32 },
    ChildProcessStdout {
        /// `None` for messages produced by the orchestrator itself.
        pid: Option<u32>,
        text: String,
        style: Option<OutputStyle>,
    },
    ChildProcessStderr {
        pid: u32,
        text: String,
        style: OutputStyle,
    },
    ChildProcessHasErrored {
        /// `None` if the process never started.
        pid: Option<u32>,
        ordinal: usize,
        error: String,
    },
    ChildProcessRequestsMediaDisplay { image_path: PathBuf },
    ChildProcessHasClosed {
        pid: u32,
        exit_code: Option<i32>,
        summary: RunSummary,
    },
}

impl ChannelEvent {
    pub fn is_closed(&self) -> bool {
        matches!(self, ChannelEvent::ChildProcessHasClosed { .. })
    }
}

/// An event tagged with the caller-supplied channel name of its run.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMessage {
    pub channel: String,
    pub event: ChannelEvent,
}

pub mod orchestrator;
pub mod outcome;
pub mod sink;
pub mod summary;
