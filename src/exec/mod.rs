// src/exec/mod.rs

//! Process execution layer.
//!
//! Runs the pipeline's worker processes with `tokio::process::Command` and
//! reports their lifecycle on the run's channel.
//!
//! - [`command`] builds the per-worker command line.
//! - [`worker`] owns one worker's output relay and exit reporting.
//! - [`supervisor`] spawns a cohort and closes the run when the last worker
//!   exits.
//! - [`registry`] tracks live process identifiers across runs.
//! - [`signals`] delivers pause/resume/terminate.

pub mod command;
pub mod registry;
pub mod signals;
pub mod supervisor;
pub mod worker;

pub use command::{build_command, worker_arguments};
pub use registry::ProcessRegistry;
pub use signals::{send_signal, ProcessSignal};
pub use supervisor::{Cohort, ProcessSupervisor};
pub use worker::{LineCarry, WorkerHandle, WorkerStatus};
