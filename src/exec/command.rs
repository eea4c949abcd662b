// src/exec/command.rs

//! Worker command lines.
//!
//! Interpreter-based:
//! `matlab <flags> "cd('<pipeline>'); ExploreASL('<study>', <import>, [s a p], <pause>, <i>, <n>)"`
//!
//! Self-contained:
//! `xASL_latest <runtime> <study> <import> "[s a p]" "<pause> <i> <n>"`
//!
//! `i` is the 1-based worker ordinal and `n` the number of workers; the
//! pipeline uses them to partition subjects between workers.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::config::RunRequest;
use crate::runtime_env::{Launch, ProcessEnvironment};

fn flag(value: bool) -> u8 {
    value as u8
}

/// Quote a path as a MATLAB single-quoted string literal.
fn matlab_string(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', "''"))
}

/// The pipeline call evaluated by the interpreter.
pub fn entry_expression(env: &ProcessEnvironment, request: &RunRequest, ordinal: usize) -> String {
    format!(
        "cd({}); ExploreASL({}, {}, {}, {}, {}, {})",
        matlab_string(&env.install_path),
        matlab_string(&request.study_root),
        flag(request.import),
        request.modules.module_triple(),
        flag(request.pause_before_processing),
        ordinal,
        request.workers,
    )
}

/// Arguments for worker `ordinal` (1-based), excluding the program itself.
pub fn worker_arguments(env: &ProcessEnvironment, request: &RunRequest, ordinal: usize) -> Vec<String> {
    match &env.launch {
        Launch::Interpreter { flags, .. } => {
            let mut args: Vec<String> = flags.args().iter().map(|s| s.to_string()).collect();
            args.push(flags.wrap_expression(&entry_expression(env, request, ordinal)));
            args
        }
        Launch::SelfContained {
            runtime_library_path,
        } => vec![
            runtime_library_path.to_string_lossy().into_owned(),
            request.study_root.to_string_lossy().into_owned(),
            flag(request.import).to_string(),
            request.modules.module_triple(),
            format!(
                "{} {} {}",
                flag(request.pause_before_processing),
                ordinal,
                request.workers
            ),
        ],
    }
}

/// Ready-to-spawn command for worker `ordinal`, run from the study root.
pub fn build_command(env: &ProcessEnvironment, request: &RunRequest, ordinal: usize) -> Command {
    let mut cmd = Command::new(&env.program);
    cmd.args(worker_arguments(env, request, ordinal))
        .envs(&env.vars)
        .current_dir(&request.study_root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}
