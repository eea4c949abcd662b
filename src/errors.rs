// src/errors.rs

//! Crate-wide error types.
//!
//! Every precondition failure of a run is one of these variants and is handed
//! back to the caller as a value; nothing here is meant to cross the caller
//! boundary as a panic.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to assemble the worker process environment.
#[derive(Error, Debug)]
pub enum RuntimeEnvError {
    #[error("{0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Incompatible pipeline version: {0}")]
    IncompatibleVersion(String),

    #[error("Interpreter not found: {0}")]
    InterpreterNotFound(String),

    #[error("Interpreter version R{found} is older than the minimum supported R{minimum}")]
    InterpreterVersionIncompatible { found: u16, minimum: u16 },

    #[error("Executable not found: {0:?}")]
    ExecutableNotFound(PathBuf),

    #[error("Runtime environment error: {0}")]
    RuntimeEnvironment(#[from] RuntimeEnvError),

    #[error("Failed to compute the {module} workload: {source:#}")]
    WorkloadComputation {
        module: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("All anticipated steps are already complete")]
    AlreadyComplete,

    #[error("Failed to spawn worker {ordinal}: {source}")]
    Spawn {
        ordinal: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not signal process {pid}: {reason}")]
    ProcessSignal { pid: u32, reason: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OrchestratorError {
    /// True for outcomes that are reported to the user but are not failures.
    pub fn is_informational(&self) -> bool {
        matches!(self, OrchestratorError::AlreadyComplete)
    }

    pub(crate) fn workload(module: impl Into<String>, source: anyhow::Error) -> Self {
        OrchestratorError::WorkloadComputation {
            module: module.into(),
            source,
        }
    }
}

/// Returns true if the root cause of `err` is an IO permission error.
pub fn is_permission_denied(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|e| e.downcast_ref::<std::io::Error>())
        .any(|e| e.kind() == std::io::ErrorKind::PermissionDenied)
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, OrchestratorError>;
