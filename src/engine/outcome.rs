// src/engine/outcome.rs

use crate::errors::OrchestratorError;
use crate::exec::WorkerHandle;
use crate::types::Severity;

/// Terminal result of a run request, as shown to the user.
///
/// A `Success` outcome only means the workers were spawned; how they ended
/// is reported on the run's channel when the cohort closes.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub title: String,
    pub severity: Severity,
    pub messages: Vec<String>,
    /// Workers of the run, empty unless something was spawned.
    pub workers: Vec<WorkerHandle>,
}

impl RunOutcome {
    pub fn spawned(workers: Vec<WorkerHandle>, messages: Vec<String>) -> Self {
        Self {
            title: "Pipeline started".to_string(),
            severity: Severity::Success,
            messages,
            workers,
        }
    }

    pub fn from_error(err: &OrchestratorError) -> Self {
        let title = match err {
            OrchestratorError::AlreadyComplete => "Nothing to do",
            OrchestratorError::IncompatibleVersion(_) => "Incompatible pipeline version",
            OrchestratorError::InterpreterNotFound(_) => "Interpreter not found",
            OrchestratorError::InterpreterVersionIncompatible { .. } => {
                "Interpreter version not supported"
            }
            OrchestratorError::ExecutableNotFound(_) => "Pipeline executable not found",
            OrchestratorError::RuntimeEnvironment(_) => "Runtime environment error",
            OrchestratorError::WorkloadComputation { .. } => "Could not estimate the workload",
            OrchestratorError::Spawn { .. } => "Could not start the pipeline",
            OrchestratorError::ProcessSignal { .. } => "Could not signal process",
            OrchestratorError::ConfigError(_) | OrchestratorError::TomlError(_) => {
                "Invalid run request"
            }
            OrchestratorError::IoError(_) | OrchestratorError::Other(_) => "Run failed",
        };
        let severity = if err.is_informational() {
            Severity::Info
        } else {
            Severity::Error
        };

        Self {
            title: title.to_string(),
            severity,
            messages: vec![err.to_string()],
            workers: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.severity == Severity::Success
    }
}
