// src/exec/signals.rs

//! Pause, resume and terminate by process identifier.
//!
//! These are plain OS signals (stop, continue, kill). There is no handshake
//! with the worker, and the target may already have exited; that surfaces
//! as a [`OrchestratorError::ProcessSignal`] the caller can ignore.

use tracing::info;

use crate::errors::{OrchestratorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessSignal {
    Pause,
    Resume,
    Terminate,
}

#[cfg(unix)]
pub fn send_signal(pid: u32, signal: ProcessSignal) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| OrchestratorError::ProcessSignal {
        pid,
        reason: "not a valid process identifier".to_string(),
    })?;
    let sig = match signal {
        ProcessSignal::Pause => Signal::SIGSTOP,
        ProcessSignal::Resume => Signal::SIGCONT,
        ProcessSignal::Terminate => Signal::SIGKILL,
    };

    kill(Pid::from_raw(raw), sig).map_err(|errno| OrchestratorError::ProcessSignal {
        pid,
        reason: match errno {
            Errno::ESRCH => "no such process".to_string(),
            Errno::EPERM => "operation not permitted".to_string(),
            other => other.desc().to_string(),
        },
    })?;

    info!(pid, ?signal, "signal delivered");
    Ok(())
}

#[cfg(not(unix))]
pub fn send_signal(pid: u32, signal: ProcessSignal) -> Result<()> {
    match signal {
        ProcessSignal::Terminate => {
            let status = std::process::Command::new("taskkill")
                .args(["/PID", &pid.to_string(), "/T", "/F"])
                .status()
                .map_err(|e| OrchestratorError::ProcessSignal {
                    pid,
                    reason: e.to_string(),
                })?;
            if !status.success() {
                return Err(OrchestratorError::ProcessSignal {
                    pid,
                    reason: format!("taskkill exited with {status}"),
                });
            }
            info!(pid, ?signal, "process terminated");
            Ok(())
        }
        ProcessSignal::Pause | ProcessSignal::Resume => Err(OrchestratorError::ProcessSignal {
            pid,
            reason: format!("{signal:?} is not supported on this platform"),
        }),
    }
}
