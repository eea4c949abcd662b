// src/runtime_env/interpreter.rs

//! Locating the MATLAB interpreter and deciding how to invoke it.
//!
//! Discovery tries, in order:
//! 1. the configured interpreter path, then the OS search path;
//! 2. the release encoded in that binary's path (`.../R2021a/bin/matlab`);
//! 3. asking the binary itself, with the `-batch` flags and then the legacy
//!    `-nodesktop -nosplash -r` flags;
//! 4. globbing the OS-specific install roots.
//!
//! Each step records why it came up empty. Only a permission error (an
//! unreadable install root, an interpreter we may not execute) aborts the
//! search early.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::RuntimeSection;
use crate::errors::{is_permission_denied, OrchestratorError, Result, RuntimeEnvError};
use crate::fs::FileSystem;
use crate::runtime_env::glob::glob_below;
use crate::runtime_env::platform::PlatformProfile;

const VERSION_EXPRESSION: &str = "disp(version('-release'))";

/// A located interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterInfo {
    pub path: PathBuf,
    /// Release year, e.g. 2021 for R2021a.
    pub year: u16,
    /// Full release name, e.g. `R2021a`.
    pub release: String,
}

/// Command-line flags for non-interactive execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterFlags {
    /// `-nodesktop -nosplash -r`; the expression must end with `exit`.
    Legacy,
    /// `-batch`.
    Batch,
}

impl InterpreterFlags {
    /// Pick the flag set for a release year, rejecting releases that are too old.
    pub fn for_year(year: u16, runtime: &RuntimeSection) -> Result<Self> {
        if year < runtime.minimum_interpreter_year {
            return Err(OrchestratorError::InterpreterVersionIncompatible {
                found: year,
                minimum: runtime.minimum_interpreter_year,
            });
        }
        if year < runtime.batch_flag_year {
            Ok(InterpreterFlags::Legacy)
        } else {
            Ok(InterpreterFlags::Batch)
        }
    }

    pub fn args(&self) -> &'static [&'static str] {
        match self {
            InterpreterFlags::Legacy => &["-nodesktop", "-nosplash", "-r"],
            InterpreterFlags::Batch => &["-batch"],
        }
    }

    /// Wrap an expression so the interpreter exits once it is evaluated.
    pub fn wrap_expression(&self, expression: &str) -> String {
        match self {
            InterpreterFlags::Legacy => format!("{expression}; exit;"),
            InterpreterFlags::Batch => expression.to_string(),
        }
    }
}

fn release_in_path() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"R(\d{4})([ab])").expect("static regex"))
}

fn release_in_output() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*R?(\d{4})([ab])\s*$").expect("static regex"))
}

/// Parse a release (`R2021a`) out of a path or a version string.
pub fn parse_release(text: &str, re: &Regex) -> Option<(u16, String)> {
    let caps = re.captures(text)?;
    let year: u16 = caps[1].parse().ok()?;
    Some((year, format!("R{}{}", &caps[1], &caps[2])))
}

/// Release encoded in an install path, e.g. `/usr/local/MATLAB/R2021a/bin/matlab`.
pub fn release_from_path(path: &Path) -> Option<(u16, String)> {
    parse_release(&path.to_string_lossy(), release_in_path())
}

enum Probe {
    Found(InterpreterInfo),
    Missing(String),
}

/// Locate the interpreter binary and its release.
pub async fn locate_interpreter(
    fs: &dyn FileSystem,
    profile: &PlatformProfile,
    runtime: &RuntimeSection,
) -> Result<InterpreterInfo> {
    let mut reasons = Vec::new();

    let candidate = match search_path_candidate(fs, profile, runtime) {
        Ok(path) => Some(path),
        Err(reason) => {
            reasons.push(reason);
            None
        }
    };

    if let Some(path) = candidate {
        match from_binary_path(&path) {
            Probe::Found(info) => return Ok(info),
            Probe::Missing(reason) => reasons.push(reason),
        }
        match ask_interpreter(&path, runtime.version_probe_timeout()).await? {
            Probe::Found(info) => return Ok(info),
            Probe::Missing(reason) => reasons.push(reason),
        }
    }

    match search_install_roots(fs, profile)? {
        Probe::Found(info) => Ok(info),
        Probe::Missing(reason) => {
            reasons.push(reason);
            Err(OrchestratorError::InterpreterNotFound(reasons.join("; ")))
        }
    }
}

fn search_path_candidate(
    fs: &dyn FileSystem,
    profile: &PlatformProfile,
    runtime: &RuntimeSection,
) -> std::result::Result<PathBuf, String> {
    if let Some(path) = &runtime.interpreter_path {
        if fs.is_file(path) {
            return Ok(path.clone());
        }
        return Err(format!("configured interpreter {path:?} does not exist"));
    }

    which::which(profile.interpreter_binary).map_err(|e| {
        format!(
            "{} is not on the search path ({e})",
            profile.interpreter_binary
        )
    })
}

fn from_binary_path(path: &Path) -> Probe {
    // Resolve symlinks such as /usr/local/bin/matlab -> .../R2021a/bin/matlab.
    let resolved = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    match release_from_path(&resolved) {
        Some((year, release)) => {
            debug!(path = ?path, %release, "interpreter release parsed from path");
            Probe::Found(InterpreterInfo {
                path: path.to_path_buf(),
                year,
                release,
            })
        }
        None => Probe::Missing(format!("no release found in path {resolved:?}")),
    }
}

async fn ask_interpreter(path: &Path, timeout: Duration) -> Result<Probe> {
    let attempts = [InterpreterFlags::Batch, InterpreterFlags::Legacy];
    let mut failures = Vec::new();

    for flags in attempts {
        let mut cmd = Command::new(path);
        cmd.args(flags.args())
            .arg(flags.wrap_expression(VERSION_EXPRESSION))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(RuntimeEnvError::PermissionDenied(format!(
                    "cannot execute interpreter {path:?}: {e}"
                ))
                .into());
            }
            Ok(Err(e)) => {
                failures.push(format!("{:?}: {e}", flags.args()));
                continue;
            }
            Err(_) => {
                failures.push(format!("{:?}: timed out", flags.args()));
                continue;
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Some((year, release)) = parse_release(&stdout, release_in_output()) {
            info!(path = ?path, %release, "interpreter reported its release");
            return Ok(Probe::Found(InterpreterInfo {
                path: path.to_path_buf(),
                year,
                release,
            }));
        }
        failures.push(format!("{:?}: no release in output", flags.args()));
    }

    Ok(Probe::Missing(format!(
        "could not query the release of {path:?} ({})",
        failures.join(", ")
    )))
}

fn search_install_roots(fs: &dyn FileSystem, profile: &PlatformProfile) -> Result<Probe> {
    let mut best: Option<InterpreterInfo> = None;
    let mut searched = Vec::new();

    for root in profile.interpreter_roots {
        let Some(dir) = root.resolve() else {
            continue;
        };
        if !fs.is_dir(&dir) {
            searched.push(dir);
            continue;
        }

        let found = glob_below(fs, &dir, root.pattern).map_err(|e| {
            if is_permission_denied(&e) {
                RuntimeEnvError::PermissionDenied(format!("{dir:?}: {e:#}")).into()
            } else {
                OrchestratorError::Other(e.context("searching interpreter installs"))
            }
        })?;
        if let Some(denied) = found.denied.first() {
            return Err(RuntimeEnvError::PermissionDenied(format!(
                "cannot read {denied:?} while searching for {}",
                profile.interpreter_binary
            ))
            .into());
        }

        for path in found.matches {
            if let Some((year, release)) = release_from_path(&path) {
                if best.as_ref().is_none_or(|b| year > b.year) {
                    best = Some(InterpreterInfo { path, year, release });
                }
            }
        }
        searched.push(dir);
    }

    Ok(match best {
        Some(info) => {
            info!(path = ?info.path, release = %info.release, "interpreter found in install root");
            Probe::Found(info)
        }
        None => Probe::Missing(format!("no install found under {searched:?}")),
    })
}
