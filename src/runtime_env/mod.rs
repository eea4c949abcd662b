// src/runtime_env/mod.rs

//! Runtime environment assembly for worker processes.
//!
//! Two ways to run the pipeline:
//! - interpreter-based: the source tree is executed by a MATLAB interpreter
//!   that first has to be found (`interpreter.rs`);
//! - self-contained: a compiled binary runs against a runtime library whose
//!   native folders must be put on the dynamic library search path
//!   (`self_contained.rs`).
//!
//! Platform differences live in one static table (`platform.rs`).

pub mod glob;
pub mod interpreter;
pub mod platform;
pub mod self_contained;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::config::RuntimeSection;
use crate::errors::{OrchestratorError, Result};
use crate::fs::FileSystem;
use crate::types::ExecutableKind;

pub use interpreter::{InterpreterFlags, InterpreterInfo, locate_interpreter};
pub use platform::PlatformProfile;

/// How the worker program is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    Interpreter {
        flags: InterpreterFlags,
        release: String,
    },
    SelfContained {
        runtime_library_path: PathBuf,
    },
}

/// Everything needed to spawn a worker, apart from its per-worker arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEnvironment {
    pub kind: ExecutableKind,
    /// Binary to execute.
    pub program: PathBuf,
    /// Pipeline install folder.
    pub install_path: PathBuf,
    pub launch: Launch,
    /// Variables set on top of the inherited environment.
    pub vars: BTreeMap<String, String>,
}

/// Builds a [`ProcessEnvironment`] for one executable kind.
#[derive(Debug, Clone)]
pub struct RuntimeEnvironmentBuilder {
    fs: Arc<dyn FileSystem>,
    runtime: RuntimeSection,
    profile: &'static PlatformProfile,
}

impl RuntimeEnvironmentBuilder {
    pub fn new(fs: Arc<dyn FileSystem>, runtime: RuntimeSection) -> Self {
        Self {
            fs,
            runtime,
            profile: PlatformProfile::current(),
        }
    }

    pub fn with_profile(mut self, profile: &'static PlatformProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Resolve the program, flags and environment variables for a run.
    ///
    /// `extras` are applied last and may override the library path variable.
    pub async fn build(
        &self,
        kind: ExecutableKind,
        install_path: &Path,
        runtime_library_path: Option<&Path>,
        extras: &BTreeMap<String, String>,
    ) -> Result<ProcessEnvironment> {
        let mut vars = BTreeMap::new();

        let (program, launch) = match kind {
            ExecutableKind::InterpreterBased => {
                self_contained::source_entry_script(self.fs.as_ref(), install_path)?;
                let info =
                    locate_interpreter(self.fs.as_ref(), self.profile, &self.runtime).await?;
                let flags = InterpreterFlags::for_year(info.year, &self.runtime)?;
                info!(
                    interpreter = ?info.path,
                    release = %info.release,
                    ?flags,
                    "using interpreter"
                );
                (
                    info.path,
                    Launch::Interpreter {
                        flags,
                        release: info.release,
                    },
                )
            }
            ExecutableKind::SelfContained => {
                let runtime_library_path = runtime_library_path.ok_or_else(|| {
                    OrchestratorError::ConfigError(
                        "self-contained execution needs a runtime library path".to_string(),
                    )
                })?;
                let program =
                    self_contained::compiled_executable(self.fs.as_ref(), self.profile, install_path)?;
                let folders = self_contained::runtime_library_folders(
                    self.fs.as_ref(),
                    self.profile,
                    runtime_library_path,
                )?;

                let existing = std::env::var(self.profile.library_path_var).ok();
                let value = self.profile.join_path_list(existing.as_deref(), &folders);
                vars.insert(self.profile.library_path_var.to_string(), value);

                info!(program = ?program, var = self.profile.library_path_var, "using compiled pipeline");
                (
                    program,
                    Launch::SelfContained {
                        runtime_library_path: runtime_library_path.to_path_buf(),
                    },
                )
            }
        };

        vars.extend(extras.iter().map(|(k, v)| (k.clone(), v.clone())));

        Ok(ProcessEnvironment {
            kind,
            program,
            install_path: install_path.to_path_buf(),
            launch,
            vars,
        })
    }
}
