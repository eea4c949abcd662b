// src/steps/mod.rs

//! Versioned catalogue of the marker files each pipeline release writes.
//!
//! A [`WorkloadTable`] maps the basename of every `.status` marker to the
//! module it belongs to, a human-readable description and a relative weight.
//! Tables are built once per process and never mutated; supporting a new
//! pipeline release means adding a new table.

mod catalogue;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use tracing::debug;

use crate::errors::{OrchestratorError, Result};
use crate::fs::{file_name_str, FileSystem};
use crate::types::ModuleName;

use catalogue::StepRow;

/// Prefix of the version file shipped in every pipeline install.
pub const VERSION_FILE_PREFIX: &str = "VERSION";

/// One expected processing step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDescriptor {
    pub module: ModuleName,
    pub description: &'static str,
    pub weight: f64,
}

/// All steps known for a single pipeline version, keyed by marker basename.
#[derive(Debug)]
pub struct WorkloadTable {
    version: &'static str,
    steps: BTreeMap<&'static str, StepDescriptor>,
}

impl WorkloadTable {
    fn from_rows(version: &'static str, rows: &[StepRow]) -> Self {
        let steps = rows
            .iter()
            .map(|&(basename, module, description, weight)| {
                (
                    basename,
                    StepDescriptor {
                        module,
                        description,
                        weight,
                    },
                )
            })
            .collect();
        Self { version, steps }
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    /// Descriptor for a marker basename (e.g. `060_Segment_T1w.status`).
    pub fn get(&self, basename: &str) -> Option<&StepDescriptor> {
        self.steps.get(basename)
    }

    /// Descriptor for the marker at `path`, looked up by its file name.
    pub fn descriptor_for_path(&self, path: &Path) -> Option<&StepDescriptor> {
        file_name_str(path).and_then(|name| self.get(name))
    }

    /// Steps of one module, in execution order.
    pub fn steps_for(
        &self,
        module: ModuleName,
    ) -> impl Iterator<Item = (&'static str, &StepDescriptor)> + '_ {
        self.steps
            .iter()
            .filter(move |(_, d)| d.module == module)
            .map(|(name, d)| (*name, d))
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn tables() -> &'static BTreeMap<&'static str, WorkloadTable> {
    static TABLES: OnceLock<BTreeMap<&'static str, WorkloadTable>> = OnceLock::new();
    TABLES.get_or_init(|| {
        [
            ("VERSION_1.10.0", catalogue::V1_10_0),
            ("VERSION_1.11.0", catalogue::V1_11_0),
        ]
        .into_iter()
        .map(|(version, rows)| (version, WorkloadTable::from_rows(version, rows)))
        .collect()
    })
}

/// Look up the step table for a pipeline version key.
pub fn lookup(version: &str) -> Result<&'static WorkloadTable> {
    tables().get(version.trim()).ok_or_else(|| {
        OrchestratorError::IncompatibleVersion(format!(
            "{version} is not supported (supported: {})",
            supported_versions().collect::<Vec<_>>().join(", ")
        ))
    })
}

pub fn supported_versions() -> impl Iterator<Item = &'static str> {
    tables().keys().copied()
}

/// Find the version key of the pipeline installed at `install_path`.
///
/// The key is the basename of the `VERSION*` file in the install directory.
pub fn detect_version_key(fs: &dyn FileSystem, install_path: &Path) -> Result<String> {
    let entries = fs.read_dir(install_path).map_err(|e| {
        OrchestratorError::IncompatibleVersion(format!(
            "could not read pipeline directory {install_path:?}: {e:#}"
        ))
    })?;

    let key = entries
        .iter()
        .filter(|p| fs.is_file(p))
        .filter_map(|p| file_name_str(p))
        .find(|name| name.starts_with(VERSION_FILE_PREFIX))
        .map(str::to_string)
        .ok_or_else(|| {
            OrchestratorError::IncompatibleVersion(format!(
                "no {VERSION_FILE_PREFIX} file found in {install_path:?}"
            ))
        })?;

    debug!(version = %key, path = ?install_path, "detected pipeline version");
    Ok(key)
}
