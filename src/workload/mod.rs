// src/workload/mod.rs

//! Workload estimation.
//!
//! Before any worker starts, the study's raw data is walked to predict every
//! `.status` marker the pipeline will write for the requested modules. The
//! result drives progress scaling (each marker is worth
//! `weight / total_weight`) and the end-of-run summary (anticipated markers
//! that never appeared).
//!
//! Markers that already exist are left out, so resuming a partially
//! processed study only counts the remaining work. Lock directories that do
//! not exist yet are created on the way; this is idempotent.

pub mod layout;
pub mod subjects;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result as AnyResult};
use tracing::{debug, info};

use crate::config::StudyParameters;
use crate::errors::{OrchestratorError, Result};
use crate::fs::FileSystem;
use crate::steps::WorkloadTable;
use crate::types::{ModuleName, ModuleSelection};

pub use layout::{LockKey, StudyLayout, SubjectVisit};
pub use subjects::{SkipRules, SubjectEntry, VisitEntry, VisitImages};

/// The markers a run is expected to produce, and their summed weight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnticipatedWorkload {
    paths: BTreeSet<PathBuf>,
    total_weight: f64,
}

impl AnticipatedWorkload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a marker path. Returns false (and adds no weight) if it was
    /// already present.
    pub fn insert(&mut self, path: PathBuf, weight: f64) -> bool {
        if self.paths.insert(path) {
            self.total_weight += weight;
            true
        } else {
            false
        }
    }

    /// Union with another workload computed against the same table.
    pub fn merge(&mut self, other: AnticipatedWorkload, table: &WorkloadTable) {
        for path in other.paths {
            let weight = table.descriptor_for_path(&path).map_or(0.0, |d| d.weight);
            self.insert(path, weight);
        }
    }

    pub fn paths(&self) -> &BTreeSet<PathBuf> {
        &self.paths
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Predicts the markers of a run from the study's raw data.
#[derive(Debug)]
pub struct WorkloadEstimator<'a> {
    fs: &'a dyn FileSystem,
    layout: &'a StudyLayout,
    table: &'a WorkloadTable,
    params: &'a StudyParameters,
}

impl<'a> WorkloadEstimator<'a> {
    pub fn new(
        fs: &'a dyn FileSystem,
        layout: &'a StudyLayout,
        table: &'a WorkloadTable,
        params: &'a StudyParameters,
    ) -> Self {
        Self {
            fs,
            layout,
            table,
            params,
        }
    }

    /// Estimate the workload of `selection`.
    ///
    /// An empty result means everything is already done; that is not an
    /// error here, callers decide how to report it.
    pub fn estimate(&self, selection: ModuleSelection) -> Result<AnticipatedWorkload> {
        let workload = match selection {
            ModuleSelection::Structural => self
                .structural()
                .map_err(|e| OrchestratorError::workload("Structural", e))?,
            ModuleSelection::Asl => self
                .asl()
                .map_err(|e| OrchestratorError::workload("ASL", e))?,
            ModuleSelection::Population => self
                .population()
                .map_err(|e| OrchestratorError::workload("Population", e))?,
            ModuleSelection::Both => {
                // Both halves are always evaluated so a failure in one does
                // not hide a failure in the other.
                match (self.structural(), self.asl()) {
                    (Ok(mut structural), Ok(asl)) => {
                        structural.merge(asl, self.table);
                        structural
                    }
                    (Err(e), Ok(_)) => return Err(OrchestratorError::workload("Structural", e)),
                    (Ok(_), Err(e)) => return Err(OrchestratorError::workload("ASL", e)),
                    (Err(s), Err(a)) => {
                        return Err(OrchestratorError::workload(
                            "Structural and ASL",
                            anyhow!("Structural: {s:#}; ASL: {a:#}"),
                        ));
                    }
                }
            }
        };

        info!(
            ?selection,
            steps = workload.len(),
            total_weight = workload.total_weight(),
            "estimated workload"
        );
        Ok(workload)
    }

    fn structural(&self) -> AnyResult<AnticipatedWorkload> {
        let mut workload = AnticipatedWorkload::new();
        let rules = SkipRules::from_params(self.params);
        let mut qualified = 0usize;

        for subject in subjects::discover_subjects(self.fs, self.layout, self.params)? {
            let Some(scans) = self.scan_admitted(&subject, rules)? else {
                continue;
            };
            qualified += 1;
            let multi_visit = subject.visits.len() > 1;

            for (visit, images) in &scans {
                let key = LockKey::for_subject(ModuleName::Structural, &subject.name, visit.index, None);
                self.add_steps(&mut workload, &key, ModuleName::Structural)?;

                if images.has_flair {
                    self.add_steps(&mut workload, &key, ModuleName::StructuralFlair)?;
                }

                if multi_visit && self.params.run_long_reg && visit.index == 1 {
                    let key = LockKey::for_subject(ModuleName::LongReg, &subject.name, 1, None);
                    self.add_steps(&mut workload, &key, ModuleName::LongReg)?;
                }
            }
        }

        if qualified > 1 && self.params.run_dartel {
            let key = LockKey::for_study(ModuleName::Dartel);
            self.add_steps(&mut workload, &key, ModuleName::Dartel)?;
        }

        Ok(workload)
    }

    fn asl(&self) -> AnyResult<AnticipatedWorkload> {
        let mut workload = AnticipatedWorkload::new();
        let rules = SkipRules::from_params(self.params);

        for subject in subjects::discover_subjects(self.fs, self.layout, self.params)? {
            let Some(scans) = self.scan_admitted(&subject, rules)? else {
                continue;
            };

            for (visit, images) in &scans {
                for session in &images.asl_sessions {
                    let session = session.as_ref().map(|run| format!("ASL_{run}"));
                    let key =
                        LockKey::for_subject(ModuleName::Asl, &subject.name, visit.index, session);
                    self.add_steps(&mut workload, &key, ModuleName::Asl)?;
                }
            }
        }

        Ok(workload)
    }

    fn population(&self) -> AnyResult<AnticipatedWorkload> {
        let mut workload = AnticipatedWorkload::new();
        let key = LockKey::for_study(ModuleName::Population);
        self.add_steps(&mut workload, &key, ModuleName::Population)?;
        Ok(workload)
    }

    /// Scan every visit of `subject`; `None` if any visit fails a skip rule.
    fn scan_admitted<'s>(
        &self,
        subject: &'s SubjectEntry,
        rules: SkipRules,
    ) -> AnyResult<Option<Vec<(&'s VisitEntry, VisitImages)>>> {
        let mut scans = Vec::with_capacity(subject.visits.len());
        for visit in &subject.visits {
            let images = subjects::scan_visit(self.fs, &visit.dir)?;
            if !rules.admits(&images) {
                debug!(subject = %subject.name, visit = visit.index, "skipped by skip rules");
                return Ok(None);
            }
            scans.push((visit, images));
        }
        Ok(Some(scans))
    }

    /// Add every not-yet-written marker of `module` under the lock dir of `key`.
    fn add_steps(
        &self,
        workload: &mut AnticipatedWorkload,
        key: &LockKey,
        module: ModuleName,
    ) -> AnyResult<()> {
        let dir = self.layout.lock_dir(key);
        if !self.fs.is_dir(&dir) {
            self.fs.create_dir_all(&dir)?;
        }

        for (basename, step) in self.table.steps_for(module) {
            let marker = dir.join(basename);
            if self.fs.exists(&marker) {
                continue;
            }
            workload.insert(marker, step.weight);
        }
        Ok(())
    }
}
