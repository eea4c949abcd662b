// src/engine/summary.rs

use std::path::Path;

use crate::fs::FileSystem;
use crate::steps::WorkloadTable;
use crate::watch::grammar::{self, PipelinePath};
use crate::workload::{AnticipatedWorkload, StudyLayout};

/// How one worker process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitRecord {
    pub pid: u32,
    /// `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
}

impl ExitRecord {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// End-of-run report, built once the last worker of a cohort has exited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub exit_records: Vec<ExitRecord>,
    /// Anticipated markers that are not on disk.
    pub num_incomplete_steps: usize,
    pub missed_steps_messages: Vec<String>,
}

impl RunSummary {
    /// Compare the anticipated markers with what is actually on disk.
    pub fn compute(
        fs: &dyn FileSystem,
        layout: &StudyLayout,
        table: &WorkloadTable,
        workload: &AnticipatedWorkload,
        exit_records: Vec<ExitRecord>,
    ) -> Self {
        let missed_steps_messages: Vec<String> = workload
            .paths()
            .iter()
            .filter(|path| !fs.exists(path))
            .map(|path| missed_step_message(layout.product_root(), table, path))
            .collect();

        Self {
            exit_records,
            num_incomplete_steps: missed_steps_messages.len(),
            missed_steps_messages,
        }
    }

    /// Every worker exited with code 0.
    pub fn workers_succeeded(&self) -> bool {
        self.exit_records.iter().all(ExitRecord::succeeded)
    }

    pub fn all_succeeded(&self) -> bool {
        self.workers_succeeded() && self.num_incomplete_steps == 0
    }
}

fn missed_step_message(product_root: &Path, table: &WorkloadTable, path: &Path) -> String {
    let classified = path
        .strip_prefix(product_root)
        .ok()
        .map(|rel| grammar::classify(&rel.to_string_lossy().replace('\\', "/")));

    match classified {
        Some(PipelinePath::StatusFile { key, basename }) => match table.get(&basename) {
            Some(step) => format!("{key}: \"{}\" did not complete", step.description),
            None => format!("{key}: {basename} did not complete"),
        },
        _ => format!("{} was not created", path.display()),
    }
}
