// src/workload/subjects.rs

//! Subject, visit and image discovery under `rawdata/`.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::config::StudyParameters;
use crate::fs::{file_name_str, FileSystem};
use crate::workload::layout::{StudyLayout, RESERVED_FOLDERS};

const VISIT_PREFIX: &str = "ses-";
const ANAT_DIR: &str = "anat";
const PERF_DIR: &str = "perf";

/// A subject folder and its visits, in visit order.
#[derive(Debug, Clone)]
pub struct SubjectEntry {
    pub name: String,
    pub visits: Vec<VisitEntry>,
}

#[derive(Debug, Clone)]
pub struct VisitEntry {
    /// 1-based position among the subject's visits.
    pub index: u32,
    pub dir: PathBuf,
}

/// Which image series a visit contains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitImages {
    pub has_flair: bool,
    pub has_m0: bool,
    pub has_asl: bool,
    /// ASL sessions from the sidecar names: `Some(run)` for
    /// `*_run-<run>_asl.json`, `None` for a plain `*_asl.json`.
    pub asl_sessions: Vec<Option<String>>,
}

/// Skip rules from the study parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipRules {
    pub if_no_flair: bool,
    pub if_no_m0: bool,
    pub if_no_asl: bool,
}

impl SkipRules {
    pub fn from_params(params: &StudyParameters) -> Self {
        Self {
            if_no_flair: params.skip_if_no_flair,
            if_no_m0: params.skip_if_no_m0,
            if_no_asl: params.skip_if_no_asl,
        }
    }

    pub fn admits(&self, images: &VisitImages) -> bool {
        !(self.if_no_flair && !images.has_flair
            || self.if_no_m0 && !images.has_m0
            || self.if_no_asl && !images.has_asl)
    }
}

/// Enumerate subjects under `rawdata/` matching the subject pattern.
pub fn discover_subjects(
    fs: &dyn FileSystem,
    layout: &StudyLayout,
    params: &StudyParameters,
) -> Result<Vec<SubjectEntry>> {
    let pattern = Regex::new(&params.subject_regexp)
        .with_context(|| format!("compiling subject pattern {:?}", params.subject_regexp))?;

    let rawdata = layout.rawdata();
    let mut subjects = Vec::new();

    for path in fs.read_dir(&rawdata)? {
        if !fs.is_dir(&path) {
            continue;
        }
        let Some(name) = file_name_str(&path) else {
            continue;
        };
        if RESERVED_FOLDERS.contains(&name)
            || !pattern.is_match(name)
            || params.excluded_subjects.iter().any(|s| s == name)
        {
            debug!(subject = %name, "not a candidate subject folder");
            continue;
        }

        let visits = discover_visits(fs, &path)?;
        subjects.push(SubjectEntry {
            name: name.to_string(),
            visits,
        });
    }

    Ok(subjects)
}

fn discover_visits(fs: &dyn FileSystem, subject_dir: &Path) -> Result<Vec<VisitEntry>> {
    let visit_dirs: Vec<PathBuf> = fs
        .read_dir(subject_dir)?
        .into_iter()
        .filter(|p| fs.is_dir(p))
        .filter(|p| file_name_str(p).is_some_and(|n| n.starts_with(VISIT_PREFIX)))
        .collect();

    if visit_dirs.is_empty() {
        return Ok(vec![VisitEntry {
            index: 1,
            dir: subject_dir.to_path_buf(),
        }]);
    }

    Ok(visit_dirs
        .into_iter()
        .zip(1u32..)
        .map(|(dir, index)| VisitEntry { index, dir })
        .collect())
}

fn multi_session_sidecar() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_run-([A-Za-z0-9]+)_asl\.json$").expect("static regex"))
}

/// Inspect the `anat/` and `perf/` folders of one visit.
pub fn scan_visit(fs: &dyn FileSystem, visit_dir: &Path) -> Result<VisitImages> {
    let anat = list_names(fs, &visit_dir.join(ANAT_DIR))?;
    let perf = list_names(fs, &visit_dir.join(PERF_DIR))?;

    let mut images = VisitImages {
        has_flair: anat.iter().any(|n| is_nifti_with_suffix(n, "_FLAIR")),
        has_m0: perf.iter().any(|n| is_nifti_with_suffix(n, "_m0scan")),
        has_asl: perf.iter().any(|n| is_nifti_with_suffix(n, "_asl")),
        asl_sessions: Vec::new(),
    };

    for name in perf.iter().filter(|n| n.ends_with("_asl.json")) {
        let session = multi_session_sidecar()
            .captures(name)
            .map(|c| c[1].to_string());
        if !images.asl_sessions.contains(&session) {
            images.asl_sessions.push(session);
        }
    }

    Ok(images)
}

fn list_names(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<String>> {
    if !fs.is_dir(dir) {
        return Ok(Vec::new());
    }
    Ok(fs
        .read_dir(dir)?
        .iter()
        .filter_map(|p| file_name_str(p).map(str::to_string))
        .collect())
}

fn is_nifti_with_suffix(name: &str, suffix: &str) -> bool {
    [".nii", ".nii.gz"].iter().any(|ext| {
        name.strip_suffix(ext)
            .is_some_and(|stem| stem.ends_with(suffix))
    })
}
