// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::workload::layout::{LOCKED_MARKER, LOCK_DIR, POPULATION_DIR, STATUS_EXTENSION};

/// Image extensions the pipeline renders into the population tree.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "png"];

/// Pre-filter for watcher events, relative to the product root.
///
/// Only pipeline artefacts pass: `locked` directories and `.status` markers
/// under the lock tree, and rendered images under the population tree.
/// Everything else the pipeline writes (NIfTI volumes, logs, temporary
/// files) is dropped before classification.
#[derive(Clone)]
pub struct PipelineWatchProfile {
    set: GlobSet,
    patterns: Vec<String>,
}

impl fmt::Debug for PipelineWatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineWatchProfile")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl PipelineWatchProfile {
    pub fn new() -> Result<Self> {
        let mut patterns = vec![
            format!("{LOCK_DIR}/**/{LOCKED_MARKER}"),
            format!("{LOCK_DIR}/**/*.{STATUS_EXTENSION}"),
        ];
        patterns.extend(
            IMAGE_EXTENSIONS
                .iter()
                .map(|ext| format!("{POPULATION_DIR}/**/*.{ext}")),
        );

        let set = build_globset(&patterns).context("building pipeline watch globset")?;
        Ok(Self { set, patterns })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// True if `rel_path` (relative to the product root) may be a pipeline
    /// artefact.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.set.is_match(rel_path)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
