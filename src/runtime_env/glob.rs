// src/runtime_env/glob.rs

//! Bounded glob search below a fixed root directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::GlobBuilder;

use crate::errors::is_permission_denied;
use crate::fs::FileSystem;

/// Outcome of a glob search.
#[derive(Debug, Default)]
pub struct GlobMatches {
    pub matches: Vec<PathBuf>,
    /// Directories that could not be read for lack of permission.
    pub denied: Vec<PathBuf>,
}

/// Collect every path below `root` whose root-relative path matches `pattern`.
///
/// `*` does not cross `/`. The walk descends at most as deep as the pattern
/// has components. Unreadable directories are skipped and recorded in
/// [`GlobMatches::denied`] when the cause is a permission error.
pub fn glob_below(fs: &dyn FileSystem, root: &Path, pattern: &str) -> Result<GlobMatches> {
    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))?
        .compile_matcher();

    let max_depth = max_components(pattern);
    let mut found = GlobMatches::default();
    let mut stack = vec![(root.to_path_buf(), 0usize)];

    while let Some((dir, depth)) = stack.pop() {
        let entries = match fs.read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if is_permission_denied(&err) => {
                found.denied.push(dir);
                continue;
            }
            Err(err) if dir == root => return Err(err),
            Err(_) => continue,
        };

        for path in entries {
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            let rel_str = rel.to_string_lossy().replace('\\', "/");
            if matcher.is_match(&rel_str) {
                found.matches.push(path.clone());
            }
            if depth + 1 < max_depth && fs.is_dir(&path) {
                stack.push((path, depth + 1));
            }
        }
    }

    found.matches.sort();
    Ok(found)
}

/// Deepest component count any alternative of `pattern` can match.
fn max_components(pattern: &str) -> usize {
    // `{a,b/c}` alternatives may add separators; count them all as an upper bound.
    pattern.matches('/').count() + 1
}
