// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::{Path, PathBuf};

/// Turns event paths into forward-slash strings relative to a fixed root.
///
/// The canonical form of the root is computed once. Event paths are first
/// stripped against the root as given; only if that fails (symlinked temp
/// dirs, `/private/var` on macOS) is the event path canonicalized and
/// compared against the canonical root.
#[derive(Debug, Clone)]
pub struct RootRelativizer {
    root: PathBuf,
    canonical_root: Option<PathBuf>,
}

impl RootRelativizer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let canonical_root = root.canonicalize().ok().filter(|c| c != &root);
        Self {
            root,
            canonical_root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `None` if `path` is not below the root.
    pub fn relative(&self, path: &Path) -> Option<String> {
        if let Ok(rel) = path.strip_prefix(&self.root) {
            return Some(to_slash(rel));
        }

        if let Some(canonical_root) = &self.canonical_root {
            if let Ok(rel) = path.strip_prefix(canonical_root) {
                return Some(to_slash(rel));
            }
            // The file may already be gone; canonicalize its parent instead.
            let (parent, name) = (path.parent()?, path.file_name()?);
            let parent = parent.canonicalize().ok()?;
            if let Ok(rel) = parent.join(name).strip_prefix(canonical_root) {
                return Some(to_slash(rel));
            }
        }

        None
    }
}

fn to_slash(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}
