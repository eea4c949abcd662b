// src/runtime_env/self_contained.rs

//! Environment for the compiled pipeline distribution.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{OrchestratorError, Result, RuntimeEnvError};
use crate::fs::FileSystem;
use crate::runtime_env::glob::glob_below;
use crate::runtime_env::platform::PlatformProfile;

/// Entry script of the source distribution.
pub const SOURCE_ENTRY_SCRIPT: &str = "ExploreASL.m";

/// Native folders of the runtime library, as absolute paths.
///
/// No match at all is a hard error. Folders that could not be read for lack of
/// permission are reported as such, so the user is not told to install a
/// runtime that is actually there.
pub fn runtime_library_folders(
    fs: &dyn FileSystem,
    profile: &PlatformProfile,
    runtime_library_path: &Path,
) -> Result<Vec<PathBuf>> {
    if !fs.is_dir(runtime_library_path) {
        return Err(RuntimeEnvError::NotFound(format!(
            "runtime library folder {runtime_library_path:?} does not exist"
        ))
        .into());
    }

    let found = glob_below(fs, runtime_library_path, profile.runtime_folder_pattern)
        .map_err(|e| {
            if crate::errors::is_permission_denied(&e) {
                RuntimeEnvError::PermissionDenied(format!("{runtime_library_path:?}: {e:#}"))
            } else {
                RuntimeEnvError::NotFound(format!("{runtime_library_path:?}: {e:#}"))
            }
        })?;

    if !found.denied.is_empty() {
        return Err(RuntimeEnvError::PermissionDenied(format!(
            "could not read {:?} below the runtime library folder",
            found.denied
        ))
        .into());
    }

    let folders: Vec<PathBuf> = found
        .matches
        .into_iter()
        .filter(|p| fs.is_dir(p))
        .map(|p| fs.canonicalize(&p).unwrap_or(p))
        .collect();

    if folders.is_empty() {
        return Err(RuntimeEnvError::NotFound(format!(
            "no {} folders matching {} below {runtime_library_path:?}",
            profile.native_arch, profile.runtime_folder_pattern
        ))
        .into());
    }

    debug!(?folders, "resolved runtime library folders");
    Ok(folders)
}

/// Compiled pipeline binary inside the install folder.
pub fn compiled_executable(
    fs: &dyn FileSystem,
    profile: &PlatformProfile,
    install_path: &Path,
) -> Result<PathBuf> {
    let exe = install_path.join(profile.compiled_binary);
    if fs.is_file(&exe) {
        Ok(exe)
    } else {
        Err(OrchestratorError::ExecutableNotFound(exe))
    }
}

/// Check that the source distribution has its entry script.
pub fn source_entry_script(fs: &dyn FileSystem, install_path: &Path) -> Result<PathBuf> {
    let script = install_path.join(SOURCE_ENTRY_SCRIPT);
    if fs.is_file(&script) {
        Ok(script)
    } else {
        Err(OrchestratorError::ExecutableNotFound(script))
    }
}
