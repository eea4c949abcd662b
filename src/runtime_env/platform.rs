// src/runtime_env/platform.rs

//! Per-OS constants, resolved once.

use std::path::PathBuf;
use std::sync::OnceLock;

/// A directory to search for interpreter installs, plus a glob (relative to
/// it) matching the interpreter binary.
#[derive(Debug, Clone, Copy)]
pub struct InstallRoot {
    /// May start with `~/` for the user's home directory.
    pub root: &'static str,
    pub pattern: &'static str,
}

impl InstallRoot {
    pub fn resolve(&self) -> Option<PathBuf> {
        match self.root.strip_prefix("~/") {
            Some(rest) => home_dir().map(|home| home.join(rest)),
            None => Some(PathBuf::from(self.root)),
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

#[derive(Debug)]
pub struct PlatformProfile {
    pub os: &'static str,
    /// Dynamic-library search path variable.
    pub library_path_var: &'static str,
    pub path_delimiter: char,
    /// Native architecture folder of the runtime distribution.
    pub native_arch: &'static str,
    /// Glob (relative to the runtime library folder) for its native folders.
    pub runtime_folder_pattern: &'static str,
    pub interpreter_binary: &'static str,
    pub interpreter_roots: &'static [InstallRoot],
    /// Binary name of the compiled pipeline.
    pub compiled_binary: &'static str,
}

static PROFILES: [PlatformProfile; 3] = [
    PlatformProfile {
        os: "linux",
        library_path_var: "LD_LIBRARY_PATH",
        path_delimiter: ':',
        native_arch: "glnxa64",
        runtime_folder_pattern: "{runtime,bin,sys/os,extern/bin}/glnxa64",
        interpreter_binary: "matlab",
        interpreter_roots: &[
            InstallRoot { root: "/usr/local/MATLAB", pattern: "R*/bin/matlab" },
            InstallRoot { root: "/opt/MATLAB", pattern: "R*/bin/matlab" },
            InstallRoot { root: "/usr/local", pattern: "MATLAB_R*/bin/matlab" },
            InstallRoot { root: "~/MATLAB", pattern: "R*/bin/matlab" },
        ],
        compiled_binary: "xASL_latest",
    },
    PlatformProfile {
        os: "macos",
        library_path_var: "DYLD_LIBRARY_PATH",
        path_delimiter: ':',
        native_arch: "maci64",
        runtime_folder_pattern: "{runtime,bin,sys/os,extern/bin}/maci64",
        interpreter_binary: "matlab",
        interpreter_roots: &[
            InstallRoot { root: "/Applications", pattern: "MATLAB_R*.app/bin/matlab" },
            InstallRoot { root: "~/Applications", pattern: "MATLAB_R*.app/bin/matlab" },
        ],
        compiled_binary: "xASL_latest",
    },
    PlatformProfile {
        os: "windows",
        library_path_var: "PATH",
        path_delimiter: ';',
        native_arch: "win64",
        runtime_folder_pattern: "{runtime,bin}/win64",
        interpreter_binary: "matlab.exe",
        interpreter_roots: &[
            InstallRoot { root: "C:\\Program Files\\MATLAB", pattern: "R*/bin/matlab.exe" },
            InstallRoot { root: "C:\\Program Files (x86)\\MATLAB", pattern: "R*/bin/matlab.exe" },
            InstallRoot { root: "~/MATLAB", pattern: "R*/bin/matlab.exe" },
        ],
        compiled_binary: "xASL_latest.exe",
    },
];

impl PlatformProfile {
    pub fn for_os(os: &str) -> Option<&'static PlatformProfile> {
        PROFILES.iter().find(|p| p.os == os)
    }

    /// Profile of the OS this binary was built for. Unknown unix flavours use
    /// the linux profile.
    pub fn current() -> &'static PlatformProfile {
        static CURRENT: OnceLock<&'static PlatformProfile> = OnceLock::new();
        CURRENT.get_or_init(|| {
            PlatformProfile::for_os(std::env::consts::OS).unwrap_or(&PROFILES[0])
        })
    }

    /// Append `extra` to an existing path list.
    pub fn join_path_list(&self, existing: Option<&str>, extra: &[PathBuf]) -> String {
        let mut parts: Vec<String> = existing
            .filter(|s| !s.is_empty())
            .map(|s| vec![s.to_string()])
            .unwrap_or_default();
        parts.extend(extra.iter().map(|p| p.to_string_lossy().into_owned()));
        parts.join(&self.path_delimiter.to_string())
    }
}
