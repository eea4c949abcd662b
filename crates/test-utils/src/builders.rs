#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use xasl_run::config::{RunRequest, StudyParameters};
use xasl_run::fs::FileSystem;
use xasl_run::runtime_env::PlatformProfile;
use xasl_run::types::{ExecutableKind, ModuleSelection};

/// Builds a BIDS-like study tree through any [`FileSystem`].
///
/// ```ignore
/// let fs = MockFileSystem::new();
/// let root = StudyBuilder::new(&fs, "/study")
///     .subject("sub-01")
///     .flair("sub-01")
///     .build();
/// ```
pub struct StudyBuilder<'a> {
    fs: &'a dyn FileSystem,
    root: PathBuf,
}

impl<'a> StudyBuilder<'a> {
    /// Creates `rawdata/`, `sourcedata/` and `derivatives/` under `root`.
    pub fn new(fs: &'a dyn FileSystem, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        for dir in ["rawdata", "sourcedata", "derivatives"] {
            fs.create_dir_all(&root.join(dir))
                .expect("failed to create study folder");
        }
        Self { fs, root }
    }

    fn touch(self, rel: impl AsRef<Path>) -> Self {
        self.fs
            .write(&self.root.join(rel), b"")
            .expect("failed to write study file");
        self
    }

    fn visit_dir(subject: &str, visit: Option<&str>) -> PathBuf {
        let mut dir = PathBuf::from("rawdata").join(subject);
        if let Some(visit) = visit {
            dir.push(visit);
        }
        dir
    }

    /// A subject with a T1w scan and no visit folders.
    pub fn subject(self, name: &str) -> Self {
        self.touch(Self::visit_dir(name, None).join(format!("anat/{name}_T1w.nii.gz")))
    }

    /// A T1w scan in visit folder `visit` (e.g. `ses-1`).
    pub fn subject_visit(self, name: &str, visit: &str) -> Self {
        self.touch(Self::visit_dir(name, Some(visit)).join(format!("anat/{name}_{visit}_T1w.nii.gz")))
    }

    pub fn flair(self, name: &str) -> Self {
        self.flair_in(name, None)
    }

    pub fn flair_in(self, name: &str, visit: Option<&str>) -> Self {
        self.touch(Self::visit_dir(name, visit).join(format!("anat/{name}_FLAIR.nii.gz")))
    }

    pub fn m0(self, name: &str) -> Self {
        self.touch(Self::visit_dir(name, None).join(format!("perf/{name}_m0scan.nii.gz")))
    }

    /// An ASL series with its sidecar; `run` selects the multi-session naming.
    pub fn asl(self, name: &str, run: Option<&str>) -> Self {
        self.asl_in(name, None, run)
    }

    pub fn asl_in(self, name: &str, visit: Option<&str>, run: Option<&str>) -> Self {
        let stem = match run {
            Some(run) => format!("{name}_run-{run}_asl"),
            None => format!("{name}_asl"),
        };
        let perf = Self::visit_dir(name, visit).join("perf");
        self.touch(perf.join(format!("{stem}.nii.gz")))
            .touch(perf.join(format!("{stem}.json")))
    }

    /// Any extra file, relative to the study root.
    pub fn file(self, rel: &str) -> Self {
        self.touch(rel)
    }

    pub fn build(self) -> PathBuf {
        self.root
    }
}

/// Builder for a [`RunRequest`] with test-friendly defaults.
pub struct RunRequestBuilder {
    request: RunRequest,
}

impl RunRequestBuilder {
    pub fn new(study_root: impl Into<PathBuf>, pipeline_path: impl Into<PathBuf>) -> Self {
        Self {
            request: RunRequest {
                study_root: study_root.into(),
                modules: ModuleSelection::Structural,
                workers: 1,
                executable_kind: ExecutableKind::SelfContained,
                pipeline_path: pipeline_path.into(),
                runtime_library_path: None,
                import: false,
                pause_before_processing: false,
                environment: BTreeMap::new(),
                study: StudyParameters::default(),
            },
        }
    }

    pub fn modules(mut self, modules: ModuleSelection) -> Self {
        self.request.modules = modules;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.request.workers = workers;
        self
    }

    pub fn executable_kind(mut self, kind: ExecutableKind) -> Self {
        self.request.executable_kind = kind;
        self
    }

    pub fn runtime_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.request.runtime_library_path = Some(path.into());
        self
    }

    pub fn env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.request.environment.insert(key.to_string(), value.into());
        self
    }

    pub fn study(mut self, study: StudyParameters) -> Self {
        self.request.study = study;
        self
    }

    pub fn build(self) -> RunRequest {
        self.request
    }
}

/// A fake compiled pipeline: a `VERSION_*` file, a runtime library folder
/// and an executable shell script standing in for the compiled binary.
pub struct PipelineInstall {
    pub install_path: PathBuf,
    pub runtime_library_path: PathBuf,
}

impl PipelineInstall {
    /// Lay out an install under `dir` whose binary runs `script_body` with
    /// `/bin/sh`.
    #[cfg(unix)]
    pub fn compiled(dir: &Path, version_key: &str, script_body: &str) -> Self {
        let profile = PlatformProfile::current();
        let install_path = dir.join("xasl");
        let runtime_library_path = dir.join("runtime_lib");
        std::fs::create_dir_all(&install_path).expect("create install dir");
        std::fs::create_dir_all(runtime_library_path.join("runtime").join(profile.native_arch))
            .expect("create runtime library dir");
        std::fs::write(install_path.join(version_key), b"").expect("write version file");

        shell_script(&install_path.join(profile.compiled_binary), script_body);

        Self {
            install_path,
            runtime_library_path,
        }
    }

    /// A source install (version file and entry script only), through `fs`.
    pub fn source(fs: &dyn FileSystem, install_path: &Path, version_key: &str) -> PathBuf {
        fs.write(&install_path.join(version_key), b"")
            .expect("write version file");
        fs.write(&install_path.join("ExploreASL.m"), b"function ExploreASL(varargin)\nend\n")
            .expect("write entry script");
        install_path.to_path_buf()
    }
}

/// Write an executable `/bin/sh` script running `body`, creating parents.
#[cfg(unix)]
pub fn shell_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create script dir");
    }
    std::fs::write(path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .expect("make script executable");
}

/// A directory with every permission bit cleared until this is dropped.
#[cfg(unix)]
pub struct UnreadableDir {
    path: PathBuf,
}

#[cfg(unix)]
impl UnreadableDir {
    /// `None` when the directory can still be listed afterwards, which is
    /// the case for a privileged user.
    pub fn new(path: impl Into<PathBuf>) -> Option<Self> {
        use std::os::unix::fs::PermissionsExt;

        let path = path.into();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000))
            .expect("clear directory permissions");
        let dir = Self { path };
        if std::fs::read_dir(&dir.path).is_ok() {
            return None;
        }
        Some(dir)
    }
}

#[cfg(unix)]
impl Drop for UnreadableDir {
    fn drop(&mut self) {
        use std::os::unix::fs::PermissionsExt;

        let _ = std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o755));
    }
}
