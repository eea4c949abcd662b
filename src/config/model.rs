// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{ExecutableKind, ModuleSelection};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// product = "ExploreASL"
/// image_created_delay_ms = 400
///
/// [runtime]
/// minimum_interpreter_year = 2017
///
/// [study]
/// subject_regexp = "^sub-.*$"
/// run_dartel = true
///
/// [run]
/// study_root = "/data/study"
/// modules = "structural"
/// workers = 2
/// executable_kind = "interpreter"
/// pipeline_path = "/opt/ExploreASL"
/// ```
///
/// All sections are optional and have reasonable defaults. Use
/// [`crate::config::load_and_validate`] (or `ConfigFile::try_from`) to obtain
/// a validated [`ConfigFile`].
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub runtime: RuntimeSection,

    #[serde(default)]
    pub study: StudyParameters,

    /// Optional run request, used by the command-line driver.
    #[serde(default)]
    pub run: Option<RunSection>,
}

/// Validated configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    config: ConfigSection,
    runtime: RuntimeSection,
    study: StudyParameters,
    run: Option<RunRequest>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        runtime: RuntimeSection,
        study: StudyParameters,
        run: Option<RunRequest>,
    ) -> Self {
        Self {
            config,
            runtime,
            study,
            run,
        }
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn runtime_section(&self) -> &RuntimeSection {
        &self.runtime
    }

    pub fn study(&self) -> &StudyParameters {
        &self.study
    }

    /// The `[run]` request, with `[study]` parameters attached.
    pub fn run_request(&self) -> Option<&RunRequest> {
        self.run.as_ref()
    }
}

/// `[config]` section: orchestrator behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Name of the pipeline's folder under `derivatives/`.
    #[serde(default = "default_product")]
    pub product: String,

    /// Display delay before announcing a newly created image.
    ///
    /// Gives a slow consumer time to finish rendering the previous image
    /// before the next one is announced.
    #[serde(default = "default_image_created_delay_ms")]
    pub image_created_delay_ms: u64,

    /// Display delay before announcing an image first seen as modified.
    #[serde(default = "default_image_modified_delay_ms")]
    pub image_modified_delay_ms: u64,

    /// Capacity of the per-run event channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_product() -> String {
    "ExploreASL".to_string()
}

fn default_image_created_delay_ms() -> u64 {
    400
}

fn default_image_modified_delay_ms() -> u64 {
    200
}

fn default_channel_capacity() -> usize {
    256
}

impl ConfigSection {
    pub fn image_created_delay(&self) -> Duration {
        Duration::from_millis(self.image_created_delay_ms)
    }

    pub fn image_modified_delay(&self) -> Duration {
        Duration::from_millis(self.image_modified_delay_ms)
    }
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            product: default_product(),
            image_created_delay_ms: default_image_created_delay_ms(),
            image_modified_delay_ms: default_image_modified_delay_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// `[runtime]` section: interpreter discovery and compatibility.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeSection {
    /// Interpreter releases older than this year are rejected.
    #[serde(default = "default_minimum_interpreter_year")]
    pub minimum_interpreter_year: u16,

    /// From this release year on, the `-batch` flag set is used.
    #[serde(default = "default_batch_flag_year")]
    pub batch_flag_year: u16,

    /// Upper bound for asking the interpreter for its own version.
    #[serde(default = "default_version_probe_timeout_secs")]
    pub version_probe_timeout_secs: u64,

    /// Explicit interpreter binary; skips the search path lookup.
    #[serde(default)]
    pub interpreter_path: Option<PathBuf>,
}

fn default_minimum_interpreter_year() -> u16 {
    2017
}

fn default_batch_flag_year() -> u16 {
    2019
}

fn default_version_probe_timeout_secs() -> u64 {
    120
}

impl RuntimeSection {
    pub fn version_probe_timeout(&self) -> Duration {
        Duration::from_secs(self.version_probe_timeout_secs)
    }
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            minimum_interpreter_year: default_minimum_interpreter_year(),
            batch_flag_year: default_batch_flag_year(),
            version_probe_timeout_secs: default_version_probe_timeout_secs(),
            interpreter_path: None,
        }
    }
}

/// `[study]` section: dataset parameters that shape the expected workload.
#[derive(Debug, Clone, Deserialize)]
pub struct StudyParameters {
    /// Regular expression a subject folder name must match.
    #[serde(default = "default_subject_regexp")]
    pub subject_regexp: String,

    #[serde(default)]
    pub excluded_subjects: Vec<String>,

    #[serde(default)]
    pub skip_if_no_flair: bool,

    #[serde(default)]
    pub skip_if_no_m0: bool,

    #[serde(default)]
    pub skip_if_no_asl: bool,

    /// Run the cross-subject DARTEL registration after the Structural module.
    #[serde(default)]
    pub run_dartel: bool,

    /// Run longitudinal registration for subjects with several visits.
    #[serde(default)]
    pub run_long_reg: bool,
}

fn default_subject_regexp() -> String {
    "^sub-.*$".to_string()
}

impl Default for StudyParameters {
    fn default() -> Self {
        Self {
            subject_regexp: default_subject_regexp(),
            excluded_subjects: Vec::new(),
            skip_if_no_flair: false,
            skip_if_no_m0: false,
            skip_if_no_asl: false,
            run_dartel: false,
            run_long_reg: false,
        }
    }
}

/// `[run]` section as written in TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    pub study_root: PathBuf,
    pub modules: ModuleSelection,
    #[serde(default = "default_workers")]
    pub workers: usize,
    pub executable_kind: ExecutableKind,
    pub pipeline_path: PathBuf,
    #[serde(default)]
    pub runtime_library_path: Option<PathBuf>,
    #[serde(default)]
    pub import: bool,
    #[serde(default)]
    pub pause_before_processing: bool,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

fn default_workers() -> usize {
    1
}

/// Everything needed to launch one run.
///
/// Built from already-validated input; the orchestrator only reads it.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Study root containing `rawdata/` and `derivatives/`.
    pub study_root: PathBuf,
    pub modules: ModuleSelection,
    /// Number of worker processes; each gets a 1-based ordinal.
    pub workers: usize,
    pub executable_kind: ExecutableKind,
    /// Pipeline install folder (source tree or compiled distribution).
    pub pipeline_path: PathBuf,
    /// Runtime library folder, required for self-contained execution.
    pub runtime_library_path: Option<PathBuf>,
    pub import: bool,
    pub pause_before_processing: bool,
    /// Extra environment variables for the workers.
    pub environment: BTreeMap<String, String>,
    pub study: StudyParameters,
}

impl RunRequest {
    pub(crate) fn from_section(run: RunSection, study: StudyParameters) -> Self {
        Self {
            study_root: run.study_root,
            modules: run.modules,
            workers: run.workers,
            executable_kind: run.executable_kind,
            pipeline_path: run.pipeline_path,
            runtime_library_path: run.runtime_library_path,
            import: run.import,
            pause_before_processing: run.pause_before_processing,
            environment: run.environment,
            study,
        }
    }
}
