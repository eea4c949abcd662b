// src/engine/orchestrator.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::{ConfigFile, ConfigSection, RunRequest, RuntimeSection};
use crate::errors::{OrchestratorError, Result};
use crate::exec::{send_signal, Cohort, ProcessRegistry, ProcessSignal, ProcessSupervisor};
use crate::fs::{FileSystem, RealFileSystem};
use crate::runtime_env::{PlatformProfile, RuntimeEnvironmentBuilder};
use crate::steps::{self, WorkloadTable};
use crate::types::ModuleName;
use crate::watch::{start_progress_watcher, DisplayDelays, NotificationSerializer, ProgressTracker};
use crate::workload::{AnticipatedWorkload, StudyLayout, WorkloadEstimator};

use super::{ChannelMessage, EventSink, RunOutcome};

/// Result of a dry-run estimate.
#[derive(Debug, Clone)]
pub struct WorkloadEstimate {
    pub version: &'static str,
    pub workload: AnticipatedWorkload,
    /// Anticipated markers per module.
    pub steps_per_module: BTreeMap<ModuleName, usize>,
}

/// Long-lived entry point: owns the process registry shared by every run it
/// starts.
#[derive(Debug, Clone)]
pub struct RunOrchestrator {
    fs: Arc<dyn FileSystem>,
    registry: ProcessRegistry,
    config: ConfigSection,
    runtime: RuntimeSection,
    profile: &'static PlatformProfile,
}

impl RunOrchestrator {
    pub fn new(cfg: &ConfigFile) -> Self {
        Self {
            fs: Arc::new(RealFileSystem),
            registry: ProcessRegistry::new(),
            config: cfg.config_section().clone(),
            runtime: cfg.runtime_section().clone(),
            profile: PlatformProfile::current(),
        }
    }

    /// Replace the filesystem used for estimation and discovery.
    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_profile(mut self, profile: &'static PlatformProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    fn layout(&self, request: &RunRequest) -> StudyLayout {
        StudyLayout::new(&request.study_root, &self.config.product)
    }

    /// `request` with every path made absolute against the current directory.
    /// Workers run with the study root as their working directory.
    fn resolve_paths(&self, request: &RunRequest) -> Result<RunRequest> {
        let mut resolved = request.clone();
        resolved.study_root = std::path::absolute(&request.study_root)?;
        resolved.pipeline_path = std::path::absolute(&request.pipeline_path)?;
        if let Some(runtime) = &request.runtime_library_path {
            resolved.runtime_library_path = Some(std::path::absolute(runtime)?);
        }
        Ok(resolved)
    }

    fn check_study_root(&self, layout: &StudyLayout) -> Result<()> {
        let root = layout.root();
        if !self.fs.is_dir(root) {
            return Err(OrchestratorError::ConfigError(format!(
                "study root {root:?} does not exist"
            )));
        }
        for required in [layout.rawdata(), layout.derivatives()] {
            if !self.fs.is_dir(&required) {
                return Err(OrchestratorError::ConfigError(format!(
                    "study root is missing {required:?}"
                )));
            }
        }
        if !self.fs.is_dir(&layout.sourcedata()) {
            info!(root = ?root, "study has no sourcedata folder");
        }
        Ok(())
    }

    fn table_for(&self, request: &RunRequest) -> Result<&'static WorkloadTable> {
        let key = steps::detect_version_key(self.fs.as_ref(), &request.pipeline_path)?;
        steps::lookup(&key)
    }

    /// Estimate the workload of `request` without spawning anything.
    ///
    /// Lock directories are created as a side effect, exactly as for a run.
    pub fn estimate(&self, request: &RunRequest) -> Result<WorkloadEstimate> {
        let request = &self.resolve_paths(request)?;
        let layout = self.layout(request);
        self.check_study_root(&layout)?;
        let table = self.table_for(request)?;
        let workload = WorkloadEstimator::new(self.fs.as_ref(), &layout, table, &request.study)
            .estimate(request.modules)?;

        let mut steps_per_module = BTreeMap::new();
        for path in workload.paths() {
            if let Some(step) = table.descriptor_for_path(path) {
                *steps_per_module.entry(step.module).or_insert(0) += 1;
            }
        }

        Ok(WorkloadEstimate {
            version: table.version(),
            workload,
            steps_per_module,
        })
    }

    /// Check every precondition, start the progress watcher and spawn the
    /// workers of `request`.
    ///
    /// Never fails: every precondition error becomes a [`RunOutcome`].
    /// Events of the run arrive on `tx`, tagged with `channel`, until a
    /// `ChildProcessHasClosed` event ends it.
    pub async fn start_run(
        &self,
        channel: &str,
        request: &RunRequest,
        tx: mpsc::Sender<ChannelMessage>,
    ) -> RunOutcome {
        match self.try_start_run(channel, request, tx).await {
            Ok(outcome) => outcome,
            Err(err) => {
                if err.is_informational() {
                    info!(channel, "{err}");
                } else {
                    warn!(channel, error = %err, "run not started");
                }
                RunOutcome::from_error(&err)
            }
        }
    }

    async fn try_start_run(
        &self,
        channel: &str,
        request: &RunRequest,
        tx: mpsc::Sender<ChannelMessage>,
    ) -> Result<RunOutcome> {
        request.validate()?;
        let request = &self.resolve_paths(request)?;

        let layout = self.layout(request);
        self.check_study_root(&layout)?;
        let table = self.table_for(request)?;

        let workload = WorkloadEstimator::new(self.fs.as_ref(), &layout, table, &request.study)
            .estimate(request.modules)?;
        if workload.is_empty() {
            return Err(OrchestratorError::AlreadyComplete);
        }

        let env = RuntimeEnvironmentBuilder::new(self.fs.clone(), self.runtime.clone())
            .with_profile(self.profile)
            .build(
                request.executable_kind,
                &request.pipeline_path,
                request.runtime_library_path.as_deref(),
                &request.environment,
            )
            .await?;

        let serializer = Arc::new(NotificationSerializer::new(EventSink::new(channel, tx)));
        let tracker = ProgressTracker::new(
            &layout,
            table,
            &workload,
            DisplayDelays::from_config(&self.config),
        );
        let watcher = start_progress_watcher(&layout, tracker, serializer.clone()).await?;

        let messages = vec![format!(
            "{} steps anticipated for {} (pipeline {})",
            workload.len(),
            request.modules.module_triple(),
            table.version()
        )];

        let cohort = Cohort {
            fs: self.fs.clone(),
            layout,
            table,
            workload,
            watcher,
            serializer,
        };
        let workers = ProcessSupervisor::new(self.registry.clone())
            .spawn(request, &env, cohort)
            .await?;

        info!(channel, workers = workers.len(), "run started");
        Ok(RunOutcome::spawned(workers, messages))
    }

    pub fn pause(&self, pid: u32) -> Result<()> {
        send_signal(pid, ProcessSignal::Pause)
    }

    pub fn resume(&self, pid: u32) -> Result<()> {
        send_signal(pid, ProcessSignal::Resume)
    }

    pub fn terminate(&self, pid: u32) -> Result<()> {
        send_signal(pid, ProcessSignal::Terminate)
    }

    /// Terminate every registered worker. Failures (typically a worker that
    /// exited in the meantime) are logged and skipped.
    pub fn terminate_all(&self) -> usize {
        let mut terminated = 0;
        for pid in self.registry.snapshot() {
            match self.terminate(pid) {
                Ok(()) => terminated += 1,
                Err(e) => warn!(pid, error = %e, "terminate failed"),
            }
        }
        terminated
    }
}
