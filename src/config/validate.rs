// src/config/validate.rs

use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile, RunRequest, StudyParameters};
use crate::errors::{OrchestratorError, Result};
use crate::types::{ExecutableKind, ModuleSelection};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::OrchestratorError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;

        let run = raw
            .run
            .map(|section| RunRequest::from_section(section, raw.study.clone()));
        if let Some(ref request) = run {
            request.validate()?;
        }

        Ok(ConfigFile::new_unchecked(raw.config, raw.runtime, raw.study, run))
    }
}

impl RunRequest {
    /// Checks for a run request.
    ///
    /// Run when the `[run]` section is loaded, and again by
    /// `RunOrchestrator::start_run` before anything is estimated or spawned.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(OrchestratorError::ConfigError(
                "[run].workers must be >= 1 (got 0)".to_string(),
            ));
        }

        if self.modules == ModuleSelection::Population && self.workers > 1 {
            return Err(OrchestratorError::ConfigError(format!(
                "the Population module runs on a single worker (got {})",
                self.workers
            )));
        }

        if self.executable_kind == ExecutableKind::SelfContained
            && self.runtime_library_path.is_none()
        {
            return Err(OrchestratorError::ConfigError(
                "[run].runtime_library_path is required for self-contained execution".to_string(),
            ));
        }

        validate_study(&self.study)
    }
}

pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    if let Some(request) = cfg.run_request() {
        request.validate()?;
    }
    validate_study(cfg.study())
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.channel_capacity == 0 {
        return Err(OrchestratorError::ConfigError(
            "[config].channel_capacity must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.config.product.trim().is_empty() {
        return Err(OrchestratorError::ConfigError(
            "[config].product must not be empty".to_string(),
        ));
    }

    if cfg.runtime.minimum_interpreter_year > cfg.runtime.batch_flag_year {
        return Err(OrchestratorError::ConfigError(format!(
            "[runtime].minimum_interpreter_year ({}) must not exceed batch_flag_year ({})",
            cfg.runtime.minimum_interpreter_year, cfg.runtime.batch_flag_year
        )));
    }

    validate_study(&cfg.study)
}

fn validate_study(study: &StudyParameters) -> Result<()> {
    Regex::new(&study.subject_regexp).map_err(|e| {
        OrchestratorError::ConfigError(format!(
            "[study].subject_regexp is not a valid regular expression: {e}"
        ))
    })?;
    Ok(())
}
