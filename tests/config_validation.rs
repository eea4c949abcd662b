mod common;

use std::io::Write;

use tempfile::NamedTempFile;

use crate::common::RunRequestBuilder;

use xasl_run::config::{self, ConfigFile, RawConfigFile, StudyParameters};
use xasl_run::errors::OrchestratorError;
use xasl_run::types::{ExecutableKind, ModuleSelection};

fn parse(toml_src: &str) -> Result<ConfigFile, OrchestratorError> {
    let raw: RawConfigFile = toml::from_str(toml_src).expect("valid TOML");
    ConfigFile::try_from(raw)
}

fn assert_config_error(result: Result<impl std::fmt::Debug, OrchestratorError>, needle: &str) {
    match result {
        Err(OrchestratorError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "expected {needle:?} in {msg:?}");
        }
        other => panic!("expected a config error, got {other:?}"),
    }
}

#[test]
fn empty_file_uses_defaults() {
    let cfg = parse("").unwrap();

    assert_eq!(cfg.config_section().product, "ExploreASL");
    assert_eq!(cfg.config_section().image_created_delay_ms, 400);
    assert_eq!(cfg.config_section().image_modified_delay_ms, 200);
    assert_eq!(cfg.runtime_section().minimum_interpreter_year, 2017);
    assert_eq!(cfg.study().subject_regexp, "^sub-.*$");
    assert!(cfg.run_request().is_none());
}

#[test]
fn run_section_is_parsed_with_study_attached() {
    let cfg = parse(
        r#"
        [study]
        run_dartel = true
        excluded_subjects = ["sub-09"]

        [run]
        study_root = "/data/study"
        modules = "both"
        workers = 3
        executable_kind = "interpreter"
        pipeline_path = "/opt/ExploreASL"

        [run.environment]
        OMP_NUM_THREADS = "1"
        "#,
    )
    .unwrap();

    let request = cfg.run_request().unwrap();
    assert_eq!(request.modules, ModuleSelection::Both);
    assert_eq!(request.workers, 3);
    assert_eq!(request.executable_kind, ExecutableKind::InterpreterBased);
    assert_eq!(request.environment.get("OMP_NUM_THREADS").map(String::as_str), Some("1"));
    assert!(request.study.run_dartel);
    assert_eq!(request.study.excluded_subjects, vec!["sub-09".to_string()]);
}

#[test]
fn unknown_module_selection_is_a_parse_error() {
    let result: Result<RawConfigFile, _> = toml::from_str(
        r#"
        [run]
        study_root = "/data/study"
        modules = "everything"
        executable_kind = "interpreter"
        pipeline_path = "/opt/ExploreASL"
        "#,
    );
    assert!(result.is_err());
}

#[test]
fn population_runs_on_a_single_worker() {
    let request = RunRequestBuilder::new("/study", "/opt/xasl")
        .modules(ModuleSelection::Population)
        .workers(2)
        .runtime_library_path("/opt/mcr")
        .build();
    assert_config_error(request.validate(), "Population");

    let request = RunRequestBuilder::new("/study", "/opt/xasl")
        .modules(ModuleSelection::Population)
        .runtime_library_path("/opt/mcr")
        .build();
    assert!(request.validate().is_ok());
}

#[test]
fn zero_workers_are_rejected() {
    let request = RunRequestBuilder::new("/study", "/opt/xasl")
        .workers(0)
        .runtime_library_path("/opt/mcr")
        .build();
    assert_config_error(request.validate(), "workers");
}

#[test]
fn self_contained_needs_a_runtime_library() {
    let request = RunRequestBuilder::new("/study", "/opt/xasl").build();
    assert_config_error(request.validate(), "runtime_library_path");

    let request = RunRequestBuilder::new("/study", "/opt/xasl")
        .executable_kind(ExecutableKind::InterpreterBased)
        .build();
    assert!(request.validate().is_ok());
}

#[test]
fn invalid_subject_pattern_is_rejected() {
    assert_config_error(
        parse(
            r#"
            [study]
            subject_regexp = "sub-(["
            "#,
        ),
        "subject_regexp",
    );

    let request = RunRequestBuilder::new("/study", "/opt/xasl")
        .executable_kind(ExecutableKind::InterpreterBased)
        .study(StudyParameters {
            subject_regexp: "(".to_string(),
            ..StudyParameters::default()
        })
        .build();
    assert_config_error(request.validate(), "subject_regexp");
}

#[test]
fn interpreter_year_thresholds_must_be_ordered() {
    assert_config_error(
        parse(
            r#"
            [runtime]
            minimum_interpreter_year = 2021
            batch_flag_year = 2019
            "#,
        ),
        "minimum_interpreter_year",
    );
}

#[test]
fn zero_channel_capacity_is_rejected() {
    assert_config_error(
        parse(
            r#"
            [config]
            channel_capacity = 0
            "#,
        ),
        "channel_capacity",
    );
}

#[test]
fn load_and_validate_reads_from_disk() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        [config]
        product = "ExploreASL"

        [run]
        study_root = "/data/study"
        modules = "structural"
        executable_kind = "self-contained"
        pipeline_path = "/opt/xasl"
        runtime_library_path = "/opt/mcr/v911"
        "#
    )
    .unwrap();

    let cfg = config::load_and_validate(file.path()).unwrap();
    let request = cfg.run_request().unwrap();
    assert_eq!(request.workers, 1);
    assert_eq!(request.executable_kind, ExecutableKind::SelfContained);
    assert!(config::validate_config(&cfg).is_ok());
}

#[test]
fn missing_config_file_is_an_io_error() {
    let err = config::load_and_validate("/definitely/not/here.toml").unwrap_err();
    assert!(matches!(err, OrchestratorError::IoError(_)));
}
