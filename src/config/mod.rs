// src/config/mod.rs

//! Configuration loading and validation for xasl-run.
//!
//! Responsibilities:
//! - Define the TOML-backed data model and the [`RunRequest`] (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants like worker counts (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    ConfigFile, ConfigSection, RawConfigFile, RunRequest, RunSection, RuntimeSection,
    StudyParameters,
};
pub use validate::validate_config;
