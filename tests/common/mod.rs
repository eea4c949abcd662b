#![allow(dead_code)]

use std::path::{Path, PathBuf};

pub use xasl_run_test_utils::*;

use xasl_run::steps::{self, WorkloadTable};

pub const VERSION_KEY: &str = "VERSION_1.11.0";

pub fn table() -> &'static WorkloadTable {
    steps::lookup(VERSION_KEY).expect("known version")
}

/// Structural lock directory of a subject without visit folders.
pub fn structural_lock(product_root: &Path, subject: &str) -> PathBuf {
    product_root
        .join("lock/xASL_module_Structural")
        .join(format!("{subject}_1"))
        .join("xASL_module_Structural")
}

pub fn asl_lock(product_root: &Path, subject: &str, session: Option<&str>) -> PathBuf {
    let leaf = match session {
        Some(session) => format!("xASL_module_ASL_{session}"),
        None => "xASL_module_ASL".to_string(),
    };
    product_root
        .join("lock/xASL_module_ASL")
        .join(format!("{subject}_1"))
        .join(leaf)
}

pub fn population_lock(product_root: &Path) -> PathBuf {
    product_root.join("lock/xASL_module_Population/xASL_module_Population")
}
