// src/workload/layout.rs

//! Directory conventions of a study and of the pipeline's lock tree.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::types::ModuleName;

pub const RAWDATA_DIR: &str = "rawdata";
pub const SOURCEDATA_DIR: &str = "sourcedata";
pub const DERIVATIVES_DIR: &str = "derivatives";
pub const LOCK_DIR: &str = "lock";
pub const POPULATION_DIR: &str = "Population";
pub const LOCKED_MARKER: &str = "locked";
pub const STATUS_EXTENSION: &str = "status";

/// Folder names under `rawdata/` that are never subjects.
pub const RESERVED_FOLDERS: &[&str] = &[
    DERIVATIVES_DIR,
    SOURCEDATA_DIR,
    "code",
    "stimuli",
    LOCK_DIR,
    POPULATION_DIR,
    "dartel",
];

const MODULE_DIR_PREFIX: &str = "xASL_module_";

/// Resolved paths of one study.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyLayout {
    root: PathBuf,
    product_root: PathBuf,
}

impl StudyLayout {
    pub fn new(root: impl Into<PathBuf>, product: &str) -> Self {
        let root = root.into();
        let product_root = root.join(DERIVATIVES_DIR).join(product);
        Self { root, product_root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn rawdata(&self) -> PathBuf {
        self.root.join(RAWDATA_DIR)
    }

    pub fn sourcedata(&self) -> PathBuf {
        self.root.join(SOURCEDATA_DIR)
    }

    pub fn derivatives(&self) -> PathBuf {
        self.root.join(DERIVATIVES_DIR)
    }

    /// `derivatives/<product>`: the root all path grammars are relative to.
    pub fn product_root(&self) -> &Path {
        &self.product_root
    }

    pub fn lock_root(&self) -> PathBuf {
        self.product_root.join(LOCK_DIR)
    }

    pub fn population_root(&self) -> PathBuf {
        self.product_root.join(POPULATION_DIR)
    }

    /// Lock directory that holds the markers of `key`.
    pub fn lock_dir(&self, key: &LockKey) -> PathBuf {
        self.product_root.join(key.relative_dir())
    }
}

/// One subject visit, `<subject>_<visit>` in the lock tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectVisit {
    pub subject: String,
    /// 1-based.
    pub visit: u32,
}

/// Identifies one unit of pipeline work: a module, optionally for one
/// subject visit and session.
///
/// Renders to `lock/xASL_module_<M>/<Subject>_<Visit>/xASL_module_<M>_<Session>`,
/// dropping the subject level for cross-subject modules and the session
/// suffix for single-session layouts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey {
    pub module: ModuleName,
    pub subject: Option<SubjectVisit>,
    pub session: Option<String>,
}

impl LockKey {
    pub fn for_subject(
        module: ModuleName,
        subject: &str,
        visit: u32,
        session: Option<String>,
    ) -> Self {
        Self {
            module: module.lock_module(),
            subject: Some(SubjectVisit {
                subject: subject.to_string(),
                visit,
            }),
            session,
        }
    }

    pub fn for_study(module: ModuleName) -> Self {
        Self {
            module: module.lock_module(),
            subject: None,
            session: None,
        }
    }

    pub fn module_dir_name(&self) -> String {
        format!("{MODULE_DIR_PREFIX}{}", self.module)
    }

    pub fn session_dir_name(&self) -> String {
        match &self.session {
            Some(session) => format!("{MODULE_DIR_PREFIX}{}_{session}", self.module),
            None => self.module_dir_name(),
        }
    }

    /// Path relative to the product root.
    pub fn relative_dir(&self) -> PathBuf {
        let mut dir = PathBuf::from(LOCK_DIR).join(self.module_dir_name());
        if let Some(sv) = &self.subject {
            dir.push(format!("{}_{}", sv.subject, sv.visit));
        }
        dir.push(self.session_dir_name());
        dir
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} module", self.module)?;
        if let Some(sv) = &self.subject {
            write!(f, " for subject {} (visit {}", sv.subject, sv.visit)?;
            if let Some(session) = &self.session {
                write!(f, ", session {session}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}
