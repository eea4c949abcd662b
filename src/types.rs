// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Processing module a pipeline step belongs to.
///
/// The `Display` form is the name the pipeline itself uses in its lock
/// directories (`xASL_module_<name>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModuleName {
    Structural,
    #[serde(rename = "Structural_FLAIR")]
    StructuralFlair,
    LongReg,
    #[serde(rename = "DARTEL")]
    Dartel,
    #[serde(rename = "ASL")]
    Asl,
    Population,
    Import,
    Misc,
}

impl ModuleName {
    /// Name of the pipeline module whose lock tree holds this module's markers.
    ///
    /// FLAIR-specific steps are executed by the Structural module, so their
    /// markers live next to the base Structural ones.
    pub fn lock_module(&self) -> ModuleName {
        match self {
            ModuleName::StructuralFlair => ModuleName::Structural,
            other => *other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleName::Structural => "Structural",
            ModuleName::StructuralFlair => "Structural_FLAIR",
            ModuleName::LongReg => "LongReg",
            ModuleName::Dartel => "DARTEL",
            ModuleName::Asl => "ASL",
            ModuleName::Population => "Population",
            ModuleName::Import => "Import",
            ModuleName::Misc => "Misc",
        }
    }

    /// Inverse of [`ModuleName::as_str`] for lock-directory names.
    pub fn from_lock_name(name: &str) -> Option<ModuleName> {
        match name {
            "Structural" => Some(ModuleName::Structural),
            "LongReg" => Some(ModuleName::LongReg),
            "DARTEL" => Some(ModuleName::Dartel),
            "ASL" => Some(ModuleName::Asl),
            "Population" => Some(ModuleName::Population),
            "Import" => Some(ModuleName::Import),
            _ => None,
        }
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which part of the pipeline a run request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleSelection {
    Structural,
    Asl,
    Both,
    Population,
}

impl ModuleSelection {
    /// Flags in the order the pipeline expects them: (Structural, ASL, Population).
    pub fn module_flags(&self) -> [bool; 3] {
        match self {
            ModuleSelection::Structural => [true, false, false],
            ModuleSelection::Asl => [false, true, false],
            ModuleSelection::Both => [true, true, false],
            ModuleSelection::Population => [false, false, true],
        }
    }

    /// The boolean triple rendered as the pipeline's array literal, e.g. `[1 0 0]`.
    pub fn module_triple(&self) -> String {
        let [s, a, p] = self.module_flags();
        format!("[{} {} {}]", s as u8, a as u8, p as u8)
    }
}

impl FromStr for ModuleSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "structural" => Ok(ModuleSelection::Structural),
            "asl" => Ok(ModuleSelection::Asl),
            "both" => Ok(ModuleSelection::Both),
            "population" => Ok(ModuleSelection::Population),
            other => Err(format!(
                "invalid module selection: {other} (expected structural, asl, both or population)"
            )),
        }
    }
}

/// How the pipeline is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ExecutableKind {
    /// Source distribution run through a MATLAB interpreter.
    #[serde(rename = "interpreter")]
    InterpreterBased,
    /// Compiled distribution run against a runtime library folder.
    #[serde(rename = "self-contained")]
    SelfContained,
}

/// Severity of a terminal outcome presented to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Styling hint attached to relayed process output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    Info,
    Warning,
    Error,
}
