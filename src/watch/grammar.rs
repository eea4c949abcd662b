// src/watch/grammar.rs

//! Typed parsing of pipeline output paths.
//!
//! Paths are relative to the product root (`derivatives/<product>`) and use
//! forward slashes. Anything that does not match one of the known shapes is
//! [`PipelinePath::Unrecognized`]; the watcher ignores those.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::types::ModuleName;
use crate::workload::layout::{LockKey, SubjectVisit};

/// Orientation prefix of a rendered image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageAxis {
    Transversal,
    Coronal,
    Sagittal,
}

impl ImageAxis {
    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "Tra" => Some(ImageAxis::Transversal),
            "Cor" => Some(ImageAxis::Coronal),
            "Sag" => Some(ImageAxis::Sagittal),
            _ => None,
        }
    }
}

impl fmt::Display for ImageAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageAxis::Transversal => "Tra",
            ImageAxis::Coronal => "Cor",
            ImageAxis::Sagittal => "Sag",
        })
    }
}

/// A check image such as `Population/M0Check/Tra_M0_sub-01_1.jpg`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderedImage {
    pub axis: ImageAxis,
    pub kind: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelinePath {
    /// `.../xASL_module_<M>[_<Session>]/locked`: a module started on a unit.
    LockAcquired(LockKey),
    /// `.../xASL_module_<M>[_<Session>]/<NNN_Step>.status`: a step finished.
    StatusFile { key: LockKey, basename: String },
    RenderedImage(RenderedImage),
    Unrecognized,
}

const LOCK_PREFIX: &str = r"^lock/xASL_module_(?P<outer>[A-Za-z]+)/(?:(?P<subject>[^/]+)_(?P<visit>\d+)/)?xASL_module_(?P<inner>[A-Za-z]+)(?:_(?P<session>[^/]+))?";

fn lock_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!("{LOCK_PREFIX}/locked$")).expect("static regex"))
}

fn status_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"{LOCK_PREFIX}/(?P<step>\d{{3}}_[A-Za-z0-9_]+\.status)$"
        ))
        .expect("static regex")
    })
}

fn image_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^Population/(?:[^/]+/)*(?P<axis>Tra|Cor|Sag)_(?P<kind>[A-Za-z0-9]+)_(?P<target>[^/]+)\.(?:jpg|png)$",
        )
        .expect("static regex")
    })
}

/// Classify a product-root-relative path.
pub fn classify(rel: &str) -> PipelinePath {
    if let Some(caps) = status_re().captures(rel) {
        return match lock_key(&caps) {
            Some(key) => PipelinePath::StatusFile {
                key,
                basename: caps["step"].to_string(),
            },
            None => PipelinePath::Unrecognized,
        };
    }

    if let Some(caps) = lock_re().captures(rel) {
        return lock_key(&caps).map_or(PipelinePath::Unrecognized, PipelinePath::LockAcquired);
    }

    if let Some(caps) = image_re().captures(rel) {
        if let Some(axis) = ImageAxis::from_prefix(&caps["axis"]) {
            return PipelinePath::RenderedImage(RenderedImage {
                axis,
                kind: caps["kind"].to_string(),
                target: caps["target"].to_string(),
            });
        }
    }

    PipelinePath::Unrecognized
}

/// The module named in both directory levels must agree and be known.
fn lock_key(caps: &regex::Captures<'_>) -> Option<LockKey> {
    let outer = &caps["outer"];
    if outer != &caps["inner"] {
        return None;
    }
    let module = ModuleName::from_lock_name(outer)?;

    let subject = match (caps.name("subject"), caps.name("visit")) {
        (Some(subject), Some(visit)) => Some(SubjectVisit {
            subject: subject.as_str().to_string(),
            visit: visit.as_str().parse().ok()?,
        }),
        _ => None,
    };

    Some(LockKey {
        module,
        subject,
        session: caps.name("session").map(|s| s.as_str().to_string()),
    })
}
