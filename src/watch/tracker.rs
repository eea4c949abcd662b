// src/watch/tracker.rs

//! Per-run progress state machine.
//!
//! The tracker is pure: it turns one classified filesystem change into at
//! most one [`Notification`] and keeps the bookkeeping that makes those
//! notifications safe to repeat events:
//! - a marker is counted only while it is still pending, so duplicate
//!   create events never increment twice;
//! - an image is announced only the first time it is seen.

use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, trace};

use crate::config::ConfigSection;
use crate::engine::ChannelEvent;
use crate::steps::WorkloadTable;
use crate::types::{ModuleName, OutputStyle};
use crate::watch::grammar::{self, PipelinePath, RenderedImage};
use crate::workload::{AnticipatedWorkload, LockKey, StudyLayout};

/// Lifecycle of a run's watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Initializing,
    /// Watching; the progress reset has been emitted.
    Ready,
    /// At least one filesystem event has been seen.
    Active,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
}

/// Display delays for image notifications.
///
/// These hold back the next image announcement so a slow consumer can finish
/// rendering the previous one. They are part of the notification contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayDelays {
    pub created: Duration,
    pub modified: Duration,
}

impl DisplayDelays {
    pub fn from_config(config: &ConfigSection) -> Self {
        Self {
            created: config.image_created_delay(),
            modified: config.image_modified_delay(),
        }
    }

    pub fn none() -> Self {
        Self {
            created: Duration::ZERO,
            modified: Duration::ZERO,
        }
    }
}

impl Default for DisplayDelays {
    fn default() -> Self {
        Self::from_config(&ConfigSection::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    ModuleStarted {
        key: LockKey,
    },
    StepCompleted {
        key: LockKey,
        basename: String,
        module: ModuleName,
        description: &'static str,
        increment: f64,
    },
    ImageProduced {
        path: PathBuf,
        image: RenderedImage,
    },
}

impl ProgressEvent {
    /// Human-readable line for the event, if it has one.
    pub fn message(&self) -> Option<String> {
        match self {
            ProgressEvent::ModuleStarted { key } => Some(format!("Started {key}")),
            ProgressEvent::StepCompleted {
                key, description, ..
            } => Some(format!("Completed \"{description}\" in {key}")),
            ProgressEvent::ImageProduced { .. } => None,
        }
    }

    /// Channel events for this progress event, in emission order.
    pub fn into_channel_events(self) -> Vec<ChannelEvent> {
        let message = self.message();
        let stdout = |text: String| ChannelEvent::ChildProcessStdout {
            pid: None,
            text,
            style: Some(OutputStyle::Info),
        };

        match self {
            ProgressEvent::ModuleStarted { .. } => message.map(stdout).into_iter().collect(),
            ProgressEvent::StepCompleted { increment, .. } => {
                let mut events = vec![ChannelEvent::ProgressBarIncrement { amount: increment }];
                events.extend(message.map(stdout));
                events
            }
            ProgressEvent::ImageProduced { path, .. } => {
                vec![ChannelEvent::ChildProcessRequestsMediaDisplay { image_path: path }]
            }
        }
    }
}

/// A progress event plus how long to hold it back before dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub event: ProgressEvent,
    pub delay: Option<Duration>,
}

#[derive(Debug)]
pub struct ProgressTracker {
    product_root: PathBuf,
    table: &'static WorkloadTable,
    pending: BTreeSet<PathBuf>,
    total_weight: f64,
    progress: f64,
    seen_images: HashSet<PathBuf>,
    delays: DisplayDelays,
    state: WatcherState,
}

impl ProgressTracker {
    pub fn new(
        layout: &StudyLayout,
        table: &'static WorkloadTable,
        workload: &AnticipatedWorkload,
        delays: DisplayDelays,
    ) -> Self {
        Self {
            product_root: layout.product_root().to_path_buf(),
            table,
            pending: workload.paths().clone(),
            total_weight: workload.total_weight(),
            progress: 0.0,
            seen_images: HashSet::new(),
            delays,
            state: WatcherState::Initializing,
        }
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    /// Cumulative fraction of the workload seen completed, at most 1.0.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Markers still expected.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn mark_ready(&mut self) {
        if self.state == WatcherState::Initializing {
            self.state = WatcherState::Ready;
        }
    }

    pub fn close(&mut self) {
        self.state = WatcherState::Closed;
    }

    /// React to a change at `rel`, a path relative to the product root.
    pub fn handle(&mut self, kind: ChangeKind, rel: &str) -> Option<Notification> {
        match self.state {
            WatcherState::Initializing | WatcherState::Closed => {
                trace!(state = ?self.state, path = rel, "event outside the watch window");
                return None;
            }
            WatcherState::Ready => self.state = WatcherState::Active,
            WatcherState::Active => {}
        }

        match grammar::classify(rel) {
            PipelinePath::LockAcquired(key) if kind == ChangeKind::Created => Some(Notification {
                event: ProgressEvent::ModuleStarted { key },
                delay: None,
            }),
            PipelinePath::LockAcquired(_) => None,
            PipelinePath::StatusFile { key, basename } => self.step_completed(key, basename, rel),
            PipelinePath::RenderedImage(image) => self.image_produced(kind, image, rel),
            PipelinePath::Unrecognized => {
                trace!(path = rel, "unrecognized path");
                None
            }
        }
    }

    fn step_completed(
        &mut self,
        key: LockKey,
        basename: String,
        rel: &str,
    ) -> Option<Notification> {
        let path = self.product_root.join(rel);
        if !self.pending.remove(&path) {
            debug!(path = rel, "marker not anticipated or already counted");
            return None;
        }

        let step = self.table.get(&basename)?;
        let increment = if self.total_weight > 0.0 {
            step.weight / self.total_weight
        } else {
            0.0
        };
        self.progress = (self.progress + increment).min(1.0);

        Some(Notification {
            event: ProgressEvent::StepCompleted {
                key,
                basename,
                module: step.module,
                description: step.description,
                increment,
            },
            delay: None,
        })
    }

    fn image_produced(
        &mut self,
        kind: ChangeKind,
        image: RenderedImage,
        rel: &str,
    ) -> Option<Notification> {
        let path = self.product_root.join(rel);
        if !self.seen_images.insert(path.clone()) {
            return None;
        }

        let delay = match kind {
            ChangeKind::Created => self.delays.created,
            ChangeKind::Modified => self.delays.modified,
        };
        Some(Notification {
            event: ProgressEvent::ImageProduced { path, image },
            delay: Some(delay),
        })
    }
}
