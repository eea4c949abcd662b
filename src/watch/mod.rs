// src/watch/mod.rs

//! Filesystem progress watching.
//!
//! This module is responsible for:
//! - Parsing pipeline output paths into typed results (`grammar.rs`).
//! - The per-run progress state machine (`tracker.rs`).
//! - Serializing every notification of a run through one async lock
//!   (`serializer.rs`).
//! - Wiring up a cross-platform filesystem watcher (`notify`) on the lock and
//!   population trees (`watcher.rs`).
//!
//! It knows nothing about worker processes; the supervisor decides when the
//! watcher is closed.

pub mod grammar;
pub mod path_utils;
pub mod patterns;
pub mod serializer;
pub mod tracker;
pub mod watcher;

pub use grammar::{classify, ImageAxis, PipelinePath, RenderedImage};
pub use patterns::PipelineWatchProfile;
pub use serializer::{NotificationSerializer, Reservation};
pub use tracker::{
    ChangeKind, DisplayDelays, Notification, ProgressEvent, ProgressTracker, WatcherState,
};
pub use watcher::{start_progress_watcher, WatcherHandle};
