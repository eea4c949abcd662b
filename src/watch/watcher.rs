// src/watch/watcher.rs

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::ChannelEvent;
use crate::watch::path_utils::RootRelativizer;
use crate::watch::patterns::PipelineWatchProfile;
use crate::watch::serializer::NotificationSerializer;
use crate::watch::tracker::{ChangeKind, ProgressTracker};
use crate::workload::StudyLayout;

/// Handle for a run's progress watcher.
///
/// Keeps the `RecommendedWatcher` alive. [`WatcherHandle::close`] stops it,
/// lets the event loop drain what was already received and hands back the
/// tracker.
pub struct WatcherHandle {
    watcher: RecommendedWatcher,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<ProgressTracker>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish_non_exhaustive()
    }
}

impl WatcherHandle {
    pub async fn close(self) -> Result<ProgressTracker> {
        let WatcherHandle {
            watcher,
            shutdown_tx,
            task,
        } = self;
        drop(watcher);
        // The loop may already have stopped if notify hung up first.
        let _ = shutdown_tx.send(());

        let mut tracker = task
            .await
            .map_err(|e| anyhow!("progress watcher task failed: {e}"))?;
        tracker.close();
        info!(progress = tracker.progress(), "progress watcher closed");
        Ok(tracker)
    }
}

/// Map a notify event kind onto the changes the tracker cares about.
fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Both)) => {
            Some(ChangeKind::Created)
        }
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => Some(ChangeKind::Modified),
        _ => None,
    }
}

/// Start watching the lock and population trees of `layout`.
///
/// Both roots are created if missing. Once the watch is in place the tracker
/// moves to `Ready` and the gate is reserved for a progress reset, which the
/// event loop sends before anything else; no notification can precede it.
pub async fn start_progress_watcher(
    layout: &StudyLayout,
    mut tracker: ProgressTracker,
    serializer: Arc<NotificationSerializer>,
) -> Result<WatcherHandle> {
    let lock_root = layout.lock_root();
    let population_root = layout.population_root();
    for dir in [&lock_root, &population_root] {
        std::fs::create_dir_all(dir).with_context(|| format!("creating watch root {dir:?}"))?;
    }

    let profile = PipelineWatchProfile::new()?;
    let relativizer = RootRelativizer::new(layout.product_root());

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                // Fails only once the event loop is gone, i.e. after close.
                let _ = event_tx.send(event);
            }
            Err(err) => warn!(error = %err, "file watch error"),
        },
        Config::default(),
    )
    .context("creating filesystem watcher")?;

    watcher
        .watch(&lock_root, RecursiveMode::Recursive)
        .with_context(|| format!("watching {lock_root:?}"))?;
    watcher
        .watch(&population_root, RecursiveMode::Recursive)
        .with_context(|| format!("watching {population_root:?}"))?;

    info!(lock = ?lock_root, population = ?population_root, "progress watcher started");

    tracker.mark_ready();
    let reset = serializer.reserve().await;

    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        reset.send_all(vec![ChannelEvent::ProgressBarReset]).await;
        loop {
            tokio::select! {
                biased;

                maybe = event_rx.recv() => match maybe {
                    Some(event) => {
                        handle_event(event, &relativizer, &profile, &mut tracker, &serializer).await;
                    }
                    None => break,
                },

                _ = &mut shutdown_rx => {
                    while let Ok(event) = event_rx.try_recv() {
                        handle_event(event, &relativizer, &profile, &mut tracker, &serializer).await;
                    }
                    break;
                }
            }
        }
        debug!("progress watcher event loop finished");
        tracker
    });

    Ok(WatcherHandle {
        watcher,
        shutdown_tx,
        task,
    })
}

async fn handle_event(
    event: Event,
    relativizer: &RootRelativizer,
    profile: &PipelineWatchProfile,
    tracker: &mut ProgressTracker,
    serializer: &NotificationSerializer,
) {
    let Some(kind) = change_kind(&event.kind) else {
        return;
    };

    for path in &event.paths {
        let Some(rel) = relativizer.relative(path) else {
            warn!(path = ?path, "event outside the product root");
            continue;
        };
        if !profile.matches(&rel) {
            continue;
        }

        debug!(?kind, path = %rel, "pipeline change");
        if let Some(notification) = tracker.handle(kind, &rel) {
            serializer.dispatch(notification).await;
        }
    }
}
