mod common;

use std::time::Duration;

use crate::common::{structural_lock, table, StudyBuilder};

use xasl_run::config::StudyParameters;
use xasl_run::engine::ChannelEvent;
use xasl_run::fs::mock::MockFileSystem;
use xasl_run::types::{ModuleName, ModuleSelection, OutputStyle};
use xasl_run::watch::{
    ChangeKind, DisplayDelays, Notification, ProgressEvent, ProgressTracker, WatcherState,
};
use xasl_run::workload::{AnticipatedWorkload, StudyLayout, WorkloadEstimator};

const SUB01_LOCK: &str = "lock/xASL_module_Structural/sub-01_1/xASL_module_Structural";

fn setup() -> (StudyLayout, AnticipatedWorkload) {
    let fs = MockFileSystem::new();
    StudyBuilder::new(&fs, "/study").subject("sub-01").flair("sub-01");
    let layout = StudyLayout::new("/study", "ExploreASL");
    let params = StudyParameters::default();
    let workload = WorkloadEstimator::new(&fs, &layout, table(), &params)
        .estimate(ModuleSelection::Structural)
        .unwrap();
    (layout, workload)
}

fn delays() -> DisplayDelays {
    DisplayDelays {
        created: Duration::from_millis(400),
        modified: Duration::from_millis(200),
    }
}

fn ready_tracker() -> (StudyLayout, AnticipatedWorkload, ProgressTracker) {
    let (layout, workload) = setup();
    let mut tracker = ProgressTracker::new(&layout, table(), &workload, delays());
    tracker.mark_ready();
    (layout, workload, tracker)
}

fn marker(basename: &str) -> String {
    format!("{SUB01_LOCK}/{basename}")
}

#[test]
fn nothing_is_notified_before_ready_or_after_close() {
    let (layout, workload) = setup();
    let mut tracker = ProgressTracker::new(&layout, table(), &workload, delays());
    assert_eq!(tracker.state(), WatcherState::Initializing);
    assert!(tracker.handle(ChangeKind::Created, &marker("060_Segment_T1w.status")).is_none());

    tracker.mark_ready();
    assert_eq!(tracker.state(), WatcherState::Ready);
    tracker.close();
    assert_eq!(tracker.state(), WatcherState::Closed);
    assert!(tracker.handle(ChangeKind::Created, &marker("060_Segment_T1w.status")).is_none());
    assert_eq!(tracker.pending(), workload.len());
}

#[test]
fn first_event_activates_the_tracker() {
    let (_, _, mut tracker) = ready_tracker();
    tracker.handle(ChangeKind::Created, "lock/unrelated.txt");
    assert_eq!(tracker.state(), WatcherState::Active);
}

#[test]
fn anticipated_marker_increments_by_its_weight_share() {
    let (_, workload, mut tracker) = ready_tracker();

    let notification = tracker
        .handle(ChangeKind::Created, &marker("060_Segment_T1w.status"))
        .expect("anticipated marker");

    let step = table().get("060_Segment_T1w.status").unwrap();
    let expected = step.weight / workload.total_weight();
    match &notification.event {
        ProgressEvent::StepCompleted {
            increment,
            module,
            description,
            ..
        } => {
            assert!((increment - expected).abs() < 1e-12);
            assert_eq!(*module, ModuleName::Structural);
            assert_eq!(*description, step.description);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(notification.delay, None);
    assert!((tracker.progress() - expected).abs() < 1e-12);
}

#[test]
fn repeated_marker_events_do_not_double_increment() {
    let (_, _, mut tracker) = ready_tracker();
    let rel = marker("010_LinearReg_T1w2MNI.status");

    assert!(tracker.handle(ChangeKind::Created, &rel).is_some());
    let after_first = tracker.progress();
    assert!(tracker.handle(ChangeKind::Created, &rel).is_none());
    assert!(tracker.handle(ChangeKind::Modified, &rel).is_none());
    assert_eq!(tracker.progress(), after_first);
}

#[test]
fn markers_outside_the_workload_are_ignored() {
    let (_, _, mut tracker) = ready_tracker();

    // A subject that was not part of the estimate (e.g. a stale earlier run).
    let stale = "lock/xASL_module_Structural/sub-99_1/xASL_module_Structural/060_Segment_T1w.status";
    assert!(tracker.handle(ChangeKind::Created, stale).is_none());
    assert_eq!(tracker.progress(), 0.0);
}

#[test]
fn completing_every_marker_reaches_full_progress() {
    let (layout, workload, mut tracker) = ready_tracker();
    let lock = structural_lock(layout.product_root(), "sub-01");

    let mut total = 0.0;
    for path in workload.paths() {
        let rel = path
            .strip_prefix(layout.product_root())
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/");
        assert!(path.starts_with(&lock));
        if let Some(Notification {
            event: ProgressEvent::StepCompleted { increment, .. },
            ..
        }) = tracker.handle(ChangeKind::Created, &rel)
        {
            total += increment;
        }
        // Duplicates never push past 100%.
        tracker.handle(ChangeKind::Created, &rel);
    }

    assert!((total - 1.0).abs() < 1e-9);
    assert!(tracker.progress() <= 1.0);
    assert!((tracker.progress() - 1.0).abs() < 1e-9);
    assert_eq!(tracker.pending(), 0);
}

#[test]
fn image_created_then_modified_twice_notifies_once() {
    let (_, _, mut tracker) = ready_tracker();
    let image = "Population/M0Check/Tra_M0_sub-01_1.jpg";

    let first = tracker.handle(ChangeKind::Created, image).expect("first sighting");
    assert_eq!(first.delay, Some(Duration::from_millis(400)));
    assert!(matches!(first.event, ProgressEvent::ImageProduced { .. }));

    assert!(tracker.handle(ChangeKind::Modified, image).is_none());
    assert!(tracker.handle(ChangeKind::Modified, image).is_none());
}

#[test]
fn image_first_seen_as_modified_uses_the_modified_delay() {
    let (_, _, mut tracker) = ready_tracker();
    let first = tracker
        .handle(ChangeKind::Modified, "Population/Cor_CBF_sub-01_1.png")
        .unwrap();
    assert_eq!(first.delay, Some(Duration::from_millis(200)));
}

#[test]
fn lock_creation_announces_module_start() {
    let (_, _, mut tracker) = ready_tracker();
    let notification = tracker
        .handle(ChangeKind::Created, &format!("{SUB01_LOCK}/locked"))
        .unwrap();

    let message = notification.event.message().unwrap();
    assert!(message.contains("Structural"), "{message}");
    assert!(message.contains("sub-01"), "{message}");

    let events = notification.event.into_channel_events();
    assert_eq!(
        events,
        vec![ChannelEvent::ChildProcessStdout {
            pid: None,
            text: message,
            style: Some(OutputStyle::Info),
        }]
    );

    // Touching an existing lock dir is not a new start.
    assert!(tracker
        .handle(ChangeKind::Modified, &format!("{SUB01_LOCK}/locked"))
        .is_none());
}

#[test]
fn step_completion_emits_increment_then_message() {
    let (_, _, mut tracker) = ready_tracker();
    let events = tracker
        .handle(ChangeKind::Created, &marker("040_Segment_FLAIR.status"))
        .unwrap()
        .event
        .into_channel_events();

    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], ChannelEvent::ProgressBarIncrement { .. }));
    match &events[1] {
        ChannelEvent::ChildProcessStdout { text, .. } => {
            assert!(text.contains("Segmentation of FLAIR hyperintensities"), "{text}");
        }
        other => panic!("unexpected {other:?}"),
    }
}
