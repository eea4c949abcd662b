use xasl_run::types::ModuleName;
use xasl_run::watch::{classify, ImageAxis, PipelinePath, PipelineWatchProfile};
use xasl_run::workload::{LockKey, SubjectVisit, StudyLayout};

#[test]
fn subject_lock_dir_is_recognised() {
    let path = classify("lock/xASL_module_Structural/sub-01_1/xASL_module_Structural/locked");
    assert_eq!(
        path,
        PipelinePath::LockAcquired(LockKey::for_subject(ModuleName::Structural, "sub-01", 1, None))
    );
}

#[test]
fn session_and_visit_are_parsed() {
    let path = classify("lock/xASL_module_ASL/sub_007_2/xASL_module_ASL_ASL_3/locked");
    let PipelinePath::LockAcquired(key) = path else {
        panic!("expected a lock, got {path:?}");
    };
    assert_eq!(key.module, ModuleName::Asl);
    assert_eq!(
        key.subject,
        Some(SubjectVisit {
            subject: "sub_007".to_string(),
            visit: 2,
        })
    );
    assert_eq!(key.session.as_deref(), Some("ASL_3"));
}

#[test]
fn cross_subject_lock_has_no_subject() {
    let path = classify("lock/xASL_module_Population/xASL_module_Population/locked");
    assert_eq!(path, PipelinePath::LockAcquired(LockKey::for_study(ModuleName::Population)));
}

#[test]
fn status_file_carries_key_and_basename() {
    let path = classify(
        "lock/xASL_module_ASL/sub-01_1/xASL_module_ASL_ASL_1/080_Quantification.status",
    );
    match path {
        PipelinePath::StatusFile { key, basename } => {
            assert_eq!(
                key,
                LockKey::for_subject(ModuleName::Asl, "sub-01", 1, Some("ASL_1".to_string()))
            );
            assert_eq!(basename, "080_Quantification.status");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn grammar_agrees_with_layout() {
    let layout = StudyLayout::new("/study", "ExploreASL");
    let key = LockKey::for_subject(ModuleName::StructuralFlair, "sub-02", 1, None);
    let marker = layout.lock_dir(&key).join("040_Segment_FLAIR.status");
    let rel = marker
        .strip_prefix(layout.product_root())
        .unwrap()
        .to_string_lossy()
        .replace('\\', "/");

    assert_eq!(
        classify(&rel),
        PipelinePath::StatusFile {
            key,
            basename: "040_Segment_FLAIR.status".to_string(),
        }
    );
}

#[test]
fn rendered_images_are_recognised_at_any_depth() {
    match classify("Population/M0Check/Tra_M0_sub-01_1.jpg") {
        PipelinePath::RenderedImage(image) => {
            assert_eq!(image.axis, ImageAxis::Transversal);
            assert_eq!(image.kind, "M0");
            assert_eq!(image.target, "sub-01_1");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        classify("Population/Sag_CBF_sub-01_1_ASL_1.png"),
        PipelinePath::RenderedImage(_)
    ));
}

#[test]
fn noise_is_unrecognised() {
    for rel in [
        "lock/xASL_module_Structural/sub-01_1/xASL_module_ASL/locked",
        "lock/xASL_module_Bogus/sub-01_1/xASL_module_Bogus/locked",
        "lock/xASL_module_ASL/sub-01_1/xASL_module_ASL/notes.status",
        "Population/rT1_sub-01_1.nii",
        "Population/Axial_CBF_sub-01.jpg",
        "sub-01_1/T1.nii.gz",
        "",
    ] {
        assert_eq!(classify(rel), PipelinePath::Unrecognized, "{rel}");
    }
}

#[test]
fn watch_profile_filters_by_extension() {
    let profile = PipelineWatchProfile::new().unwrap();

    assert!(profile.matches("lock/xASL_module_ASL/sub-01_1/xASL_module_ASL/locked"));
    assert!(profile.matches("lock/xASL_module_ASL/sub-01_1/xASL_module_ASL/010_TopUpASL.status"));
    assert!(profile.matches("Population/M0Check/Tra_M0_sub-01_1.jpg"));
    assert!(profile.matches("Population/Cor_CBF_sub-01_1.png"));

    assert!(!profile.matches("Population/rT1_sub-01_1.nii"));
    assert!(!profile.matches("lock/xASL_module_ASL/sub-01_1/xASL_module_ASL/log.txt"));
    assert!(!profile.matches("sub-01_1/ASL_1/CBF.jpg"));
}
