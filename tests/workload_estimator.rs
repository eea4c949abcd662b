mod common;

use std::path::Path;

use crate::common::{asl_lock, population_lock, structural_lock, table, StudyBuilder};

use xasl_run::config::StudyParameters;
use xasl_run::errors::OrchestratorError;
use xasl_run::fs::mock::MockFileSystem;
use xasl_run::fs::FileSystem;
use xasl_run::types::{ModuleName, ModuleSelection};
use xasl_run::workload::{AnticipatedWorkload, StudyLayout, WorkloadEstimator};

const ROOT: &str = "/study";

fn layout() -> StudyLayout {
    StudyLayout::new(ROOT, "ExploreASL")
}

fn estimate(
    fs: &MockFileSystem,
    params: &StudyParameters,
    selection: ModuleSelection,
) -> AnticipatedWorkload {
    let layout = layout();
    WorkloadEstimator::new(fs, &layout, table(), params)
        .estimate(selection)
        .expect("estimate")
}

fn module_weight(module: ModuleName) -> f64 {
    table().steps_for(module).map(|(_, s)| s.weight).sum()
}

fn module_count(module: ModuleName) -> usize {
    table().steps_for(module).count()
}

#[test]
fn structural_with_flair_includes_flair_steps() {
    let fs = MockFileSystem::new();
    StudyBuilder::new(&fs, ROOT).subject("sub-01").flair("sub-01");

    let workload = estimate(&fs, &StudyParameters::default(), ModuleSelection::Structural);

    let expected = module_count(ModuleName::Structural) + module_count(ModuleName::StructuralFlair);
    assert_eq!(workload.len(), expected);
    let weight = module_weight(ModuleName::Structural) + module_weight(ModuleName::StructuralFlair);
    assert!((workload.total_weight() - weight).abs() < 1e-9);

    let lock = structural_lock(layout().product_root(), "sub-01");
    assert!(fs.is_dir(&lock), "lock dir is created eagerly");
    assert!(workload.contains(&lock.join("040_Segment_FLAIR.status")));
    assert!(workload.contains(&lock.join("060_Segment_T1w.status")));
}

#[test]
fn structural_without_flair_has_base_steps_only() {
    let fs = MockFileSystem::new();
    StudyBuilder::new(&fs, ROOT).subject("sub-01");

    let workload = estimate(&fs, &StudyParameters::default(), ModuleSelection::Structural);

    assert_eq!(workload.len(), module_count(ModuleName::Structural));
    let lock = structural_lock(layout().product_root(), "sub-01");
    assert!(!workload.contains(&lock.join("040_Segment_FLAIR.status")));
}

#[test]
fn asl_sessions_get_their_own_lock_dirs() {
    let fs = MockFileSystem::new();
    StudyBuilder::new(&fs, ROOT)
        .subject("sub-01")
        .asl("sub-01", Some("1"))
        .asl("sub-01", Some("2"));

    let workload = estimate(&fs, &StudyParameters::default(), ModuleSelection::Asl);

    let per_session = module_count(ModuleName::Asl);
    assert_eq!(workload.len(), 2 * per_session);

    let product = layout();
    for session in ["ASL_1", "ASL_2"] {
        let dir = asl_lock(product.product_root(), "sub-01", Some(session));
        assert!(fs.is_dir(&dir), "missing {dir:?}");
        for (basename, _) in table().steps_for(ModuleName::Asl) {
            assert!(workload.contains(&dir.join(basename)));
        }
    }
}

#[test]
fn single_session_asl_has_no_session_suffix() {
    let fs = MockFileSystem::new();
    StudyBuilder::new(&fs, ROOT).subject("sub-01").asl("sub-01", None);

    let workload = estimate(&fs, &StudyParameters::default(), ModuleSelection::Asl);

    let dir = asl_lock(layout().product_root(), "sub-01", None);
    assert_eq!(workload.len(), module_count(ModuleName::Asl));
    assert!(workload.contains(&dir.join("080_Quantification.status")));
}

#[test]
fn population_is_a_single_step_set() {
    let fs = MockFileSystem::new();
    StudyBuilder::new(&fs, ROOT).subject("sub-01").subject("sub-02");

    let workload = estimate(&fs, &StudyParameters::default(), ModuleSelection::Population);

    assert_eq!(workload.len(), module_count(ModuleName::Population));
    assert!((workload.total_weight() - module_weight(ModuleName::Population)).abs() < 1e-9);
    let dir = population_lock(layout().product_root());
    assert!(workload.paths().iter().all(|p| p.parent() == Some(dir.as_path())));
}

#[test]
fn both_is_the_union_of_structural_and_asl() {
    let fs = MockFileSystem::new();
    StudyBuilder::new(&fs, ROOT)
        .subject("sub-01")
        .flair("sub-01")
        .asl("sub-01", None);
    let params = StudyParameters::default();

    let structural = estimate(&fs, &params, ModuleSelection::Structural);
    let asl = estimate(&fs, &params, ModuleSelection::Asl);
    let both = estimate(&fs, &params, ModuleSelection::Both);

    assert_eq!(both.len(), structural.len() + asl.len());
    assert!((both.total_weight() - structural.total_weight() - asl.total_weight()).abs() < 1e-9);
}

#[test]
fn estimating_twice_gives_the_same_workload() {
    let fs = MockFileSystem::new();
    StudyBuilder::new(&fs, ROOT)
        .subject("sub-01")
        .flair("sub-01")
        .subject("sub-02")
        .asl("sub-02", Some("1"));
    let params = StudyParameters::default();

    let first = estimate(&fs, &params, ModuleSelection::Both);
    let second = estimate(&fs, &params, ModuleSelection::Both);
    assert_eq!(first, second);
}

#[test]
fn existing_markers_are_not_anticipated_again() {
    let fs = MockFileSystem::new();
    StudyBuilder::new(&fs, ROOT).subject("sub-01");
    let lock = structural_lock(layout().product_root(), "sub-01");
    fs.add_file(lock.join("010_LinearReg_T1w2MNI.status"), "");
    fs.add_file(lock.join("060_Segment_T1w.status"), "");

    let workload = estimate(&fs, &StudyParameters::default(), ModuleSelection::Structural);

    assert_eq!(workload.len(), module_count(ModuleName::Structural) - 2);
    assert!(!workload.contains(&lock.join("060_Segment_T1w.status")));
    let done = table().get("010_LinearReg_T1w2MNI.status").unwrap().weight
        + table().get("060_Segment_T1w.status").unwrap().weight;
    assert!((workload.total_weight() - (module_weight(ModuleName::Structural) - done)).abs() < 1e-9);
}

#[test]
fn fully_processed_study_has_empty_workload() {
    let fs = MockFileSystem::new();
    StudyBuilder::new(&fs, ROOT).subject("sub-01");
    let lock = structural_lock(layout().product_root(), "sub-01");
    for (basename, _) in table().steps_for(ModuleName::Structural) {
        fs.add_file(lock.join(basename), "");
    }

    let workload = estimate(&fs, &StudyParameters::default(), ModuleSelection::Structural);
    assert!(workload.is_empty());
    assert_eq!(workload.total_weight(), 0.0);
}

#[test]
fn skip_rules_exclude_whole_subjects() {
    let fs = MockFileSystem::new();
    StudyBuilder::new(&fs, ROOT)
        .subject("sub-01")
        .flair("sub-01")
        .subject("sub-02");
    let params = StudyParameters {
        skip_if_no_flair: true,
        ..StudyParameters::default()
    };

    let workload = estimate(&fs, &params, ModuleSelection::Structural);

    let product = layout();
    let sub02 = structural_lock(product.product_root(), "sub-02");
    assert!(workload.paths().iter().all(|p| !p.starts_with(&sub02)));
    assert!(!fs.exists(&sub02), "skipped subjects get no lock dir");
    assert_eq!(
        workload.len(),
        module_count(ModuleName::Structural) + module_count(ModuleName::StructuralFlair)
    );
}

#[test]
fn m0_and_asl_skip_rules() {
    let fs = MockFileSystem::new();
    StudyBuilder::new(&fs, ROOT)
        .subject("sub-01")
        .asl("sub-01", None)
        .m0("sub-01")
        .subject("sub-02")
        .asl("sub-02", None)
        .subject("sub-03");

    let params = StudyParameters {
        skip_if_no_m0: true,
        ..StudyParameters::default()
    };
    let workload = estimate(&fs, &params, ModuleSelection::Asl);
    assert_eq!(workload.len(), module_count(ModuleName::Asl));

    let params = StudyParameters {
        skip_if_no_asl: true,
        ..StudyParameters::default()
    };
    let workload = estimate(&fs, &params, ModuleSelection::Structural);
    assert_eq!(workload.len(), 2 * module_count(ModuleName::Structural));
}

#[test]
fn dartel_is_added_once_for_several_subjects() {
    let fs = MockFileSystem::new();
    StudyBuilder::new(&fs, ROOT)
        .subject("sub-01")
        .subject("sub-02")
        .subject("sub-03");
    let params = StudyParameters {
        run_dartel: true,
        ..StudyParameters::default()
    };

    let workload = estimate(&fs, &params, ModuleSelection::Structural);

    let dartel = layout()
        .product_root()
        .join("lock/xASL_module_DARTEL/xASL_module_DARTEL/010_DARTEL.status");
    assert!(workload.contains(&dartel));
    assert_eq!(workload.len(), 3 * module_count(ModuleName::Structural) + 1);
}

#[test]
fn dartel_needs_more_than_one_subject() {
    let fs = MockFileSystem::new();
    StudyBuilder::new(&fs, ROOT).subject("sub-01");
    let params = StudyParameters {
        run_dartel: true,
        ..StudyParameters::default()
    };

    let workload = estimate(&fs, &params, ModuleSelection::Structural);
    assert_eq!(workload.len(), module_count(ModuleName::Structural));
}

#[test]
fn longitudinal_registration_runs_on_first_visit_only() {
    let fs = MockFileSystem::new();
    StudyBuilder::new(&fs, ROOT)
        .subject_visit("sub-01", "ses-1")
        .subject_visit("sub-01", "ses-2");
    let params = StudyParameters {
        run_long_reg: true,
        ..StudyParameters::default()
    };

    let workload = estimate(&fs, &params, ModuleSelection::Structural);

    let product = layout();
    let lock = product.product_root().join("lock");
    for visit in [1, 2] {
        let dir = lock.join(format!(
            "xASL_module_Structural/sub-01_{visit}/xASL_module_Structural"
        ));
        assert!(workload.contains(&dir.join("060_Segment_T1w.status")));
    }
    let long_reg = lock.join("xASL_module_LongReg/sub-01_1/xASL_module_LongReg/010_LongReg.status");
    assert!(workload.contains(&long_reg));
    assert_eq!(workload.len(), 2 * module_count(ModuleName::Structural) + 1);
}

#[test]
fn excluded_reserved_and_unmatched_folders_are_ignored() {
    let fs = MockFileSystem::new();
    StudyBuilder::new(&fs, ROOT)
        .subject("sub-01")
        .subject("sub-02")
        .file("rawdata/code/script.m")
        .file("rawdata/notes/readme.txt");
    let params = StudyParameters {
        excluded_subjects: vec!["sub-02".to_string()],
        ..StudyParameters::default()
    };

    let workload = estimate(&fs, &params, ModuleSelection::Structural);
    assert_eq!(workload.len(), module_count(ModuleName::Structural));
    assert!(workload
        .paths()
        .iter()
        .all(|p| p.to_string_lossy().contains("sub-01_1")));
}

#[test]
fn missing_rawdata_is_a_workload_error() {
    let fs = MockFileSystem::new();
    fs.add_dir("/study/derivatives");
    let layout = layout();
    let params = StudyParameters::default();

    let err = WorkloadEstimator::new(&fs, &layout, table(), &params)
        .estimate(ModuleSelection::Both)
        .unwrap_err();

    match err {
        OrchestratorError::WorkloadComputation { module, .. } => {
            assert_eq!(module, "Structural and ASL");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!fs.exists(Path::new("/study/derivatives/ExploreASL/lock")));
}
