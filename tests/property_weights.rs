mod common;

use proptest::prelude::*;

use crate::common::StudyBuilder;

use xasl_run::config::StudyParameters;
use xasl_run::fs::mock::MockFileSystem;
use xasl_run::steps::{self, supported_versions};
use xasl_run::types::ModuleSelection;
use xasl_run::workload::{StudyLayout, WorkloadEstimator};

#[derive(Debug, Clone)]
struct SubjectShape {
    flair: bool,
    m0: bool,
    asl_sessions: u8,
}

fn subject_strategy() -> impl Strategy<Value = SubjectShape> {
    (any::<bool>(), any::<bool>(), 0u8..3).prop_map(|(flair, m0, asl_sessions)| SubjectShape {
        flair,
        m0,
        asl_sessions,
    })
}

fn selection_strategy() -> impl Strategy<Value = ModuleSelection> {
    prop_oneof![
        Just(ModuleSelection::Structural),
        Just(ModuleSelection::Asl),
        Just(ModuleSelection::Both),
        Just(ModuleSelection::Population),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The summed weight of the anticipated markers is the reported total,
    /// for every table, study shape and set of already-written markers.
    #[test]
    fn total_weight_is_sum_of_anticipated_steps(
        subjects in proptest::collection::vec(subject_strategy(), 0..5),
        selection in selection_strategy(),
        version_idx in 0usize..2,
        done_mask in proptest::collection::vec(any::<bool>(), 40),
        params in (any::<bool>(), any::<bool>(), any::<bool>()),
    ) {
        let version = supported_versions().nth(version_idx).unwrap();
        let table = steps::lookup(version).unwrap();

        let fs = MockFileSystem::new();
        let mut builder = StudyBuilder::new(&fs, "/study");
        for (i, shape) in subjects.iter().enumerate() {
            let name = format!("sub-{i:02}");
            builder = builder.subject(&name);
            if shape.flair {
                builder = builder.flair(&name);
            }
            if shape.m0 {
                builder = builder.m0(&name);
            }
            match shape.asl_sessions {
                0 => {}
                1 => builder = builder.asl(&name, None),
                n => {
                    for run in 1..=n {
                        builder = builder.asl(&name, Some(&run.to_string()));
                    }
                }
            }
        }
        builder.build();

        let (skip_if_no_flair, run_dartel, skip_if_no_m0) = params;
        let study = StudyParameters {
            skip_if_no_flair,
            skip_if_no_m0,
            run_dartel,
            ..StudyParameters::default()
        };
        let layout = StudyLayout::new("/study", "ExploreASL");
        let estimator = WorkloadEstimator::new(&fs, &layout, table, &study);

        // Pretend some of the first estimate's markers were already written.
        let first = estimator.estimate(selection).unwrap();
        for (path, done) in first.paths().iter().zip(done_mask.iter().cycle()) {
            if *done {
                fs.add_file(path, "");
            }
        }

        let workload = estimator.estimate(selection).unwrap();
        let summed: f64 = workload
            .paths()
            .iter()
            .map(|p| table.descriptor_for_path(p).unwrap().weight)
            .sum();
        prop_assert!((summed - workload.total_weight()).abs() < 1e-9);
        prop_assert!(workload.paths().iter().all(|p| !fs_has(&fs, p)));
    }
}

fn fs_has(fs: &MockFileSystem, path: &std::path::Path) -> bool {
    use xasl_run::fs::FileSystem;
    fs.exists(path)
}
