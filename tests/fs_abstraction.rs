use std::path::{Path, PathBuf};

use tempfile::TempDir;

use xasl_run::fs::mock::MockFileSystem;
use xasl_run::fs::{FileSystem, RealFileSystem};
use xasl_run::runtime_env::glob::glob_below;

#[test]
fn mock_fs_lists_children_sorted() {
    let fs = MockFileSystem::new();
    fs.add_file("/study/rawdata/sub-02/anat/t1.nii", b"");
    fs.add_file("/study/rawdata/sub-01/anat/t1.nii", b"");
    fs.add_dir("/study/rawdata/code");

    let entries = fs.read_dir(Path::new("/study/rawdata")).unwrap();
    assert_eq!(
        entries,
        vec![
            PathBuf::from("/study/rawdata/code"),
            PathBuf::from("/study/rawdata/sub-01"),
            PathBuf::from("/study/rawdata/sub-02"),
        ]
    );
    assert!(fs.is_dir(Path::new("/study/rawdata/sub-01/anat")));
    assert!(fs.is_file(Path::new("/study/rawdata/sub-01/anat/t1.nii")));
    assert!(fs.read_dir(Path::new("/study/missing")).is_err());
}

#[test]
fn mock_fs_refuses_dir_over_file() {
    let fs = MockFileSystem::new();
    fs.add_file("/opt/xasl/VERSION_1.11.0", b"");
    assert!(fs.create_dir_all(Path::new("/opt/xasl/VERSION_1.11.0")).is_err());
    fs.create_dir_all(Path::new("/opt/xasl/lock/a")).unwrap();
    fs.create_dir_all(Path::new("/opt/xasl/lock/a")).unwrap();
    assert_eq!(fs.read_to_string(Path::new("/opt/xasl/VERSION_1.11.0")).unwrap(), "");
}

#[test]
fn glob_matches_alternatives_without_crossing_separators() {
    let fs = MockFileSystem::new();
    fs.add_dir("/mcr/runtime/glnxa64");
    fs.add_dir("/mcr/bin/glnxa64");
    fs.add_dir("/mcr/sys/os/glnxa64");
    fs.add_dir("/mcr/bin/maci64");
    fs.add_dir("/mcr/toolbox/runtime/glnxa64");

    let found = glob_below(
        &fs,
        Path::new("/mcr"),
        "{runtime,bin,sys/os,extern/bin}/glnxa64",
    )
    .unwrap();

    assert_eq!(
        found.matches,
        vec![
            PathBuf::from("/mcr/bin/glnxa64"),
            PathBuf::from("/mcr/runtime/glnxa64"),
            PathBuf::from("/mcr/sys/os/glnxa64"),
        ]
    );
    assert!(found.denied.is_empty());
}

#[test]
fn glob_finds_interpreter_installs() {
    let fs = MockFileSystem::new();
    fs.add_file("/usr/local/MATLAB/R2019b/bin/matlab", b"");
    fs.add_file("/usr/local/MATLAB/R2022a/bin/matlab", b"");
    fs.add_file("/usr/local/MATLAB/R2022a/bin/mex", b"");

    let found = glob_below(&fs, Path::new("/usr/local/MATLAB"), "R*/bin/matlab").unwrap();
    assert_eq!(found.matches.len(), 2);

    assert!(glob_below(&fs, Path::new("/nowhere"), "R*/bin/matlab").is_err());
}

#[test]
fn real_fs_write_creates_parents() {
    let tmp = TempDir::new().unwrap();
    let fs = RealFileSystem;
    let marker = tmp.path().join("lock/xASL_module_Structural/sub-01_1/x.status");

    fs.write(&marker, b"").unwrap();
    assert!(fs.is_file(&marker));
    assert_eq!(
        fs.read_dir(marker.parent().unwrap()).unwrap(),
        vec![marker.clone()]
    );
    assert_eq!(
        fs.canonicalize(&marker).unwrap(),
        std::fs::canonicalize(&marker).unwrap()
    );
}

#[cfg(unix)]
#[test]
fn glob_records_unreadable_directories() {
    let tmp = TempDir::new().unwrap();
    let mcr = tmp.path().join("mcr");
    std::fs::create_dir_all(mcr.join("runtime/glnxa64")).unwrap();
    std::fs::create_dir_all(mcr.join("bin/glnxa64")).unwrap();
    let Some(_locked) = xasl_run_test_utils::UnreadableDir::new(mcr.join("bin")) else {
        return;
    };

    let found = glob_below(&RealFileSystem, &mcr, "{runtime,bin}/glnxa64").unwrap();
    assert_eq!(found.matches, vec![mcr.join("runtime/glnxa64")]);
    assert_eq!(found.denied, vec![mcr.join("bin")]);
}
