//! Relative-path behaviour. Kept in its own test binary because it changes
//! the process working directory.

use std::env;
use std::fs;
use std::path::Path;

use arcflow_archive::{
    Archival, CancelToken, archive, archive_files, collect_dir, make_files_map, unarchive,
};
use tempfile::tempdir;

#[test]
fn relative_sources_map_to_expected_names() {
    let temp = tempdir().unwrap();
    let work = temp.path().join("work");
    fs::create_dir_all(work.join("project/a")).unwrap();
    fs::write(work.join("project/a/b.txt"), "b").unwrap();
    fs::write(work.join("project/top.txt"), "top").unwrap();
    let scratch = temp.path().join("scratch");
    fs::create_dir(&scratch).unwrap();

    let previous = env::current_dir().unwrap();
    env::set_current_dir(work.join("project")).unwrap();
    let cancel = CancelToken::new();

    // `.` stores entries at the archive root, with absolute physical paths
    let collected = collect_dir(&cancel, Path::new(".")).unwrap();
    assert!(collected.iter().all(|e| e.physical_path.is_absolute()));
    assert!(collected.iter().any(|e| e.logical_name == "a/b.txt"));
    let flat = scratch.join("flat.tar");
    archive(&cancel, ".", &flat, None, Archival::Tar).unwrap();

    // `["a/b.txt"]` trimmed by `a` becomes `b.txt`
    let entries = make_files_map(&cancel, &["a/b.txt"], "a").unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.logical_name.as_str()).collect();
    let trimmed = scratch.join("trimmed.zip");
    archive_files(&cancel, &entries, &trimmed, None, Archival::Zip).unwrap();

    env::set_current_dir(&work).unwrap();
    // `./project` nests everything under `project/`
    let nested = scratch.join("nested.tar");
    archive(&cancel, "./project", &nested, None, Archival::Tar).unwrap();

    env::set_current_dir(previous).unwrap();

    assert_eq!(names, ["b.txt"]);

    let dest = temp.path().join("flat");
    unarchive(&cancel, &flat, &dest).unwrap();
    assert_eq!(fs::read_to_string(dest.join("top.txt")).unwrap(), "top");
    assert_eq!(fs::read_to_string(dest.join("a/b.txt")).unwrap(), "b");
    assert!(!dest.join("project").exists());

    let dest = temp.path().join("trimmed");
    unarchive(&cancel, &trimmed, &dest).unwrap();
    assert_eq!(fs::read_to_string(dest.join("b.txt")).unwrap(), "b");

    let dest = temp.path().join("nested");
    unarchive(&cancel, &nested, &dest).unwrap();
    assert_eq!(
        fs::read_to_string(dest.join("project/top.txt")).unwrap(),
        "top"
    );
    assert!(!dest.join("top.txt").exists());
}
