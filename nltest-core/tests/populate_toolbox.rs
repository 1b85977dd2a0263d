use std::fs;
use std::path::{Path, PathBuf};

use tempfile::tempdir;

use nltest_core::discovery::tree_files;
use nltest_core::manifest::ToolboxManifest;
use nltest_core::populate::Populator;

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, contents).expect("write");
}

/// A project root shaped like the real repository, with the toolbox inside it.
fn fake_project(root: &Path) -> PathBuf {
    write(&root.join("src/testsNonlin.cc"), "cc");
    write(&root.join("src/testsNonlin.hh"), "hh");
    write(&root.join("src/README.md"), "skip me");
    write(&root.join("src/tests/Beale.cxx"), "beale");
    write(&root.join("src/tests/Hilbert.cxx"), "hilbert");
    write(&root.join("submodules/Utils/src/Utils.cc"), "utils cc");
    write(&root.join("submodules/Utils/src/Utils.hh"), "utils hh");
    write(&root.join("submodules/Utils/src/Utils/Console.hxx"), "console");
    write(&root.join("submodules/Utils/src/Utils/Trace.cc"), "trace");
    write(&root.join("submodules/Utils/src/Utils/fmt/format.h"), "fmt h");
    write(&root.join("submodules/Utils/src/Utils/fmt/format.cc"), "fmt cc");
    write(&root.join("submodules/Utils/src/Utils/zstream/zstream.h"), "z");
    write(&root.join("submodules/Utils/src/Utils/mingw-std-threads/mingw.thread.h"), "t");
    write(&root.join("submodules/Utils/src/Eigen/Dense"), "dense");
    write(&root.join("submodules/Utils/src/Eigen/src/Core/Matrix.h"), "matrix");
    write(&root.join("license.txt"), "license");
    write(&root.join("license_3rd.txt"), "third party");

    let toolbox = root.join("toolbox");
    write(&toolbox.join("bin/NLtestMexWrapper.mexa64"), "old mex");
    write(&toolbox.join("bin/keep.m"), "matlab");
    toolbox
}

fn snapshot(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    tree_files(dir)
        .expect("walk")
        .into_iter()
        .map(|rel| {
            let bytes = fs::read(dir.join(&rel)).expect("read");
            (rel, bytes)
        })
        .collect()
}

#[test]
fn builds_expected_layout() {
    let tmp = tempdir().expect("tempdir");
    let toolbox = fake_project(tmp.path());

    let report = Populator::for_toolbox(&toolbox).run().expect("populate");

    for rel in [
        "src/testsNonlin.cc",
        "src/testsNonlin.hh",
        "src/Utils.cc",
        "src/Utils.hh",
        "src/tests/Beale.cxx",
        "src/Utils/Console.hxx",
        "src/Utils/Trace.cc",
        "src/Utils/fmt/format.h",
        "src/Utils/fmt/format.cc",
        "src/Utils/zstream/zstream.h",
        "src/Utils/mingw-std-threads/mingw.thread.h",
        "src/Utils/Eigen/Dense",
        "src/Utils/Eigen/src/Core/Matrix.h",
        "license.txt",
        "license_3rd.txt",
    ] {
        assert!(toolbox.join(rel).is_file(), "missing {rel}");
    }

    assert!(!toolbox.join("src/README.md").exists());
    assert!(!toolbox.join("bin/NLtestMexWrapper.mexa64").exists());
    assert!(toolbox.join("bin/keep.m").exists());
    assert_eq!(report.removed_artifacts.len(), 1);
    assert!(!report.removed_staging_root);
}

#[test]
fn second_run_produces_identical_tree() {
    let tmp = tempdir().expect("tempdir");
    let toolbox = fake_project(tmp.path());
    let populator = Populator::for_toolbox(&toolbox);

    // Everything the run owns; bin/ holds compiled outputs from other tools.
    let owned = |dir: &Path| -> Vec<(PathBuf, Vec<u8>)> {
        snapshot(dir)
            .into_iter()
            .filter(|(rel, _)| !rel.starts_with("bin"))
            .collect()
    };

    let first_report = populator.run().expect("first run");
    let first = owned(&toolbox);

    let second_report = populator.run().expect("second run");
    let second = owned(&toolbox);

    assert_eq!(first, second);
    assert!(first.iter().any(|(rel, _)| rel == Path::new("license_3rd.txt")));
    assert!(second_report.removed_staging_root);
    assert_eq!(first_report.rules, second_report.rules);
}

#[test]
fn loads_manifest_from_toml_file() {
    let tmp = tempdir().expect("tempdir");
    let root = tmp.path();
    write(&root.join("src/a.cc"), "a");
    write(&root.join("src/b.hh"), "b");
    write(
        &root.join("toolbox/layout.toml"),
        r#"
staging_root = "src"
directories = ["src"]

[[rules]]
source = "src"
pattern = "*.hh"
destination = "src"
"#,
    );

    let manifest = ToolboxManifest::load(&root.join("toolbox/layout.toml")).expect("load");
    let report = Populator::new(manifest, root, root.join("toolbox"))
        .run()
        .expect("populate");

    assert_eq!(report.copied_files(), 1);
    assert!(root.join("toolbox/src/b.hh").exists());
    assert!(!root.join("toolbox/src/a.cc").exists());
}

#[test]
fn missing_eigen_tree_is_fatal() {
    let tmp = tempdir().expect("tempdir");
    let toolbox = fake_project(tmp.path());
    fs::remove_dir_all(tmp.path().join("submodules/Utils/src/Eigen")).expect("rm eigen");

    let err = Populator::for_toolbox(&toolbox).run().unwrap_err();
    assert!(format!("{err:#}").contains("Eigen"));
    assert!(!toolbox.join("license.txt").exists());
}
