//! Runs the checked-in files under `testdata/` through a small command set.
//!
//! Set `DATADRIVEN_REWRITE=true` to regenerate their expectations.

use datadriven::{
    Abort, Case, Config, Dest, TestData, config_from_env, run_root, run_test,
    run_test_from_string, walk,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const TESTDATA: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/testdata");

fn handle(_: &mut Case, d: &TestData) -> Result<String, Abort> {
    match d.cmd.as_str() {
        "echo" => Ok(d.input.clone()),
        "upper" => Ok(d.input.to_uppercase()),
        "add" => {
            let (mut a, mut b) = (0i64, 0i64);
            d.scan_args("pair", &mut [Dest::Int(&mut a), Dest::Int(&mut b)])?;
            Ok((a + b).to_string())
        }
        "flags" => Ok(d
            .cmd_args
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")),
        "repeat" => {
            let times: u64 = d.arg("times")?;
            let sep = if d.has_arg("blank") { "\n\n" } else { "\n" };
            Ok(vec![d.input.as_str(); times as usize].join(sep))
        }
        other => Err(d.fatal(format!("unknown command: {other}"))),
    }
}

fn copy_tree(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_tree(&entry.path(), &target);
        } else {
            fs::copy(entry.path(), target).unwrap();
        }
    }
}

fn collect_files(dir: &Path, files: &mut Vec<(String, String)>) {
    let mut entries: Vec<_> = fs::read_dir(dir).unwrap().map(|e| e.unwrap()).collect();
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        if entry.file_type().unwrap().is_dir() {
            collect_files(&entry.path(), files);
        } else {
            let contents = fs::read_to_string(entry.path()).unwrap();
            files.push((entry.file_name().to_string_lossy().into_owned(), contents));
        }
    }
}

#[test]
fn testdata() {
    let config = config_from_env().unwrap();
    run_root("testdata", |case| {
        walk(case, TESTDATA, |case, path| run_test(case, path, &config, handle))
    });
}

#[test]
fn rewriting_testdata_changes_nothing() {
    let dir = TempDir::new().unwrap();
    copy_tree(Path::new(TESTDATA), dir.path());

    let config = Config {
        rewrite: true,
        ..Config::default()
    };
    run_root("rewrite", |case| {
        walk(case, dir.path(), |case, path| {
            run_test(case, path, &config, handle)
        })
    });

    let (mut before, mut after) = (Vec::new(), Vec::new());
    collect_files(Path::new(TESTDATA), &mut before);
    collect_files(dir.path(), &mut after);
    assert_eq!(before, after);
}

#[test]
fn walk_names_cases_after_paths() {
    let mut root = Case::root("");
    let result = walk(&mut root, TESTDATA, |case, path| {
        run_test(case, path, &Config::default(), handle)
    });
    root.finish(result);
    assert!(!root.failed(), "{root}");

    let names: Vec<_> = root.children().iter().map(|c| c.path()).collect();
    assert_eq!(names, ["basic", "nested"]);

    let nested = &root.children()[1];
    let files: Vec<_> = nested.children().iter().map(|c| c.path()).collect();
    assert_eq!(files, ["nested/blank", "nested/subtests"]);

    let upper = &nested.children()[1].children()[0];
    assert_eq!(upper.path(), "nested/subtests/upper");
    assert_eq!(upper.children()[0].path(), "nested/subtests/upper/upper/nested");
}

#[test]
fn rewrite_replaces_stale_expectations() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stale");
    fs::write(
        &path,
        "echo\nhi\n----\nbye\n\nrepeat times=2 blank\nz\n----\nz\n",
    )
    .unwrap();

    let config = Config {
        rewrite: true,
        ..Config::default()
    };
    run_root("stale", |case| run_test(case, &path, &config, handle));

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "echo\nhi\n----\nhi\n\nrepeat times=2 blank\nz\n----\n----\nz\n\nz\n----\n----\n"
    );
}

#[test]
fn mismatch_reports_both_outputs() {
    let mut root = Case::root("");
    let result = run_test_from_string(
        &mut root,
        "upper\nabc\n----\nabc\n",
        &Config::default(),
        handle,
    );

    let Err(Abort::Fatal(msg)) = result else {
        panic!("expected mismatch, got {result:?}");
    };
    assert!(msg.contains("<string>:1: abc"), "{msg}");
    assert!(msg.contains("expected:\nabc\n"), "{msg}");
    assert!(msg.contains("found:\nABC\n"), "{msg}");
    assert!(msg.contains("-abc\n+ABC\n"), "{msg}");
}

#[test]
fn unknown_command_fails_file() {
    let mut root = Case::root("");
    let result = run_test_from_string(&mut root, "frobnicate\n----\n", &Config::default(), handle);
    assert_eq!(
        result,
        Err(Abort::Fatal("<string>:1: unknown command: frobnicate".to_string()))
    );
}
