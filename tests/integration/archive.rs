//! `inspect`, `unpack` and `cat` against archives built by `build`.

use crate::common::{FileAssert, TestProject};
use addonpack::constants::PREFIX_MARKER;
use addonpack::test_utils::AddonFixture;
use anyhow::Result;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;

fn built(project: &TestProject) -> Result<PathBuf> {
    let source = project.add_addon(&AddonFixture::basic())?;
    let target = project.join("out/main.pbo");
    project
        .build_cmd(&source, &target)
        .args(["-x", "*.psd"])
        .assert()
        .success();
    Ok(target)
}

#[test]
fn test_inspect_lists_entries() -> Result<()> {
    let project = TestProject::new()?;
    let archive = built(&project)?;

    project
        .cmd()
        .arg("inspect")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("prefix = x\\mod\\addons\\main"))
        .stdout(predicate::str::contains("functions\\fn_init.sqf"))
        .stdout(predicate::str::contains("3 entries"))
        .stdout(predicate::str::contains("ok"));
    Ok(())
}

#[test]
fn test_inspect_json() -> Result<()> {
    let project = TestProject::new()?;
    let archive = built(&project)?;

    let output = project
        .cmd()
        .args(["inspect", "--format", "json"])
        .arg(&archive)
        .output()?;
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(json["prefix"], "x\\mod\\addons\\main");
    assert_eq!(json["checksum_ok"], true);
    assert_eq!(json["entries"].as_array().map(Vec::len), Some(3));
    assert_eq!(json["entries"][0]["name"], "config.bin");
    assert_eq!(json["stored_hash"], json["computed_hash"]);
    Ok(())
}

#[test]
fn test_inspect_detects_corruption() -> Result<()> {
    let project = TestProject::new()?;
    let archive = built(&project)?;

    let mut bytes = fs::read(&archive)?;
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    fs::write(&archive, bytes)?;

    project
        .cmd()
        .arg("inspect")
        .arg(&archive)
        .assert()
        .failure()
        .stdout(predicate::str::contains("MISMATCH"))
        .stderr(predicate::str::contains("Checksum mismatch"));
    Ok(())
}

#[test]
fn test_unpack_restores_files() -> Result<()> {
    let project = TestProject::new()?;
    let archive = built(&project)?;
    let target = project.join("unpacked");

    project
        .cmd()
        .arg("unpack")
        .arg(&archive)
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("3 entries"));

    FileAssert::equals(target.join("functions").join("fn_init.sqf"), "diag_log 'init';\n");
    FileAssert::equals(target.join("script_macros.hpp"), "#define VERSION 3\n");
    FileAssert::equals(target.join(PREFIX_MARKER), "x\\mod\\addons\\main\n");

    // A second run needs --force.
    project
        .cmd()
        .arg("unpack")
        .arg(&archive)
        .arg(&target)
        .assert()
        .failure();
    project
        .cmd()
        .args(["unpack", "-f", "-i", "*.sqf"])
        .arg(&archive)
        .arg(project.join("filtered"))
        .assert()
        .success()
        .stdout(predicate::str::contains("1 entries"));
    FileAssert::not_exists(project.join("filtered").join("config.bin"));
    Ok(())
}

#[test]
fn test_cat_prints_entry() -> Result<()> {
    let project = TestProject::new()?;
    let archive = built(&project)?;

    project
        .cmd()
        .arg("cat")
        .arg(&archive)
        .arg("functions/fn_init.sqf")
        .assert()
        .success()
        .stdout("diag_log 'init';\n");

    project
        .cmd()
        .arg("cat")
        .arg(&archive)
        .arg("nope.sqf")
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.sqf"));
    Ok(())
}
