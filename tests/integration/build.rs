//! `addonpack build` end to end.

use crate::common::{FileAssert, TestProject};
use addonpack::pbo::Archive;
use addonpack::test_utils::{AddonFixture, init_test_logging};
use anyhow::Result;
use predicates::prelude::*;
use std::fs;

#[test]
fn test_build_basic_addon() -> Result<()> {
    init_test_logging(None);
    let project = TestProject::new()?;
    let source = project.add_addon(&AddonFixture::basic())?;
    let target = project.join("out/main.pbo");

    project
        .build_cmd(&source, &target)
        .args(["-x", "*.psd"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Built"))
        .stdout(predicate::str::contains("3 entries"));

    let archive = Archive::read(&target)?;
    archive.verify_checksum()?;
    assert_eq!(archive.prefix(), Some("x\\mod\\addons\\main"));

    let names: Vec<&str> = archive.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["config.bin", "functions\\fn_init.sqf", "script_macros.hpp"]);
    assert_eq!(
        archive.entry_data("config.bin")?,
        b"class CfgPatches { class main { version = 3; }; };\n"
    );

    // Sources are untouched and the workspace is gone.
    FileAssert::not_exists(source.join("config.bin"));
    assert_eq!(fs::read_dir(project.join("tmp").join("addonpack"))?.count(), 0);
    Ok(())
}

#[test]
fn test_build_is_deterministic() -> Result<()> {
    let project = TestProject::new()?;
    let source = project.add_addon(&AddonFixture::basic())?;
    let first = project.join("out/first.pbo");
    let second = project.join("out/second.pbo");

    project.build_cmd(&source, &first).assert().success();
    project.build_cmd(&source, &second).assert().success();

    assert_eq!(fs::read(&first)?, fs::read(&second)?);
    Ok(())
}

#[test]
fn test_existing_target_requires_force() -> Result<()> {
    let project = TestProject::new()?;
    let source = project.add_addon(&AddonFixture::basic())?;
    let target = project.write_file("out/main.pbo", "old")?;

    project
        .build_cmd(&source, &target)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    FileAssert::equals(&target, "old");

    project.build_cmd(&source, &target).arg("-f").assert().success();
    Archive::read(&target)?.verify_checksum()?;
    Ok(())
}

#[test]
fn test_include_root_supplies_shared_macros() -> Result<()> {
    let project = TestProject::new()?;
    AddonFixture::new("common", Some("x\\lib\\addons\\common"))
        .with_file("script_macros_common.hpp", "#define QUOTE(var) #var\n")
        .write_to(&project.join("lib"))?;

    let addon = AddonFixture::new("main", Some("x\\mod\\addons\\main")).with_file(
        "config.cpp",
        "#include \"\\x\\lib\\addons\\common\\script_macros_common.hpp\"\n\
         class CfgPatches { class main { name = QUOTE(main_addon); }; };\n",
    );
    let source = project.add_addon(&addon)?;
    let target = project.join("out/main.pbo");

    project
        .build_cmd(&source, &target)
        .arg("-i")
        .arg(project.join("lib"))
        .assert()
        .success();

    let archive = Archive::read(&target)?;
    let config = String::from_utf8_lossy(archive.entry_data("config.bin")?).into_owned();
    assert!(config.contains("name = \"main_addon\";"), "{config}");
    Ok(())
}

#[test]
fn test_failed_compile_reports_stage_and_leaves_no_archive() -> Result<()> {
    let project = TestProject::new()?;
    let addon = AddonFixture::basic().with_file("config.cpp", "#include \"missing.hpp\"\n");
    let source = project.add_addon(&addon)?;
    let target = project.join("out/main.pbo");

    project
        .build_cmd(&source, &target)
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.hpp"))
        .stderr(predicate::str::contains("binarize"));

    FileAssert::not_exists(&target);
    FileAssert::exists(source.join("config.cpp"));
    Ok(())
}

#[test]
fn test_pack_only_skips_compilation() -> Result<()> {
    let project = TestProject::new()?;
    let source = project.add_addon(&AddonFixture::basic())?;
    let target = project.join("out/main.pbo");

    project
        .build_cmd(&source, &target)
        .args(["-p", "-x", "art/*"])
        .assert()
        .success();

    let archive = Archive::read(&target)?;
    let names: Vec<&str> = archive.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["functions\\fn_init.sqf", "script_macros.hpp"]);
    Ok(())
}

#[test]
fn test_model_without_binarizer_warns_once() -> Result<()> {
    let project = TestProject::new()?;
    let addon = AddonFixture::new("models", Some("x\\mod\\addons\\models"))
        .with_file("a.p3d", b"MLOD\x01\x01\0\0")
        .with_file("b.p3d", b"MLOD\x01\x01\0\0");
    let source = project.add_addon(&addon)?;

    project
        .build_cmd(&source, &project.join("out/models.pbo"))
        .assert()
        .success()
        .stderr(predicate::str::contains("[fallback-binarizer]").count(1));

    project
        .build_cmd(&source, &project.join("out/muted.pbo"))
        .args(["-w", "fallback-binarizer"])
        .assert()
        .success()
        .stderr(predicate::str::contains("fallback-binarizer").not());

    let archive = Archive::read(&project.join("out/models.pbo"))?;
    assert_eq!(archive.entry_data("a.p3d")?, b"MLOD\x01\x01\0\0");
    Ok(())
}

#[test]
fn test_keep_temp_reports_workspace() -> Result<()> {
    let project = TestProject::new()?;
    let source = project.add_addon(&AddonFixture::basic())?;

    project
        .build_cmd(&source, &project.join("out/main.pbo"))
        .arg("--keep-temp")
        .assert()
        .success()
        .stdout(predicate::str::contains("workspace kept at"));

    assert_eq!(fs::read_dir(project.join("tmp").join("addonpack"))?.count(), 1);
    Ok(())
}

#[test]
fn test_key_without_signer_fails_before_packing() -> Result<()> {
    let project = TestProject::new()?;
    let source = project.add_addon(&AddonFixture::basic())?;
    let key = project.write_file("keys/mod.biprivatekey", "key")?;
    let target = project.join("out/main.pbo");

    project
        .build_cmd(&source, &target)
        .arg("-k")
        .arg(&key)
        .assert()
        .failure()
        .stderr(predicate::str::contains("signer"));
    FileAssert::not_exists(&target);
    Ok(())
}

#[test]
fn test_invalid_key_extension_rejected() -> Result<()> {
    let project = TestProject::new()?;
    let source = project.add_addon(&AddonFixture::basic())?;
    let key = project.write_file("keys/mod.bikey", "public")?;

    project
        .build_cmd(&source, &project.join("out/main.pbo"))
        .arg("-k")
        .arg(&key)
        .assert()
        .failure()
        .stderr(predicate::str::contains("mod.bikey"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_configured_signer_writes_signature() -> Result<()> {
    let project = TestProject::new()?;
    project.write_config(
        r#"
[tools.signer]
program = "cp"
args = ["{archive}", "{signature}"]
"#,
    )?;
    let source = project.add_addon(&AddonFixture::basic())?;
    let key = project.write_file("keys/mod.biprivatekey", "key")?;
    let target = project.join("out/main.pbo");

    project
        .build_cmd(&source, &target)
        .arg("-k")
        .arg(&key)
        .assert()
        .success()
        .stdout(predicate::str::contains("signed"));

    let signature = project.join("out/main.pbo.mod.bisign");
    assert_eq!(fs::read(&signature)?, fs::read(&target)?);
    Ok(())
}
