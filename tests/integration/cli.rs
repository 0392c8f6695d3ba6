//! Global flags, config file handling and the `binarize` command.

use crate::common::{FileAssert, TestProject};
use addonpack::pbo::Archive;
use addonpack::test_utils::AddonFixture;
use anyhow::Result;
use predicates::prelude::*;
use serial_test::serial;

#[test]
fn test_help_lists_commands() -> Result<()> {
    let project = TestProject::new()?;
    let output = project.cmd().arg("--help").output()?;
    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    for command in ["build", "preprocess", "binarize", "inspect", "unpack", "cat"] {
        assert!(help.contains(command), "missing {command} in:\n{help}");
    }
    Ok(())
}

#[test]
fn test_verbose_and_quiet_conflict() -> Result<()> {
    let project = TestProject::new()?;
    project
        .cmd()
        .args(["-v", "-q", "inspect", "x.pbo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
    Ok(())
}

#[test]
fn test_explicit_config_must_exist() -> Result<()> {
    let project = TestProject::new()?;
    project
        .cmd()
        .args(["--config", "missing.toml", "inspect", "x.pbo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.toml"));
    Ok(())
}

#[test]
fn test_config_excludes_apply_to_builds() -> Result<()> {
    let project = TestProject::new()?;
    project.write_config("exclude = [\"*.psd\", \"functions/*\"]\n")?;
    let source = project.add_addon(&AddonFixture::basic())?;
    let target = project.join("out/main.pbo");

    project.build_cmd(&source, &target).assert().success();

    let archive = Archive::read(&target)?;
    let names: Vec<&str> = archive.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["config.bin", "script_macros.hpp"]);
    Ok(())
}

#[test]
fn test_malformed_config_is_reported() -> Result<()> {
    let project = TestProject::new()?;
    project.write_config("exclude = [\n")?;
    project
        .cmd()
        .args(["inspect", "x.pbo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("addonpack.toml"));
    Ok(())
}

#[test]
fn test_binarize_single_config() -> Result<()> {
    let project = TestProject::new()?;
    let source = project.add_addon(&AddonFixture::basic())?;
    let target = project.join("out/config.bin");

    project
        .cmd()
        .arg("binarize")
        .arg(source.join("config.cpp"))
        .arg(&target)
        .assert()
        .success();
    FileAssert::equals(&target, "class CfgPatches { class main { version = 3; }; };\n");

    project
        .cmd()
        .arg("binarize")
        .arg(source.join("config.cpp"))
        .arg(&target)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    project
        .cmd()
        .arg("binarize")
        .arg(source.join("functions").join("fn_init.sqf"))
        .arg(project.join("out/fn_init.bin"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Don't know how to binarize"));
    Ok(())
}

#[test]
fn test_no_progress_flag_after_subcommand() -> Result<()> {
    let project = TestProject::new()?;
    let source = project.add_addon(&AddonFixture::basic())?;

    project
        .build_cmd(&source, &project.join("out/main.pbo"))
        .arg("--no-progress")
        .env_remove("ADDONPACK_NO_PROGRESS")
        .assert()
        .success()
        .stderr(predicate::str::contains("Binarizing").not());
    Ok(())
}

#[cfg(unix)]
#[test]
#[serial]
fn test_tool_output_env_passes_tool_output_through() -> Result<()> {
    let project = TestProject::new()?;
    project.write_config(
        r#"
[tools.config_compiler]
program = "sh"
args = ["-c", "echo compiling >&2; cp \"$0\" \"$1\"", "{source}", "{target}"]
"#,
    )?;
    let source = project.add_addon(&AddonFixture::basic())?;

    project
        .build_cmd(&source, &project.join("out/captured.pbo"))
        .assert()
        .success()
        .stderr(predicate::str::contains("compiling").not());

    project
        .build_cmd(&source, &project.join("out/shown.pbo"))
        .env("ADDONPACK_TOOL_OUTPUT", "1")
        .assert()
        .success()
        .stderr(predicate::str::contains("compiling"));
    Ok(())
}
