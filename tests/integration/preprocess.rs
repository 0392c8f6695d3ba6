//! `addonpack preprocess` end to end.

use crate::common::{FileAssert, TestProject};
use addonpack::test_utils::AddonFixture;
use anyhow::Result;
use predicates::prelude::*;

#[test]
fn test_preprocess_to_stdout() -> Result<()> {
    let project = TestProject::new()?;
    let source = project.add_addon(&AddonFixture::basic())?;

    project
        .cmd()
        .arg("preprocess")
        .arg(source.join("config.cpp"))
        .assert()
        .success()
        .stdout("class CfgPatches { class main { version = 3; }; };\n");
    Ok(())
}

#[test]
fn test_preprocess_to_file() -> Result<()> {
    let project = TestProject::new()?;
    let addon = AddonFixture::new("main", Some("x\\mod\\addons\\main")).with_file(
        "config.cpp",
        "#define DEBUG\n\
         #ifdef DEBUG\n\
         level = 2;\n\
         #else\n\
         level = 0;\n\
         #endif\n\
         #define DOUBLE(x) x##x\n\
         name = DOUBLE(ab);\n",
    );
    let source = project.add_addon(&addon)?;
    let target = project.join("out/nested/config.i");

    project
        .cmd()
        .arg("preprocess")
        .arg(source.join("config.cpp"))
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    FileAssert::equals(&target, "level = 2;\nname = abab;\n");
    Ok(())
}

#[test]
fn test_include_cycle_is_reported() -> Result<()> {
    let project = TestProject::new()?;
    let addon = AddonFixture::new("main", None)
        .with_file("a.hpp", "#include \"b.hpp\"\n")
        .with_file("b.hpp", "#include \"a.hpp\"\n");
    let source = project.add_addon(&addon)?;

    project
        .cmd()
        .arg("preprocess")
        .arg(source.join("a.hpp"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("a.hpp"))
        .stderr(predicate::str::contains("suggestion"));
    Ok(())
}

#[test]
fn test_missing_source_fails() -> Result<()> {
    let project = TestProject::new()?;

    project
        .cmd()
        .args(["preprocess", "does/not/exist.cpp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exist.cpp"));
    Ok(())
}
