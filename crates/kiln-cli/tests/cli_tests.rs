//! Runs the `kiln` binary against fixture projects.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const KILN_TOML: &str = r#"
[paths]
components = "packages/components"
entries = "packages/kiln"
output = "out/build"

[workspace]
packages = ["@kiln/utils"]

[targets.esm]
format = "esm"
output_dir = "out/esm"
bundle_path = "kiln/es"

[targets.cjs]
format = "cjs"
output_dir = "out/cjs"
bundle_path = "kiln/lib"
export_convention = "named"
"#;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "kiln.toml", KILN_TOML);
    write(
        dir.path(),
        "packages/components/A/index.ts",
        "import { clamp } from '@kiln/utils';\nexport const A = (n: number) => clamp(n);\n",
    );
    write(dir.path(), "packages/components/B/notes.txt", "no entry\n");
    write(dir.path(), "packages/kiln/index.ts", "export const version: string = '1.0.0';\n");
    dir
}

fn kiln(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("kiln").unwrap();
    cmd.arg("--no-color").arg("--root").arg(root).env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_every_phase() {
    Command::cargo_bin("kiln")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("build")
                .and(predicate::str::contains("components"))
                .and(predicate::str::contains("entry"))
                .and(predicate::str::contains("types"))
                .and(predicate::str::contains("targets")),
        );
}

#[test]
fn targets_prints_the_matrix() {
    let dir = project();
    kiln(dir.path())
        .arg("targets")
        .assert()
        .success()
        .stdout(predicate::str::contains("esm").and(predicate::str::contains("cjs")))
        .stdout(predicate::str::contains("named"));
}

#[test]
fn build_writes_every_target_and_reports_sizes() {
    let dir = project();
    kiln(dir.path())
        .arg("build")
        .assert()
        .success()
        .stderr(predicate::str::contains("-> gzip"));

    assert!(dir.path().join("out/esm/components/A/index.js").is_file());
    assert!(dir.path().join("out/cjs/components/A/index.js").is_file());
    assert!(!dir.path().join("out/esm/components/B").exists());
    assert!(dir.path().join("out/esm/components/index.d.ts").is_file());
}

#[test]
fn no_size_silences_the_report() {
    let dir = project();
    kiln(dir.path())
        .args(["components", "--no-size"])
        .assert()
        .success()
        .stderr(predicate::str::contains("-> gzip").not());
}

#[test]
fn output_override_moves_declaration_staging() {
    let dir = project();
    kiln(dir.path())
        .args(["types", "--output", "elsewhere"])
        .assert()
        .success();
    assert!(dir.path().join("elsewhere/types/components/index.d.ts").is_file());
}

#[test]
fn failing_unit_exits_non_zero_but_writes_siblings() {
    let dir = project();
    write(dir.path(), "packages/components/Broken/index.ts", "export const = ;\n");

    kiln(dir.path())
        .arg("components")
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 failure"));

    assert!(dir.path().join("out/esm/components/A/index.js").is_file());
    assert!(!dir.path().join("out/esm/components/Broken").exists());
}

#[test]
fn missing_config_is_reported() {
    let dir = TempDir::new().unwrap();
    kiln(dir.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config not found"));
}
