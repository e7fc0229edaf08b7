use std::fs;
use std::path::PathBuf;

use kiln_config::{ConfigDiscovery, ConfigError, ConfigSource, ExportConvention, ModuleFormat};
use tempfile::TempDir;

const KILN_TOML: &str = r#"
[paths]
components = "packages/components"
output = "dist"

[workspace]
namespace = "@acme"
alias_token = "@acme"

[targets.esm]
format = "esm"
output_dir = "dist/acme/es"
bundle_path = "acme/es"
extension = "mjs"

[targets.cjs]
format = "cjs"
output_dir = "dist/acme/lib"
bundle_path = "acme/lib"
export_convention = "named"
"#;

#[test]
fn loads_toml_and_anchors_paths() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("kiln.toml"), KILN_TOML).unwrap();

    let config = ConfigDiscovery::new(dir.path()).load().unwrap();

    assert_eq!(config.workspace.namespace, "@acme");
    assert_eq!(config.paths.output, dir.path().join("dist"));

    let matrix = config.target_matrix();
    assert_eq!(matrix.len(), 2);
    assert_eq!(matrix[0].id, "esm");
    assert_eq!(matrix[0].format, ModuleFormat::Esm);
    assert_eq!(matrix[0].extension, "mjs");
    assert_eq!(matrix[0].output_dir, dir.path().join("dist/acme/es"));
    assert_eq!(matrix[1].export_convention, ExportConvention::Named);
    assert_eq!(matrix[1].extension, "js");
}

#[test]
fn falls_back_to_package_json_field() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{
  "name": "acme-root",
  "kiln": {
    "targets": {
      "esm": { "format": "esm", "output_dir": "out/es" }
    }
  }
}"#,
    )
    .unwrap();

    let discovery = ConfigDiscovery::new(dir.path());
    assert!(matches!(discovery.find(), Some(ConfigSource::PackageJson(_))));

    let config = discovery.load().unwrap();
    assert_eq!(config.targets.len(), 1);
    assert_eq!(config.targets["esm"].output_dir, dir.path().join("out/es"));
    // Untouched sections keep their defaults.
    assert_eq!(config.externals.peer, vec!["vue".to_string()]);
}

#[test]
fn toml_wins_over_package_json() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("kiln.toml"), KILN_TOML).unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{ "kiln": { "targets": {} } }"#,
    )
    .unwrap();

    let found = ConfigDiscovery::new(dir.path()).find().unwrap();
    assert_eq!(found, ConfigSource::Toml(dir.path().join("kiln.toml")));
}

#[test]
fn missing_config_is_not_found() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("package.json"), r#"{ "name": "x" }"#).unwrap();

    let err = ConfigDiscovery::new(dir.path()).load().unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(path) if path == dir.path()));
}

#[test]
fn config_without_targets_is_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("kiln.toml"), "[paths]\noutput = \"out\"\n").unwrap();

    let err = ConfigDiscovery::new(dir.path()).load().unwrap_err();
    assert!(matches!(err, ConfigError::NoTargets));
}

#[test]
fn unknown_format_reports_field() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("kiln.toml"),
        "[targets.umd]\nformat = \"umd\"\noutput_dir = \"out\"\n",
    )
    .unwrap();

    let err = ConfigDiscovery::new(dir.path()).load().unwrap_err();
    match err {
        ConfigError::InvalidValue { field, .. } => assert!(field.starts_with("targets")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn environment_overrides_file() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("kiln.toml", KILN_TOML)?;
        jail.set_env("KILN_PATHS__OUTPUT", "build");
        jail.set_env("KILN_WORKSPACE__NAMESPACE", "@env");

        let config = ConfigDiscovery::new(jail.directory())
            .load()
            .map_err(|e| e.to_string())?;

        assert_eq!(config.paths.output, jail.directory().join("build"));
        assert_eq!(config.workspace.namespace, "@env");
        Ok(())
    });
}

#[test]
fn explicit_file_skips_discovery() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("config");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("release.toml"), KILN_TOML).unwrap();

    let config = ConfigDiscovery::new(dir.path())
        .with_file(nested.join("release.toml"))
        .load()
        .unwrap();

    // Relative paths anchor at the file's own directory.
    assert_eq!(config.paths.output, PathBuf::from(&nested).join("dist"));
}
