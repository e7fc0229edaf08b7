//! Output target descriptors.
//!
//! The format matrix is a declarative list of [`OutputTarget`] records. Every
//! consumer (rendering, path rewriting, distribution) iterates the same list
//! instead of branching on target identity.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Module convention a target is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    /// ECMAScript modules (`import` / `export`).
    Esm,
    /// CommonJS (`require` / `exports`).
    Cjs,
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleFormat::Esm => write!(f, "esm"),
            ModuleFormat::Cjs => write!(f, "cjs"),
        }
    }
}

/// How a target exposes the bundle's exports.
///
/// `None` means no explicit convention: ESM output is unaffected and CommonJS
/// output picks `Default` for a default-only module and `Named` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportConvention {
    Named,
    Default,
    #[default]
    None,
}

impl fmt::Display for ExportConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportConvention::Named => write!(f, "named"),
            ExportConvention::Default => write!(f, "default"),
            ExportConvention::None => write!(f, "none"),
        }
    }
}

/// Per-target settings as they appear in `kiln.toml` under `[targets.<id>]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    pub format: ModuleFormat,

    /// Directory receiving `components/**` for this target.
    pub output_dir: PathBuf,

    /// Replacement for the internal namespace prefix in rewritten specifiers
    /// (e.g. `kiln/es` turns `@kiln/utils` into `kiln/es/utils`).
    #[serde(default)]
    pub bundle_path: String,

    #[serde(default)]
    pub export_convention: ExportConvention,

    /// File extension of emitted bundles, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_extension() -> String {
    "js".to_string()
}

/// One resolved entry of the format matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub id: String,
    pub format: ModuleFormat,
    pub output_dir: PathBuf,
    pub bundle_path: String,
    pub export_convention: ExportConvention,
    pub extension: String,
}

impl OutputTarget {
    pub fn new(id: impl Into<String>, config: &TargetConfig) -> Self {
        Self {
            id: id.into(),
            format: config.format,
            output_dir: config.output_dir.clone(),
            bundle_path: config.bundle_path.clone(),
            export_convention: config.export_convention,
            extension: config.extension.clone(),
        }
    }

    /// `<output_dir>/components`
    pub fn components_dir(&self) -> PathBuf {
        self.output_dir.join("components")
    }

    /// `<output_dir>/components/<unit>/index.<ext>`
    pub fn unit_bundle_path(&self, unit: &str) -> PathBuf {
        self.components_dir()
            .join(unit)
            .join(format!("index.{}", self.extension))
    }

    /// `<output_dir>/components/index.<ext>`
    pub fn entry_bundle_path(&self) -> PathBuf {
        self.components_dir()
            .join(format!("index.{}", self.extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn esm() -> OutputTarget {
        OutputTarget::new(
            "esm",
            &TargetConfig {
                format: ModuleFormat::Esm,
                output_dir: PathBuf::from("out/esm"),
                bundle_path: "kiln/es".into(),
                export_convention: ExportConvention::None,
                extension: "mjs".into(),
            },
        )
    }

    #[test]
    fn unit_and_entry_paths_follow_layout() {
        let target = esm();
        assert_eq!(
            target.unit_bundle_path("button"),
            PathBuf::from("out/esm/components/button/index.mjs")
        );
        assert_eq!(
            target.entry_bundle_path(),
            PathBuf::from("out/esm/components/index.mjs")
        );
    }

    #[test]
    fn convention_deserializes_lowercase() {
        let parsed: ExportConvention = serde_json::from_str("\"named\"").unwrap();
        assert_eq!(parsed, ExportConvention::Named);
        let parsed: ExportConvention = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(parsed, ExportConvention::None);
    }

    #[test]
    fn extension_defaults_to_js() {
        let parsed: TargetConfig =
            serde_json::from_str(r#"{"format":"cjs","output_dir":"lib"}"#).unwrap();
        assert_eq!(parsed.extension, "js");
        assert_eq!(parsed.export_convention, ExportConvention::None);
        assert!(parsed.bundle_path.is_empty());
    }
}
