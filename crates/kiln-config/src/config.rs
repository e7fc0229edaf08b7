use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use path_clean::PathClean;
use serde::{Deserialize, Serialize};

use crate::target::{OutputTarget, TargetConfig};

/// Complete, immutable build configuration for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct KilnConfig {
    pub paths: PathsConfig,
    pub workspace: WorkspaceConfig,
    pub externals: ExternalsConfig,

    /// Format matrix, keyed by target id. Insertion order is preserved so
    /// reports list targets in the order they were declared.
    pub targets: IndexMap<String, TargetConfig>,
}

/// Project layout. Relative paths are resolved against `root`, which is itself
/// resolved against the directory holding the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub root: PathBuf,
    /// Directory whose immediate subdirectories are component units.
    pub components: PathBuf,
    /// Directory holding the top-level declaration sources.
    pub entries: PathBuf,
    /// Build output root; declarations are staged under `<output>/types`.
    pub output: PathBuf,
    /// Library `package.json` whose dependencies are kept external.
    pub package_json: PathBuf,
    pub source_extension: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            components: PathBuf::from("packages/components"),
            entries: PathBuf::from("packages/kiln"),
            output: PathBuf::from("dist"),
            package_json: PathBuf::from("packages/kiln/package.json"),
            source_extension: "ts".to_string(),
        }
    }
}

impl PathsConfig {
    /// `<output>/types/components`
    pub fn types_staging_dir(&self) -> PathBuf {
        self.output.join("types").join("components")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Namespace prefix shared by every internally published package.
    pub namespace: String,

    /// Marker referencing the library root inside declaration sources.
    /// Rewritten to `.` in emitted declarations.
    pub alias_token: String,

    /// Explicit package list. When empty the workspace manifest is read.
    pub packages: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            namespace: "@kiln".to_string(),
            alias_token: "@kiln".to_string(),
            packages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExternalsConfig {
    /// External in every mode.
    pub peer: Vec<String>,
    /// External for per-component bundles.
    pub extra: Vec<String>,
    /// Treat the library's `dependencies` and `peerDependencies` as external.
    pub include_dependencies: bool,
}

impl Default for ExternalsConfig {
    fn default() -> Self {
        Self {
            peer: vec!["vue".to_string()],
            extra: vec!["@vue".to_string()],
            include_dependencies: true,
        }
    }
}

impl KilnConfig {
    /// Anchor every relative path at `base` and normalize.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let root = base.join(&self.paths.root).clean();
        let anchor = |p: &Path| root.join(p).clean();

        self.paths.components = anchor(&self.paths.components);
        self.paths.entries = anchor(&self.paths.entries);
        self.paths.output = anchor(&self.paths.output);
        self.paths.package_json = anchor(&self.paths.package_json);
        for target in self.targets.values_mut() {
            target.output_dir = anchor(&target.output_dir);
        }
        self.paths.root = root;
        self
    }

    /// The declarative list of output targets, in declaration order.
    pub fn target_matrix(&self) -> Vec<OutputTarget> {
        self.targets
            .iter()
            .map(|(id, target)| OutputTarget::new(id.clone(), target))
            .collect()
    }
}
