//! Internal package names of the surrounding workspace.
//!
//! The name set is computed once at the start of a run and passed by value
//! into external classification and path rewriting.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Format, Yaml};
use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

/// Supplies the names of packages published from this workspace.
pub trait WorkspaceResolver: Send + Sync {
    fn list_internal_package_names(&self) -> Result<BTreeSet<String>>;
}

/// A fixed list of names.
#[derive(Debug, Clone, Default)]
pub struct StaticWorkspace {
    names: BTreeSet<String>,
}

impl StaticWorkspace {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl WorkspaceResolver for StaticWorkspace {
    fn list_internal_package_names(&self) -> Result<BTreeSet<String>> {
        Ok(self.names.clone())
    }
}

/// Reads `pnpm-workspace.yaml` (or the root `package.json` `workspaces`
/// array) and collects the `name` of every matched package.
#[derive(Debug, Clone)]
pub struct PnpmWorkspace {
    root: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct PnpmManifest {
    #[serde(default)]
    packages: Vec<String>,
}

/// The subset of `package.json` the build reads.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
    pub name: Option<String>,
    #[serde(default)]
    pub dependencies: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub peer_dependencies: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub workspaces: Option<Workspaces>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Workspaces {
    List(Vec<String>),
    Object {
        #[serde(default)]
        packages: Vec<String>,
    },
}

impl PackageJson {
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::ExternalResolution(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            Error::ExternalResolution(format!("invalid JSON in {}: {e}", path.display()))
        })
    }

    /// Names under `dependencies` followed by `peerDependencies`.
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .keys()
            .chain(self.peer_dependencies.keys())
            .map(String::as_str)
    }
}

impl PnpmWorkspace {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn patterns(&self) -> Result<Vec<String>> {
        let manifest = self.root.join("pnpm-workspace.yaml");
        if manifest.is_file() {
            let parsed: PnpmManifest = Figment::from(Yaml::file(&manifest))
                .extract()
                .map_err(|e| {
                    Error::ExternalResolution(format!("invalid {}: {e}", manifest.display()))
                })?;
            return Ok(parsed.packages);
        }

        let root_pkg = self.root.join("package.json");
        if root_pkg.is_file() {
            return Ok(match PackageJson::read(&root_pkg)?.workspaces {
                Some(Workspaces::List(list)) => list,
                Some(Workspaces::Object { packages }) => packages,
                None => Vec::new(),
            });
        }

        Err(Error::ExternalResolution(format!(
            "no pnpm-workspace.yaml or package.json in {}",
            self.root.display()
        )))
    }

    fn expand(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let full = self.root.join(pattern.trim_end_matches('/'));
        let full = full.to_string_lossy();
        let paths = glob::glob(&full).map_err(|e| {
            Error::ExternalResolution(format!("invalid workspace pattern '{pattern}': {e}"))
        })?;

        Ok(paths
            .filter_map(std::result::Result::ok)
            .filter(|p| p.is_dir())
            .filter(|p| !p.components().any(|c| c.as_os_str() == "node_modules"))
            .collect())
    }
}

impl WorkspaceResolver for PnpmWorkspace {
    fn list_internal_package_names(&self) -> Result<BTreeSet<String>> {
        let mut included = BTreeSet::new();
        let mut excluded = BTreeSet::new();

        for pattern in self.patterns()? {
            match pattern.strip_prefix('!') {
                Some(negated) => excluded.extend(self.expand(negated)?),
                None => included.extend(self.expand(&pattern)?),
            }
        }
        // The workspace root is always a member.
        included.insert(self.root.clone());

        let mut names = BTreeSet::new();
        for dir in included.difference(&excluded) {
            let manifest = dir.join("package.json");
            if !manifest.is_file() {
                continue;
            }
            if let Some(name) = PackageJson::read(&manifest)?.name {
                names.insert(name);
            }
        }

        debug!(count = names.len(), root = %self.root.display(), "resolved workspace packages");
        Ok(names)
    }
}

/// Workspace packages under the internal namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalPackages {
    namespace: String,
    names: BTreeSet<String>,
}

impl InternalPackages {
    /// Keep only `names` that equal `namespace` or live under `namespace/`.
    pub fn new(names: impl IntoIterator<Item = String>, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let names = names
            .into_iter()
            .filter(|name| is_under(name, &namespace))
            .collect();
        Self { namespace, names }
    }

    pub fn resolve(resolver: &dyn WorkspaceResolver, namespace: &str) -> Result<Self> {
        Ok(Self::new(resolver.list_internal_package_names()?, namespace))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The package `specifier` refers to, if any. Longest name wins so that
    /// `@ns/a-b` is not mistaken for `@ns/a`.
    pub fn package_of(&self, specifier: &str) -> Option<&str> {
        self.names
            .iter()
            .filter(|name| is_under(specifier, name))
            .max_by_key(|name| name.len())
            .map(String::as_str)
    }
}

/// `spec == prefix` or `spec` starts with `prefix/`.
pub(crate) fn is_under(spec: &str, prefix: &str) -> bool {
    spec.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_pkg(dir: &Path, name: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join("package.json"),
            format!(r#"{{ "name": "{name}", "version": "0.0.0" }}"#),
        )
        .unwrap();
    }

    #[test]
    fn pnpm_manifest_globs_and_negations() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(
            root.join("pnpm-workspace.yaml"),
            "packages:\n  - packages/*\n  - '!packages/playground'\n",
        )
        .unwrap();
        write_pkg(root, "kiln-monorepo");
        write_pkg(&root.join("packages/utils"), "@kiln/utils");
        write_pkg(&root.join("packages/components"), "@kiln/components");
        write_pkg(&root.join("packages/playground"), "@kiln/playground");
        fs::create_dir_all(root.join("packages/no-manifest")).unwrap();

        let names = PnpmWorkspace::new(root).list_internal_package_names().unwrap();
        let names: Vec<_> = names.into_iter().collect();
        assert_eq!(
            names,
            vec!["@kiln/components", "@kiln/utils", "kiln-monorepo"]
        );
    }

    #[test]
    fn package_json_workspaces_fallback() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        fs::write(
            root.join("package.json"),
            r#"{ "name": "root", "workspaces": ["libs/*"] }"#,
        )
        .unwrap();
        write_pkg(&root.join("libs/theme"), "@kiln/theme");

        let names = PnpmWorkspace::new(root).list_internal_package_names().unwrap();
        assert!(names.contains("@kiln/theme"));
        assert!(names.contains("root"));
    }

    #[test]
    fn missing_manifest_is_resolution_error() {
        let tmp = TempDir::new().unwrap();
        let err = PnpmWorkspace::new(tmp.path())
            .list_internal_package_names()
            .unwrap_err();
        assert!(matches!(err, Error::ExternalResolution(_)));
    }

    #[test]
    fn internal_packages_filter_namespace() {
        let packages = InternalPackages::new(
            ["@kiln/utils", "@kiln/utils-extra", "@other/utils", "@kilnx/a", "@kiln"]
                .map(String::from),
            "@kiln",
        );
        let names: Vec<_> = packages.names().collect();
        assert_eq!(names, vec!["@kiln", "@kiln/utils", "@kiln/utils-extra"]);

        assert_eq!(packages.package_of("@kiln/utils/dom"), Some("@kiln/utils"));
        assert_eq!(
            packages.package_of("@kiln/utils-extra"),
            Some("@kiln/utils-extra")
        );
        assert_eq!(packages.package_of("@kilnx/a"), None);
    }
}
