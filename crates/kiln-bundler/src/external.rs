//! Import classification: which specifiers stay out of a bundle.
//!
//! The predicate is computed once per run and cloned into every bundling
//! call so that every unit sees identical decisions.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use kiln_config::ExternalsConfig;
use tracing::{debug, warn};

use crate::Result;
use crate::workspace::{InternalPackages, PackageJson, is_under};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExternalMode {
    /// Everything except the entry module stays external. Used for the
    /// aggregate entry bundle.
    Full,
    /// Only workspace, peer and dependency packages stay external; all else
    /// is inlined. Used for per-component bundles.
    Component,
}

/// Static externalization inputs from configuration and the library manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalRules {
    pub peer: Vec<String>,
    pub extra: Vec<String>,
    pub dependencies: Vec<String>,
}

impl ExternalRules {
    /// Read dependency names from `package_json` when the config asks for it.
    /// A missing manifest contributes no dependencies; an unreadable one is an
    /// error.
    pub fn from_config(config: &ExternalsConfig, package_json: &Path) -> Result<Self> {
        let dependencies = if !config.include_dependencies {
            Vec::new()
        } else if package_json.is_file() {
            PackageJson::read(package_json)?
                .dependency_names()
                .map(str::to_string)
                .collect()
        } else {
            warn!(path = %package_json.display(), "library package.json not found, no dependencies externalized");
            Vec::new()
        };

        Ok(Self {
            peer: config.peer.clone(),
            extra: config.extra.clone(),
            dependencies,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ExternalPredicate {
    inner: Arc<PredicateInner>,
}

#[derive(Debug)]
struct PredicateInner {
    mode: ExternalMode,
    packages: BTreeSet<String>,
}

impl ExternalPredicate {
    pub fn new(mode: ExternalMode, internal: &InternalPackages, rules: &ExternalRules) -> Self {
        let packages: BTreeSet<String> = internal
            .names()
            .map(str::to_string)
            .chain(rules.peer.iter().cloned())
            .chain(rules.extra.iter().cloned())
            .chain(rules.dependencies.iter().cloned())
            .filter(|p| !p.is_empty())
            .collect();
        debug!(?mode, count = packages.len(), "external predicate ready");

        Self {
            inner: Arc::new(PredicateInner { mode, packages }),
        }
    }

    /// `true` when `specifier` must not be inlined.
    pub fn is_external(&self, specifier: &str) -> bool {
        match self.inner.mode {
            ExternalMode::Full => true,
            ExternalMode::Component => self
                .inner
                .packages
                .iter()
                .any(|pkg| is_under(specifier, pkg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn internal() -> InternalPackages {
        InternalPackages::new(
            ["@kiln/utils", "@kiln/hooks"].map(String::from),
            "@kiln",
        )
    }

    fn rules() -> ExternalRules {
        ExternalRules {
            peer: vec!["vue".into()],
            extra: vec!["@vue".into()],
            dependencies: vec!["lodash-es".into()],
        }
    }

    #[test]
    fn component_mode_externalizes_known_packages_only() {
        let predicate = ExternalPredicate::new(ExternalMode::Component, &internal(), &rules());

        assert!(predicate.is_external("vue"));
        assert!(predicate.is_external("@vue/shared"));
        assert!(predicate.is_external("@kiln/utils"));
        assert!(predicate.is_external("@kiln/hooks/use-id"));
        assert!(predicate.is_external("lodash-es/debounce"));

        assert!(!predicate.is_external("vue-router"));
        assert!(!predicate.is_external("./style.css"));
        assert!(!predicate.is_external("@kiln/unknown"));
    }

    #[test]
    fn full_mode_externalizes_everything() {
        let predicate = ExternalPredicate::new(ExternalMode::Full, &internal(), &rules());
        assert!(predicate.is_external("./button"));
        assert!(predicate.is_external("dayjs"));
    }

    #[test]
    fn clones_share_decisions() {
        let predicate = ExternalPredicate::new(ExternalMode::Component, &internal(), &rules());
        let clone = predicate.clone();
        for spec in ["vue", "dayjs", "@kiln/utils", "./x"] {
            assert_eq!(predicate.is_external(spec), clone.is_external(spec));
        }
    }

    #[test]
    fn rules_read_manifest_dependencies() {
        let tmp = TempDir::new().unwrap();
        let manifest = tmp.path().join("package.json");
        fs::write(
            &manifest,
            r#"{ "name": "kiln", "dependencies": { "dayjs": "^1" }, "peerDependencies": { "vue": "^3" } }"#,
        )
        .unwrap();

        let rules = ExternalRules::from_config(&ExternalsConfig::default(), &manifest).unwrap();
        assert_eq!(rules.dependencies, vec!["dayjs", "vue"]);

        let without = ExternalsConfig {
            include_dependencies: false,
            ..ExternalsConfig::default()
        };
        let rules = ExternalRules::from_config(&without, &manifest).unwrap();
        assert!(rules.dependencies.is_empty());
    }
}
