//! Single Rolldown invocation per component unit.
//!
//! A unit is bundled once into an ESM-shaped [`BundleGraph`]; every target
//! format is rendered from that graph afterwards.

use std::path::{Path, PathBuf};

use rolldown::{BundlerBuilder as RolldownBundlerBuilder, BundlerOptions, InputItem, OutputFormat, Platform, ResolveOptions};
use rolldown_common::Output;
use tracing::{debug, warn};

use crate::diagnostics::{DiagnosticKind, ExtractedDiagnostic};
use crate::external::ExternalPredicate;
use crate::graph::BundleGraph;
use crate::plugins::{ExternalPlugin, PluginRegistry, StylePlugin, VuePlugin};
use crate::{Error, Result};

/// Lifecycle of a unit inside a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Pending,
    Building,
    Ready,
    Failed,
}

#[derive(Debug, Clone)]
pub struct BundleBuilder {
    predicate: ExternalPredicate,
    cwd: PathBuf,
}

impl BundleBuilder {
    pub fn new(predicate: ExternalPredicate, cwd: impl Into<PathBuf>) -> Self {
        Self {
            predicate,
            cwd: cwd.into(),
        }
    }

    /// Bundle `entry` and analyze the resulting chunk.
    pub async fn build(&self, unit: &str, entry: &Path) -> Result<BundleGraph> {
        debug!(unit, state = ?UnitState::Building, entry = %entry.display(), "bundling");

        let result = self.generate(unit, entry).await;
        match &result {
            Ok(graph) => debug!(
                unit,
                state = ?UnitState::Ready,
                bytes = graph.code.len(),
                "bundle ready"
            ),
            Err(e) => debug!(unit, state = ?UnitState::Failed, "{e}"),
        }
        result
    }

    async fn generate(&self, unit: &str, entry: &Path) -> Result<BundleGraph> {
        let mut registry = PluginRegistry::new();
        registry
            .add(ExternalPlugin::new(self.predicate.clone()))
            .add(VuePlugin::new())
            .add(StylePlugin::new());

        let mut bundler = RolldownBundlerBuilder::default()
            .with_options(self.options(unit, entry))
            .with_plugins(registry.into_rolldown_plugins())
            .build()
            .map_err(|e| Error::from_rolldown_batch(unit, &e))?;

        let output = bundler
            .generate()
            .await
            .map_err(|e| Error::from_rolldown_batch(unit, &e))?;

        for warning in &output.warnings {
            warn!(unit, "{warning:?}");
        }

        let mut chunks = output.assets.iter().filter_map(|asset| match asset {
            Output::Chunk(chunk) => Some(chunk),
            Output::Asset(_) => None,
        });

        let (Some(chunk), None) = (chunks.next(), chunks.next()) else {
            return Err(Error::Bundle {
                unit: unit.to_string(),
                diagnostics: vec![
                    ExtractedDiagnostic::error(
                        DiagnosticKind::CodeSplitting,
                        "expected exactly one chunk per unit",
                    )
                    .with_file(entry.display().to_string())
                    .with_help("replace dynamic imports of local modules with static imports"),
                ],
            });
        };

        BundleGraph::analyze(unit, chunk.code.clone())
    }

    fn options(&self, unit: &str, entry: &Path) -> BundlerOptions {
        BundlerOptions {
            input: Some(vec![InputItem {
                name: Some(unit.to_string()),
                import: entry.to_string_lossy().into_owned(),
            }]),
            cwd: Some(self.cwd.clone()),
            format: Some(OutputFormat::Esm),
            platform: Some(Platform::Browser),
            resolve: Some(configure_resolution(&self.cwd)),
            ..Default::default()
        }
    }
}

fn configure_resolution(cwd: &Path) -> ResolveOptions {
    let modules = cwd
        .ancestors()
        .map(|dir| dir.join("node_modules").to_string_lossy().into_owned())
        .collect();

    ResolveOptions {
        main_fields: Some(vec![
            "browser".to_string(),
            "module".to_string(),
            "main".to_string(),
        ]),
        condition_names: Some(vec![
            "import".to_string(),
            "module".to_string(),
            "browser".to_string(),
            "default".to_string(),
        ]),
        extensions: Some(vec![
            ".ts".to_string(),
            ".tsx".to_string(),
            ".mjs".to_string(),
            ".js".to_string(),
            ".jsx".to_string(),
            ".vue".to_string(),
            ".json".to_string(),
            ".css".to_string(),
        ]),
        modules: Some(modules),
        symlinks: Some(true),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{ExternalMode, ExternalRules};
    use crate::workspace::InternalPackages;
    use tempfile::TempDir;

    fn builder(root: &Path) -> BundleBuilder {
        let rules = ExternalRules {
            peer: vec!["vue".into()],
            ..Default::default()
        };
        let predicate = ExternalPredicate::new(
            ExternalMode::Component,
            &InternalPackages::new(vec!["@kiln/utils".to_string()], "@kiln"),
            &rules,
        );
        BundleBuilder::new(predicate, root)
    }

    #[test]
    fn resolution_searches_every_ancestor() {
        let resolve = configure_resolution(Path::new("/repo/packages/ui"));
        let modules = resolve.modules.unwrap();
        assert_eq!(modules.first().unwrap(), "/repo/packages/ui/node_modules");
        assert_eq!(modules.last().unwrap(), "/node_modules");
        assert!(resolve.extensions.unwrap().contains(&".vue".to_string()));
    }

    #[tokio::test]
    async fn bundles_local_modules_and_keeps_externals() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("helper.ts"),
            "export const twice = (n: number): number => n * 2;\n",
        )
        .unwrap();
        std::fs::write(
            tmp.path().join("index.ts"),
            "import { ref } from 'vue';\nimport { clamp } from '@kiln/utils';\nimport { twice } from './helper';\nexport const value = ref(clamp(twice(2)));\n",
        )
        .unwrap();

        let graph = builder(tmp.path())
            .build("counter", &tmp.path().join("index.ts"))
            .await
            .unwrap();

        assert_eq!(graph.unit, "counter");
        assert!(graph.code.contains("from \"vue\"") || graph.code.contains("from 'vue'"));
        assert!(graph.code.contains("@kiln/utils"));
        assert!(!graph.code.contains("./helper"));
        assert_eq!(graph.syntax.export_names(), vec!["value"]);
    }

    #[tokio::test]
    async fn compiles_single_file_components_and_collapses_styles() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("Button.vue"),
            "<template><button>{{ label }}</button></template>\n<script setup lang=\"ts\">\nexport const label: string = 'press me';\n</script>\n",
        )
        .unwrap();
        std::fs::write(tmp.path().join("style.css"), ".btn {\n  color: red;\n}\n").unwrap();
        std::fs::write(
            tmp.path().join("index.ts"),
            "import { label } from './Button.vue';\nimport styles from './style.css';\nexport const view = { label, styles };\n",
        )
        .unwrap();

        let graph = builder(tmp.path())
            .build("button", &tmp.path().join("index.ts"))
            .await
            .unwrap();

        assert!(graph.code.contains("press me"), "{}", graph.code);
        assert!(graph.code.contains(".btn{color:red}"), "{}", graph.code);
        assert!(!graph.code.contains(": string"));
        assert!(
            !graph
                .code
                .lines()
                .any(|line| line.starts_with("import") && (line.contains(".vue") || line.contains(".css"))),
            "{}",
            graph.code
        );
        assert_eq!(graph.syntax.export_names(), vec!["view"]);
    }

    #[tokio::test]
    async fn syntax_errors_become_bundle_errors() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("index.ts"), "export const = ;\n").unwrap();

        let err = builder(tmp.path())
            .build("broken", &tmp.path().join("index.ts"))
            .await
            .unwrap_err();

        match err {
            Error::Bundle { unit, diagnostics } => {
                assert_eq!(unit, "broken");
                assert!(!diagnostics.is_empty());
            }
            other => panic!("expected bundle error, got {other:?}"),
        }
    }
}
