//! Fixture projects shared by the pipeline tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiln_bundler::{Phase, Pipeline};
use kiln_config::{ConfigDiscovery, KilnConfig};
use tempfile::TempDir;

pub const KILN_TOML: &str = r#"
[paths]
components = "packages/components"
entries = "packages/kiln"
output = "out/build"
package_json = "packages/kiln/package.json"

[workspace]
namespace = "@kiln"
alias_token = "@kiln"
packages = ["@kiln/utils", "@kiln/components", "@kiln/theme"]

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

pub struct Project {
    pub dir: TempDir,
}

impl Project {
    /// Components `A` (with entry) and `B` (without), an aggregate entry and
    /// one declaration source.
    pub fn new() -> Self {
        let project = Self {
            dir: TempDir::new().expect("temp dir"),
        };
        project.write("kiln.toml", KILN_TOML);
        project.write(
            "packages/components/A/index.ts",
            r#"import { ref } from 'vue';
import { clamp } from '@kiln/utils';
import { label } from './label';

export const A = (n: number) => ref(clamp(n) + label);
export default A;
"#,
        );
        project.write("packages/components/A/label.ts", "export const label = 'a';\n");
        project.write("packages/components/B/README.md", "no entry here\n");
        project.write(
            "packages/components/index.ts",
            "export * from './A';\nexport { default as A } from './A';\n",
        );
        project.write(
            "packages/kiln/index.ts",
            "export * from '@kiln/components';\nexport const version: string = '1.0.0';\n",
        );
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.path(relative);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        std::fs::write(path, contents).expect("write fixture");
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative))
            .unwrap_or_else(|e| panic!("cannot read {relative}: {e}"))
    }

    pub fn config(&self) -> Arc<KilnConfig> {
        Arc::new(ConfigDiscovery::new(self.root()).load().expect("config loads"))
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.config())
    }

    pub async fn run(&self, phase: Phase) -> kiln_bundler::BuildReport {
        self.pipeline().run(phase).await.expect("run completes")
    }
}
