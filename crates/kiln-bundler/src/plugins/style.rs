use std::borrow::Cow;
use std::path::Path;

use anyhow::Context;
use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use rolldown_common::ModuleType;
use rolldown_plugin::{HookLoadArgs, HookLoadOutput, HookLoadReturn, HookUsage, Plugin, PluginContext};

use super::{KilnPlugin, PluginPhase};

/// Collapses imported stylesheets into the script graph: each `.css` file is
/// loaded as a module whose default export is the minified stylesheet text.
#[derive(Debug, Clone, Default)]
pub struct StylePlugin;

impl StylePlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Plugin for StylePlugin {
    fn name(&self) -> Cow<'static, str> {
        "kiln:style".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::Load
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let id = args.id.to_string();

        async move {
            if !id.ends_with(".css") {
                return Ok(None);
            }

            let source = tokio::fs::read_to_string(&id)
                .await
                .with_context(|| format!("failed to read {id}"))?;
            let css = process_css(Path::new(&id), &source)?;

            Ok(Some(HookLoadOutput {
                code: css_module(&css).into(),
                module_type: Some(ModuleType::Js),
                ..Default::default()
            }))
        }
    }
}

impl KilnPlugin for StylePlugin {
    fn phase(&self) -> PluginPhase {
        PluginPhase::Load
    }
}

pub(crate) fn process_css(path: &Path, source: &str) -> anyhow::Result<String> {
    let mut sheet = StyleSheet::parse(
        source,
        ParserOptions {
            filename: path.to_string_lossy().into_owned(),
            ..Default::default()
        },
    )
    .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?;

    sheet
        .minify(MinifyOptions::default())
        .map_err(|e| anyhow::anyhow!("failed to minify {}: {e}", path.display()))?;

    let printed = sheet
        .to_css(PrinterOptions {
            minify: true,
            ..Default::default()
        })
        .map_err(|e| anyhow::anyhow!("failed to print {}: {e}", path.display()))?;
    Ok(printed.code)
}

fn css_module(css: &str) -> String {
    // serde_json string escaping is valid JavaScript string syntax.
    let literal = serde_json::to_string(css).unwrap_or_else(|_| "\"\"".to_string());
    format!("export default {literal};\n")
}
