use std::borrow::Cow;

use anyhow::Context;
use rolldown_common::ModuleType;
use rolldown_plugin::{HookLoadArgs, HookLoadOutput, HookLoadReturn, HookUsage, Plugin, PluginContext};

use super::{KilnPlugin, PluginPhase};
use crate::sfc;

/// Loads `.vue` files as the script module formed by their `<script>` blocks.
#[derive(Debug, Clone, Default)]
pub struct VuePlugin;

impl VuePlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Plugin for VuePlugin {
    fn name(&self) -> Cow<'static, str> {
        "kiln:vue".into()
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
            if !id.ends_with(".vue") {
                return Ok(None);
            }

            let source = tokio::fs::read_to_string(&id)
                .await
                .with_context(|| format!("failed to read {id}"))?;
            let blocks =
                sfc::extract_scripts(&source).with_context(|| format!("failed to parse {id}"))?;

            let (code, lang) = if blocks.is_empty() {
                ("export default {}".to_string(), "js")
            } else {
                sfc::combine(&blocks)
            };

            Ok(Some(HookLoadOutput {
                code: code.into(),
                module_type: Some(module_type(lang)),
                ..Default::default()
            }))
        }
    }
}

impl KilnPlugin for VuePlugin {
    fn phase(&self) -> PluginPhase {
        PluginPhase::Load
    }
}

fn module_type(lang: &str) -> ModuleType {
    match lang {
        "ts" | "typescript" => ModuleType::Ts,
        "jsx" => ModuleType::Jsx,
        "tsx" => ModuleType::Tsx,
        _ => ModuleType::Js,
    }
}
