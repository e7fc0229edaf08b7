use std::borrow::Cow;

use rolldown_common::ResolvedExternal;
use rolldown_plugin::{
    HookResolveIdArgs, HookResolveIdOutput, HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};

use super::{KilnPlugin, PluginPhase};
use crate::external::ExternalPredicate;

/// Marks specifiers external according to the run's shared predicate. The
/// entry module itself is never external.
#[derive(Debug, Clone)]
pub struct ExternalPlugin {
    predicate: ExternalPredicate,
}

impl ExternalPlugin {
    pub fn new(predicate: ExternalPredicate) -> Self {
        Self { predicate }
    }
}

impl Plugin for ExternalPlugin {
    fn name(&self) -> Cow<'static, str> {
        "kiln:external".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let is_entry = args.importer.is_none();
        let external = !is_entry && self.predicate.is_external(&args.specifier);
        let specifier = args.specifier.to_string();

        async move {
            if !external {
                return Ok(None);
            }
            Ok(Some(HookResolveIdOutput {
                id: specifier.into(),
                external: Some(ResolvedExternal::Bool(true)),
                ..Default::default()
            }))
        }
    }
}

impl KilnPlugin for ExternalPlugin {
    fn phase(&self) -> PluginPhase {
        PluginPhase::Resolve
    }
}
