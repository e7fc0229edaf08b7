//! Plugin ordering.
//!
//! Rolldown runs hooks in registration order, so plugins are tagged with a
//! phase and sorted once before the bundler is built.

use std::borrow::Cow;
use std::sync::Arc;

use rolldown_plugin::Plugin;
use rolldown_plugin::__inner::SharedPluginable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PluginPhase {
    /// Decides what is bundled at all.
    Resolve = 10,
    /// Turns non-script sources into script modules.
    Load = 20,
}

pub trait KilnPlugin: Plugin {
    fn phase(&self) -> PluginPhase;
}

#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Registered>,
}

struct Registered {
    phase: PluginPhase,
    name: Cow<'static, str>,
    plugin: SharedPluginable,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<P: KilnPlugin + 'static>(&mut self, plugin: P) -> &mut Self {
        self.plugins.push(Registered {
            phase: plugin.phase(),
            name: plugin.name(),
            plugin: Arc::new(plugin),
        });
        // Stable sort keeps insertion order within a phase.
        self.plugins.sort_by_key(|r| r.phase);
        self
    }

    /// Plugin names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|r| r.name.as_ref()).collect()
    }

    pub fn into_rolldown_plugins(self) -> Vec<SharedPluginable> {
        self.plugins.into_iter().map(|r| r.plugin).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
