//! Rolldown plugins shared by every unit build.

mod external;
mod registry;
mod style;
mod vue;

pub use external::ExternalPlugin;
pub use registry::{KilnPlugin, PluginPhase, PluginRegistry};
pub use style::StylePlugin;
pub use vue::VuePlugin;
