//! Static configuration for kiln builds.
//!
//! A [`KilnConfig`] is loaded once per run and never mutated afterwards. Its
//! `targets` table is the format matrix every later stage iterates.

pub mod config;
pub mod discovery;
pub mod error;
pub mod target;
pub mod validation;

pub use config::{ExternalsConfig, KilnConfig, PathsConfig, WorkspaceConfig};
pub use discovery::{ConfigDiscovery, ConfigSource};
pub use error::{ConfigError, Result};
pub use target::{ExportConvention, ModuleFormat, OutputTarget, TargetConfig};
pub use validation::validate;
