//! Subcommand implementations.
//!
//! - [`build`] - every build phase (`build`, `components`, `entry`, `types`)
//! - [`targets`] - print the format matrix

pub mod build;
pub mod targets;

use std::sync::Arc;

use figment::providers::Serialized;
use kiln_config::{ConfigDiscovery, KilnConfig};

use crate::cli::{BuildArgs, Cli};
use crate::error::Result;

pub use build::execute as build_execute;
pub use targets::execute as targets_execute;

/// Discover and load the configuration, layering CLI overrides on top of the
/// file and environment.
pub fn load_config(cli: &Cli, args: Option<&BuildArgs>) -> Result<Arc<KilnConfig>> {
    let mut discovery = ConfigDiscovery::new(&cli.root);
    if let Some(file) = &cli.config {
        discovery = discovery.with_file(file);
    }

    let (mut figment, source) = discovery.figment()?;
    if let Some(output) = args.and_then(|a| a.output.as_ref()) {
        figment = figment.merge(Serialized::default("paths.output", output));
    }

    let config = KilnConfig::from_figment(&figment, &source.base_dir())?;
    Ok(Arc::new(config))
}
