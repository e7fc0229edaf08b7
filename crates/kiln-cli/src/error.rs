//! CLI error type and its conversion to miette reports.

use miette::Report;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] kiln_config::ConfigError),

    /// Run-aborting build errors (workspace resolution, discovery).
    #[error(transparent)]
    Build(#[from] kiln_bundler::Error),

    /// The run completed but some units, files or targets failed.
    #[error("build finished with {failures} failure(s)")]
    BuildFailed { failures: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;

pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(e) => Report::new(e),
        CliError::Config(e) => config_error_to_miette(e),
        CliError::BuildFailed { failures } => miette::miette!(
            help = "each failure is listed above with its unit, file or target",
            "build finished with {failures} failure(s)"
        ),
        CliError::Io(e) => miette::miette!("I/O error: {e}"),
    }
}

fn config_error_to_miette(err: kiln_config::ConfigError) -> Report {
    use kiln_config::ConfigError;

    let help = match &err {
        ConfigError::NotFound(_) => "create kiln.toml or add a \"kiln\" field to package.json",
        ConfigError::NoTargets => "declare at least one [targets.<id>] table",
        ConfigError::DuplicateOutputDir { .. } => "give every target its own output_dir",
        ConfigError::InvalidValue { .. } | ConfigError::Io(_) => {
            return miette::miette!("Configuration error: {err}");
        }
    };
    miette::miette!(help = help, "Configuration error: {err}")
}
