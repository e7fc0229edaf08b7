//! # kiln-bundler
//!
//! Build core for component libraries published in several module formats.
//!
//! A run discovers component units, classifies externals once, bundles each
//! unit exactly once with Rolldown and renders that single bundle into every
//! configured output target. Type declarations are extracted per entry source
//! in parallel and distributed into each target after they have all settled.
//!
//! ```no_run
//! use std::sync::Arc;
//! use kiln_bundler::{Phase, Pipeline};
//! use kiln_config::ConfigDiscovery;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(ConfigDiscovery::new(".").load()?);
//! let report = Pipeline::new(config).run(Phase::All).await?;
//! if !report.is_success() {
//!     std::process::exit(1);
//! }
//! # Ok(()) }
//! ```

pub mod builder;
pub mod diagnostics;
pub mod discovery;
pub mod distribute;
pub mod external;
pub mod graph;
pub mod pipeline;
pub mod plugins;
pub mod render;
pub mod rewrite;
pub mod sfc;
pub mod size;
pub mod types;
pub mod workspace;
pub mod writer;

use std::path::PathBuf;

pub use builder::{BundleBuilder, UnitState};
pub use diagnostics::{DiagnosticKind, DiagnosticSeverity, ExtractedDiagnostic};
pub use discovery::{ComponentUnit, aggregate_entry, discover_components};
pub use distribute::{DistributionReport, Distributor};
pub use external::{ExternalMode, ExternalPredicate, ExternalRules};
pub use graph::{BundleGraph, ModuleItem, ModuleSyntax};
pub use pipeline::{BuildReport, DeclarationReport, Phase, Pipeline, UnitReport};
pub use rewrite::{PathRewriter, Rewrite};
pub use size::{NoopSizeReporter, SizeObservation, SizeReporter, TracingSizeReporter};
pub use types::{DeclarationUnit, TypeEmitter, collect_declaration_sources};
pub use workspace::{InternalPackages, PnpmWorkspace, StaticWorkspace, WorkspaceResolver};
pub use writer::{OutputWriter, Placement, TargetOutcome, TargetState, WrittenFile};

/// Error types for kiln build operations.
///
/// Unit-scoped variants (`Bundle`, `Render`, `Write`, `TypeEmit`,
/// `Distribute`, `Task`) are collected into a [`BuildReport`]. Only
/// `ExternalResolution`, `Discovery` and `Config` abort a run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rolldown failed to parse or transform a unit.
    #[error("failed to bundle '{unit}': {}", format_diagnostics(.diagnostics))]
    Bundle {
        unit: String,
        diagnostics: Vec<ExtractedDiagnostic>,
    },

    /// The shared bundle could not be expressed in a target's convention.
    #[error("cannot render '{unit}' for target '{target}': {reason}")]
    Render {
        unit: String,
        target: String,
        reason: String,
    },

    #[error("failed to write '{unit}' for target '{target}' to {}: {source}", path.display())]
    Write {
        unit: String,
        target: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to emit declarations for {}: {message}", file.display())]
    TypeEmit { file: PathBuf, message: String },

    /// Internal package names could not be listed.
    #[error("cannot resolve workspace packages: {0}")]
    ExternalResolution(String),

    #[error("cannot scan {}: {source}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to copy declarations into target '{target}': {source}")]
    Distribute {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// A spawned task panicked or was aborted.
    #[error("task '{task}' did not complete: {message}")]
    Task { task: String, message: String },

    #[error(transparent)]
    Config(#[from] kiln_config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a bundle error from a Rolldown error batch.
    pub fn from_rolldown_batch(unit: &str, error: &dyn std::fmt::Debug) -> Self {
        Error::Bundle {
            unit: unit.to_string(),
            diagnostics: diagnostics::extract_from_rolldown_error(error),
        }
    }

    /// Unit, source file or target this error is scoped to, if any.
    pub fn scope(&self) -> Option<String> {
        match self {
            Error::Bundle { unit, .. }
            | Error::Render { unit, .. }
            | Error::Write { unit, .. } => Some(unit.clone()),
            Error::TypeEmit { file, .. } => Some(file.display().to_string()),
            Error::Distribute { target, .. } => Some(target.clone()),
            Error::Task { task, .. } => Some(task.clone()),
            _ => None,
        }
    }

    /// Whether this error aborts a run instead of being collected.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ExternalResolution(_) | Error::Discovery { .. } | Error::Config(_)
        )
    }
}

fn format_diagnostics(diagnostics: &[ExtractedDiagnostic]) -> String {
    match diagnostics {
        [] => "unknown bundler error".to_string(),
        [single] => format!("{}: {}", single.kind, single.message),
        many => format!(
            "{} errors: {}",
            many.len(),
            many.iter()
                .map(|d| format!("{}: {}", d.kind, d.message))
                .collect::<Vec<_>>()
                .join("; ")
        ),
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Bundle { .. } => "kiln::bundle",
            Error::Render { .. } => "kiln::render",
            Error::Write { .. } => "kiln::write",
            Error::TypeEmit { .. } => "kiln::type_emit",
            Error::ExternalResolution(_) => "kiln::external_resolution",
            Error::Discovery { .. } => "kiln::discovery",
            Error::Distribute { .. } => "kiln::distribute",
            Error::Task { .. } => "kiln::task",
            Error::Config(_) => "kiln::config",
            Error::Io(_) => "kiln::io",
        }))
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        let help: String = match self {
            Error::Bundle { diagnostics, .. } => diagnostics
                .iter()
                .find_map(|d| d.help.clone())
                .unwrap_or_else(|| "fix the reported source error and rebuild".to_string()),
            Error::Render { .. } => {
                "use `export_convention = \"named\"` for modules with named exports".to_string()
            }
            Error::ExternalResolution(_) => {
                "check pnpm-workspace.yaml or set `workspace.packages` in kiln.toml".to_string()
            }
            Error::Discovery { .. } => "check `paths.components` in kiln.toml".to_string(),
            _ => return None,
        };
        Some(Box::new(help))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_errors_name_what_failed() {
        let render = Error::Render {
            unit: "button".into(),
            target: "cjs".into(),
            reason: "named exports".into(),
        };
        assert_eq!(render.scope().as_deref(), Some("button"));
        assert!(!render.is_fatal());

        let resolution = Error::ExternalResolution("offline".into());
        assert_eq!(resolution.scope(), None);
        assert!(resolution.is_fatal());
    }
}
