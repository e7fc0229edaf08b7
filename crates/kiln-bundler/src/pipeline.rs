//! Run orchestration.
//!
//! Internal packages are resolved before anything is spawned. Every unit
//! build, the aggregate entry build and every declaration task then run as
//! independent tasks; each outcome is collected individually so one failure
//! never cancels its siblings. Distribution starts only after all declaration
//! tasks have settled.

use std::path::PathBuf;
use std::sync::Arc;

use kiln_config::{KilnConfig, OutputTarget};
use rustc_hash::FxHashMap;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, error, info};

use crate::builder::{BundleBuilder, UnitState};
use crate::discovery::{aggregate_entry, discover_components};
use crate::distribute::{DistributionReport, Distributor};
use crate::external::{ExternalMode, ExternalPredicate, ExternalRules};
use crate::rewrite::PathRewriter;
use crate::size::{SizeReporter, TracingSizeReporter};
use crate::types::{DeclarationUnit, TypeEmitter, collect_declaration_sources};
use crate::workspace::{InternalPackages, PnpmWorkspace, StaticWorkspace, WorkspaceResolver};
use crate::writer::{OutputWriter, Placement, TargetOutcome, WrittenFile};
use crate::{Error, Result};

/// Which part of a build to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Components, entry and declarations, then distribution.
    #[default]
    All,
    /// One bundle per component unit.
    Components,
    /// The aggregate `index` entry.
    Entry,
    /// Declarations plus distribution.
    Types,
}

impl Phase {
    fn components(self) -> bool {
        matches!(self, Phase::All | Phase::Components)
    }

    fn entry(self) -> bool {
        matches!(self, Phase::All | Phase::Entry)
    }

    fn types(self) -> bool {
        matches!(self, Phase::All | Phase::Types)
    }
}

/// Files written for one bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub unit: String,
    pub outputs: Vec<WrittenFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationReport {
    pub source_file: PathBuf,
    pub emitted: Vec<PathBuf>,
    pub warnings: usize,
}

impl From<DeclarationUnit> for DeclarationReport {
    fn from(unit: DeclarationUnit) -> Self {
        Self {
            source_file: unit.source_file,
            emitted: unit.emitted,
            warnings: unit.warnings.len(),
        }
    }
}

/// Everything a run produced and every failure it collected.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Bundled units, sorted by name.
    pub units: Vec<UnitReport>,
    pub entry: Option<UnitReport>,
    /// Units without an entry file.
    pub skipped: Vec<String>,
    pub declarations: Vec<DeclarationReport>,
    pub distributions: Vec<DistributionReport>,
    pub failures: Vec<Error>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn bundle_error_count(&self) -> usize {
        self.failures
            .iter()
            .filter(|e| matches!(e, Error::Bundle { .. }))
            .count()
    }

    pub fn written_files(&self) -> impl Iterator<Item = &WrittenFile> {
        self.units
            .iter()
            .chain(self.entry.as_ref())
            .flat_map(|unit| unit.outputs.iter())
    }

    fn record_outcomes(&mut self, unit: String, outcomes: Vec<TargetOutcome>) -> UnitReport {
        let mut outputs = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome.result {
                Ok(file) => outputs.push(file),
                Err(e) => self.failures.push(e),
            }
        }
        UnitReport { unit, outputs }
    }
}

enum BundleTask {
    Unit(String, Result<Vec<TargetOutcome>>),
    Entry(Result<Vec<TargetOutcome>>),
}

/// Drives one build over a loaded [`KilnConfig`].
///
/// Internal packages come from `workspace.packages` when configured, and
/// from `pnpm-workspace.yaml` otherwise. Size observations go to tracing
/// unless another [`SizeReporter`] is installed.
pub struct Pipeline {
    config: Arc<KilnConfig>,
    resolver: Arc<dyn WorkspaceResolver>,
    reporter: Arc<dyn SizeReporter>,
}

impl Pipeline {
    pub fn new(config: Arc<KilnConfig>) -> Self {
        let resolver: Arc<dyn WorkspaceResolver> = if config.workspace.packages.is_empty() {
            Arc::new(PnpmWorkspace::new(&config.paths.root))
        } else {
            Arc::new(StaticWorkspace::new(config.workspace.packages.iter().cloned()))
        };
        Self {
            config,
            resolver,
            reporter: Arc::new(TracingSizeReporter),
        }
    }

    /// Replace how internal package names are listed.
    pub fn with_resolver(mut self, resolver: Arc<dyn WorkspaceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn SizeReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Run `phase`. Only configuration, discovery and workspace resolution
    /// errors are returned as `Err`; everything scoped to a unit, file or
    /// target ends up in [`BuildReport::failures`].
    pub async fn run(&self, phase: Phase) -> Result<BuildReport> {
        let config = &self.config;
        let targets: Arc<[OutputTarget]> = config.target_matrix().into();
        let mut report = BuildReport::default();

        // Declaration sources are listed before any bundle task exists, so a
        // discovery failure here cannot abort builds already in flight.
        let declaration_sources = if phase.types() {
            Some(collect_declaration_sources(&config.paths.entries)?)
        } else {
            None
        };

        let bundles = if phase.components() || phase.entry() {
            let internal = Arc::new(InternalPackages::resolve(
                self.resolver.as_ref(),
                &config.workspace.namespace,
            )?);
            info!(count = internal.len(), "resolved internal packages");
            Some(self.spawn_bundles(phase, internal, &targets, &mut report)?)
        } else {
            None
        };

        let declarations = declaration_sources.map(|sources| self.spawn_declarations(sources));

        let (bundle_results, declaration_results) = tokio::join!(
            async {
                match bundles {
                    Some((set, names)) => settle(set, names).await,
                    None => Vec::new(),
                }
            },
            async {
                match declarations {
                    Some((set, names)) => settle(set, names).await,
                    None => Vec::new(),
                }
            }
        );

        for result in bundle_results {
            match result {
                Ok(BundleTask::Unit(unit, Ok(outcomes))) => {
                    let unit_report = report.record_outcomes(unit, outcomes);
                    report.units.push(unit_report);
                }
                Ok(BundleTask::Entry(Ok(outcomes))) => {
                    let entry_report = report.record_outcomes("index".to_string(), outcomes);
                    report.entry = Some(entry_report);
                }
                Ok(BundleTask::Unit(_, Err(e)) | BundleTask::Entry(Err(e))) | Err(e) => {
                    report.failures.push(e)
                }
            }
        }

        // Every declaration task has settled at this point.
        if phase.types() {
            for result in declaration_results {
                match result {
                    Ok(Ok(unit)) => report.declarations.push(unit.into()),
                    Ok(Err(e)) | Err(e) => report.failures.push(e),
                }
            }

            let distributor = Distributor::new(config.paths.types_staging_dir());
            let distribute_targets = Arc::clone(&targets);
            let distributed =
                tokio::task::spawn_blocking(move || distributor.distribute(&distribute_targets))
                    .await
                    .unwrap_or_else(|e| vec![Err(task_error("distribute", e))]);
            for result in distributed {
                match result {
                    Ok(distribution) => report.distributions.push(distribution),
                    Err(e) => report.failures.push(e),
                }
            }
        }

        report.units.sort_by(|a, b| a.unit.cmp(&b.unit));
        report
            .declarations
            .sort_by(|a, b| a.source_file.cmp(&b.source_file));

        for failure in &report.failures {
            match failure.scope() {
                Some(scope) => error!(scope = %scope, "{failure}"),
                None => error!("{failure}"),
            }
        }
        info!(
            units = report.units.len(),
            skipped = report.skipped.len(),
            declarations = report.declarations.len(),
            failures = report.failures.len(),
            "build finished"
        );
        Ok(report)
    }

    fn spawn_bundles(
        &self,
        phase: Phase,
        internal: Arc<InternalPackages>,
        targets: &Arc<[OutputTarget]>,
        report: &mut BuildReport,
    ) -> Result<(JoinSet<BundleTask>, FxHashMap<Id, String>)> {
        let config = &self.config;
        let rules = ExternalRules::from_config(&config.externals, &config.paths.package_json)?;
        let writer = OutputWriter::new(PathRewriter::new(Arc::clone(&internal)), Arc::clone(&self.reporter));

        let mut set = JoinSet::new();
        let mut names = FxHashMap::default();

        if phase.components() {
            let component_builder = BundleBuilder::new(
                ExternalPredicate::new(ExternalMode::Component, &internal, &rules),
                &config.paths.root,
            );

            for unit in discover_components(&config.paths.components, &config.paths.source_extension)? {
                let Some(entry) = unit.entry_file else {
                    debug!(unit = %unit.name, "no entry file, skipping");
                    report.skipped.push(unit.name);
                    continue;
                };
                debug!(unit = %unit.name, state = ?UnitState::Pending, "queued");

                let builder = component_builder.clone();
                let writer = writer.clone();
                let targets = Arc::clone(targets);
                let name = unit.name.clone();
                let handle = set.spawn(async move {
                    let result = match builder.build(&name, &entry).await {
                        Ok(graph) => Ok(writer
                            .write(&graph, &Placement::Unit(name.clone()), &targets)
                            .await),
                        Err(e) => Err(e),
                    };
                    BundleTask::Unit(name, result)
                });
                names.insert(handle.id(), unit.name);
            }
        }

        if phase.entry() {
            match aggregate_entry(&config.paths.components, &config.paths.source_extension) {
                Some(entry) => {
                    let builder = BundleBuilder::new(
                        ExternalPredicate::new(ExternalMode::Full, &internal, &rules),
                        &config.paths.root,
                    );
                    let writer = writer.clone();
                    let targets = Arc::clone(targets);
                    let handle = set.spawn(async move {
                        let result = match builder.build("index", &entry).await {
                            Ok(graph) => Ok(writer.write(&graph, &Placement::Entry, &targets).await),
                            Err(e) => Err(e),
                        };
                        BundleTask::Entry(result)
                    });
                    names.insert(handle.id(), "index".to_string());
                }
                None => debug!("no aggregate entry, skipping"),
            }
        }

        Ok((set, names))
    }

    fn spawn_declarations(
        &self,
        sources: Vec<PathBuf>,
    ) -> (JoinSet<Result<DeclarationUnit>>, FxHashMap<Id, String>) {
        let config = &self.config;
        let emitter = TypeEmitter::new(config.paths.types_staging_dir(), &config.workspace.alias_token);

        let mut set = JoinSet::new();
        let mut names = FxHashMap::default();
        for source in sources {
            let emitter = emitter.clone();
            let label = source.display().to_string();
            let handle = set.spawn(async move { emitter.emit(&source).await });
            names.insert(handle.id(), label);
        }
        (set, names)
    }
}

/// Wait for every task in `set`. Panicked or aborted tasks become
/// [`Error::Task`] named after their entry in `names`.
async fn settle<T: 'static>(mut set: JoinSet<T>, names: FxHashMap<Id, String>) -> Vec<Result<T>> {
    let mut results = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next_with_id().await {
        results.push(match joined {
            Ok((_, value)) => Ok(value),
            Err(e) => {
                let task = names
                    .get(&e.id())
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string());
                Err(task_error(&task, e))
            }
        });
    }
    results
}

fn task_error(task: &str, error: JoinError) -> Error {
    let message = if error.is_panic() {
        let payload = error.into_panic();
        payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panicked".to_string())
    } else {
        error.to_string()
    };
    Error::Task {
        task: task.to_string(),
        message,
    }
}
