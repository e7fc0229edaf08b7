//! `kiln build`, `kiln components`, `kiln entry` and `kiln types`.

use std::sync::Arc;
use std::time::Instant;

use kiln_bundler::{BuildReport, NoopSizeReporter, Phase, Pipeline, SizeReporter};
use tracing::debug;

use crate::cli::{BuildArgs, Cli};
use crate::commands::load_config;
use crate::error::{CliError, Result};
use crate::ui;

pub async fn execute(cli: &Cli, args: &BuildArgs, phase: Phase) -> Result<()> {
    let start = Instant::now();
    let config = load_config(cli, Some(args))?;

    let targets = config.target_matrix();
    if !cli.quiet {
        let ids: Vec<&str> = targets.iter().map(|t| t.id.as_str()).collect();
        ui::info(&format!("Building {:?} for {}", phase, ids.join(", ")));
    }

    let reporter: Arc<dyn SizeReporter> = if args.no_size || cli.quiet {
        Arc::new(NoopSizeReporter)
    } else {
        Arc::new(ui::ColoredSizeReporter::new(&config.paths.root).color(ui::colors_enabled()))
    };

    let report = Pipeline::new(Arc::clone(&config))
        .with_reporter(reporter)
        .run(phase)
        .await?;

    for unit in &report.skipped {
        debug!(unit = %unit, "skipped, no entry file");
    }

    if !report.is_success() {
        ui::error(&summary(&report));
        return Err(CliError::BuildFailed {
            failures: report.failures.len(),
        });
    }

    if !cli.quiet {
        ui::success(&format!("{} in {:.2?}", summary(&report), start.elapsed()));
    }
    Ok(())
}

pub fn summary(report: &BuildReport) -> String {
    let files = report.written_files().count();
    let mut parts = vec![
        format!("{} unit(s)", report.units.len()),
        format!("{files} bundle file(s)"),
        format!("{} declaration file(s)", report.declarations.len()),
    ];
    if !report.failures.is_empty() {
        parts.push(format!("{} failure(s)", report.failures.len()));
    }
    parts.join(", ")
}
