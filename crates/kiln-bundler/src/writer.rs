//! Emitting a bundle graph into every output target.
//!
//! Each (unit, target) pair owns exactly one output path, so targets are
//! written independently and a failed target never touches its siblings.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiln_config::OutputTarget;
use path_clean::PathClean;
use tracing::{debug, warn};

use crate::graph::BundleGraph;
use crate::render::render;
use crate::rewrite::PathRewriter;
use crate::size::{SizeObservation, SizeReporter};
use crate::{Error, Result};

/// Where in a target's tree a bundle lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// `<output_dir>/components/<name>/index.<ext>`
    Unit(String),
    /// `<output_dir>/components/index.<ext>`
    Entry,
}

impl Placement {
    pub fn path(&self, target: &OutputTarget) -> PathBuf {
        match self {
            Placement::Unit(name) => target.unit_bundle_path(name),
            Placement::Entry => target.entry_bundle_path(),
        }
    }
}

/// Per-target emission states, logged as a target moves through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Ready,
    Emitting,
    Written,
    WriteFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub target: String,
    pub path: PathBuf,
    pub bytes: usize,
}

#[derive(Debug)]
pub struct TargetOutcome {
    pub target: String,
    pub path: PathBuf,
    pub result: Result<WrittenFile>,
}

impl TargetOutcome {
    pub fn state(&self) -> TargetState {
        if self.result.is_ok() {
            TargetState::Written
        } else {
            TargetState::WriteFailed
        }
    }
}

/// Renders a bundle graph per target and writes each result atomically.
#[derive(Clone)]
pub struct OutputWriter {
    rewriter: PathRewriter,
    reporter: Arc<dyn SizeReporter>,
}

impl OutputWriter {
    pub fn new(rewriter: PathRewriter, reporter: Arc<dyn SizeReporter>) -> Self {
        Self { rewriter, reporter }
    }

    /// Render and write `graph` once per target, in matrix order.
    pub async fn write(
        &self,
        graph: &BundleGraph,
        placement: &Placement,
        targets: &[OutputTarget],
    ) -> Vec<TargetOutcome> {
        let mut outcomes = Vec::with_capacity(targets.len());
        for target in targets {
            let path = placement.path(target);
            let result = self.emit(graph, target, &path).await;
            let outcome = TargetOutcome {
                target: target.id.clone(),
                path,
                result,
            };
            match &outcome.result {
                Ok(_) => debug!(unit = %graph.unit, target = %target.id, state = ?outcome.state(), "target emitted"),
                Err(e) => warn!(unit = %graph.unit, target = %target.id, state = ?outcome.state(), "{e}"),
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn emit(&self, graph: &BundleGraph, target: &OutputTarget, path: &Path) -> Result<WrittenFile> {
        debug!(unit = %graph.unit, target = %target.id, state = ?TargetState::Emitting, "rendering");
        let code = render(graph, target, &self.rewriter)?;

        write_atomic(&target.components_dir(), path, code.as_bytes())
            .await
            .map_err(|source| Error::Write {
                unit: graph.unit.clone(),
                target: target.id.clone(),
                path: path.to_path_buf(),
                source,
            })?;
        self.reporter
            .report(&SizeObservation::measure(path, code.as_bytes()));

        Ok(WrittenFile {
            target: target.id.clone(),
            path: path.to_path_buf(),
            bytes: code.len(),
        })
    }
}

/// Write through a sibling temp file and rename into place. `path` must stay
/// inside `base` after normalization.
pub(crate) async fn write_atomic(base: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let base = base.clean();
    let path = path.clean();
    if !path.starts_with(&base) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} escapes {}", path.display(), base.display()),
        ));
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, &path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}
