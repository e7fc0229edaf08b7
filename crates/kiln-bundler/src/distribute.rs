//! Copies the staged declaration tree into every target.

use std::io;
use std::path::{Path, PathBuf};

use kiln_config::OutputTarget;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionReport {
    pub target: String,
    pub destination: PathBuf,
    /// Number of files copied.
    pub files: usize,
}

/// Copies staged declarations out to the targets.
#[derive(Debug, Clone)]
pub struct Distributor {
    staging: PathBuf,
}

impl Distributor {
    pub fn new(staging: impl Into<PathBuf>) -> Self {
        Self {
            staging: staging.into(),
        }
    }

    /// Merge the staging tree into `<output_dir>/components` of each target.
    /// Existing files are overwritten and nothing is deleted. Must only be
    /// called once every declaration task has settled.
    pub fn distribute(&self, targets: &[OutputTarget]) -> Vec<Result<DistributionReport>> {
        if !self.staging.is_dir() {
            debug!(staging = %self.staging.display(), "no declarations staged");
            return Vec::new();
        }

        targets
            .iter()
            .map(|target| {
                let destination = target.components_dir();
                match copy_tree(&self.staging, &destination) {
                    Ok(files) => {
                        info!(target = %target.id, files, "declarations distributed");
                        Ok(DistributionReport {
                            target: target.id.clone(),
                            destination,
                            files,
                        })
                    }
                    Err(source) => {
                        let error = Error::Distribute {
                            target: target.id.clone(),
                            source,
                        };
                        warn!("{error}");
                        Err(error)
                    }
                }
            })
            .collect()
    }
}

fn copy_tree(from: &Path, to: &Path) -> io::Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(io::Error::other)?;
        let dest = to.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &dest)?;
            copied += 1;
        }
    }
    Ok(copied)
}
