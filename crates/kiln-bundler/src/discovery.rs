//! Component unit discovery.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::{Error, Result};

/// One independently buildable component, named after its directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentUnit {
    pub name: String,
    pub source_root: PathBuf,
    /// `index.<ext>` inside `source_root`, when present. Units without one are
    /// reported but never bundled.
    pub entry_file: Option<PathBuf>,
}

impl ComponentUnit {
    pub fn is_buildable(&self) -> bool {
        self.entry_file.is_some()
    }
}

/// One unit per immediate subdirectory of `root`, sorted by name. Hidden
/// directories are skipped and nothing below the first level is visited.
pub fn discover_components(root: &Path, source_extension: &str) -> Result<Vec<ComponentUnit>> {
    let mut units = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| Error::Discovery {
            path: root.to_path_buf(),
            source: e.into(),
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        let source_root = entry.into_path();
        let entry_file = index_file(&source_root, source_extension);
        debug!(unit = %name, has_entry = entry_file.is_some(), "discovered unit");

        units.push(ComponentUnit {
            name,
            source_root,
            entry_file,
        });
    }

    Ok(units)
}

/// `<root>/index.<ext>`, the aggregate entry of the component library.
pub fn aggregate_entry(root: &Path, source_extension: &str) -> Option<PathBuf> {
    index_file(root, source_extension)
}

fn index_file(dir: &Path, ext: &str) -> Option<PathBuf> {
    let candidate = dir.join(format!("index.{ext}"));
    candidate.is_file().then_some(candidate)
}
