use std::path::PathBuf;

use kiln_bundler::{SizeObservation, SizeReporter};
use owo_colors::OwoColorize;

use super::format_size;

/// Prints `<path>: <raw> -> gzip <gz>` for every emitted file, with paths
/// shown relative to `root` when possible.
#[derive(Debug, Clone)]
pub struct ColoredSizeReporter {
    root: PathBuf,
    color: bool,
}

impl ColoredSizeReporter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            color: true,
        }
    }

    pub fn color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn line(&self, observation: &SizeObservation) -> String {
        let path = observation
            .path
            .strip_prefix(&self.root)
            .unwrap_or(&observation.path);
        let gzip = observation
            .gzip_bytes
            .map(|bytes| format_size(bytes as u64))
            .unwrap_or_else(|| "?".to_string());
        let raw = format_size(observation.raw_bytes as u64);
        if self.color {
            format!(
                "{}: {} -> gzip {}",
                path.display().cyan(),
                raw.yellow(),
                gzip.green()
            )
        } else {
            format!("{}: {raw} -> gzip {gzip}", path.display())
        }
    }
}

impl SizeReporter for ColoredSizeReporter {
    fn report(&self, observation: &SizeObservation) {
        eprintln!("{}", self.line(observation));
    }
}
