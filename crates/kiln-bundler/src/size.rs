//! Size observations for emitted files. Reporting never alters output bytes.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeObservation {
    pub path: PathBuf,
    pub raw_bytes: usize,
    /// `None` when the estimate could not be computed.
    pub gzip_bytes: Option<usize>,
}

impl SizeObservation {
    pub fn measure(path: &Path, bytes: &[u8]) -> Self {
        Self {
            path: path.to_path_buf(),
            raw_bytes: bytes.len(),
            gzip_bytes: gzip_size(bytes),
        }
    }
}

/// Receives one observation per file, just before it is written.
pub trait SizeReporter: Send + Sync {
    fn report(&self, observation: &SizeObservation);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSizeReporter;

impl SizeReporter for NoopSizeReporter {
    fn report(&self, _observation: &SizeObservation) {}
}

/// Logs each observation at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSizeReporter;

impl SizeReporter for TracingSizeReporter {
    fn report(&self, observation: &SizeObservation) {
        info!(
            path = %observation.path.display(),
            raw = observation.raw_bytes,
            gzip = observation.gzip_bytes,
            "emitted"
        );
    }
}

pub fn gzip_size(bytes: &[u8]) -> Option<usize> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).ok()?;
    encoder.finish().ok().map(|compressed| compressed.len())
}
