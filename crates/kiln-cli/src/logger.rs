//! Logging setup for the kiln binary.
//!
//! Library crates only emit `tracing` events; the subscriber lives here.
//!
//! # Example
//!
//! ```rust,no_run
//! use kiln_cli::{logger::init_logger, ui};
//!
//! ui::init_colors(false);
//! init_logger(false, false, ui::colors_enabled());
//! tracing::info!("starting build");
//! ```

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "kiln_cli=debug,kiln_bundler=debug,kiln_config=debug";
const QUIET_FILTER: &str = "error";
const DEFAULT_FILTER: &str = "kiln_cli=info,kiln_bundler=info,kiln_config=info";

/// Pick the filter from the global flags. `--verbose` wins over `RUST_LOG`.
pub fn build_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Compact event formatting; escape codes only when `color` is set.
fn fmt_layer<S, W>(color: bool, writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(color)
        .with_writer(writer)
        .compact()
}

/// Install the global subscriber. Call once, before anything logs, with the
/// color decision already made by [`crate::ui::init_colors`].
pub fn init_logger(verbose: bool, quiet: bool, color: bool) {
    tracing_subscriber::registry()
        .with(build_filter(verbose, quiet))
        .with(fmt_layer(color, std::io::stderr))
        .init();
}
