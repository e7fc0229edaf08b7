//! Terminal output: status lines, size formatting and the size report.

mod format;
mod messages;
mod reporter;

use std::sync::atomic::{AtomicBool, Ordering};

pub use format::{format_size, print_targets};
pub use messages::{error, info, success, warning};
pub use reporter::ColoredSizeReporter;

static COLOR: AtomicBool = AtomicBool::new(true);

/// Whether colored output should be used, honoring `NO_COLOR` and
/// `FORCE_COLOR` before terminal detection.
pub fn should_use_color() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }
    console::user_attended_stderr()
}

/// Decide once, from `main`, whether output is colored. The logger reads
/// the same decision through [`colors_enabled`].
pub fn init_colors(no_color: bool) {
    COLOR.store(!no_color && should_use_color(), Ordering::Relaxed);
}

pub fn colors_enabled() -> bool {
    COLOR.load(Ordering::Relaxed)
}
