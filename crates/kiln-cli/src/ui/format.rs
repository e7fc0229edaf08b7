//! Formatting helpers for sizes and the target table.

use kiln_config::OutputTarget;

/// Human-readable size.
///
/// ```
/// use kiln_cli::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_idx = 0;
    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// One line per target, in declaration order. Goes to stdout so it can be
/// piped.
pub fn print_targets(targets: &[OutputTarget]) {
    let width = targets.iter().map(|t| t.id.len()).max().unwrap_or(0);
    for target in targets {
        println!(
            "{:width$}  {:<3}  {:<7}  .{:<4}  {}",
            target.id,
            target.format.to_string(),
            target.export_convention.to_string(),
            target.extension,
            target.output_dir.display(),
            width = width
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_scale_units() {
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }
}
