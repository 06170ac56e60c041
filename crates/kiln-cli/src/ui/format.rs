//! Formatting utilities for sizes, durations and build summaries.

use console::Term;
use kiln_bundler::BuildReport;
use owo_colors::OwoColorize;
use std::path::Path;
use std::time::Duration;

use super::{colors_enabled, is_quiet};

/// Format file size in human-readable format.
///
/// ```
/// use kiln_cli::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(1024), "1.00 KB");
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

/// Format duration in human-readable format.
///
/// ```
/// use std::time::Duration;
/// use kiln_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Print the files a build wrote, relative to `root`, with their sizes.
pub fn print_build_summary(report: &BuildReport, root: &Path) {
    if is_quiet() {
        return;
    }
    for line in summary_lines(report, root) {
        eprintln!("{line}");
    }
}

fn summary_lines(report: &BuildReport, root: &Path) -> Vec<String> {
    let width = (Term::stderr().size().1 as usize).clamp(20, 80);
    let color = colors_enabled();
    let mut lines = Vec::with_capacity(report.files.len() + 4);

    let header = "Build Summary";
    lines.push(String::new());
    lines.push(if color {
        header.bold().underline().to_string()
    } else {
        header.to_string()
    });
    lines.push("─".repeat(width));

    let mut total = 0u64;
    for file in &report.files {
        let size = std::fs::metadata(file).map(|m| m.len()).unwrap_or(0);
        total += size;
        let name = file.strip_prefix(root).unwrap_or(file).display().to_string();
        let size = format_size(size);
        lines.push(if color {
            format!("  {} {} {}", "▸".blue(), name.bright_white(), size.dimmed())
        } else {
            format!("  ▸ {name} {size}")
        });
    }

    lines.push("─".repeat(width));
    let totals = format!(
        "{} package{}, {} entrypoint{}, {} in {}",
        report.packages,
        plural(report.packages),
        report.entrypoints,
        plural(report.entrypoints),
        format_size(total),
        format_duration(report.elapsed)
    );
    lines.push(if color {
        format!("  {} {}", "Total:".bold(), totals.green())
    } else {
        format!("  Total: {totals}")
    });
    lines
}

pub(crate) fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_format_size_bytes() {
        assert_eq!(format_size(1), "1 B");
        assert_eq!(format_size(1023), "1023 B");
    }

    #[test]
    fn test_format_size_larger_units() {
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1_048_576), "1.00 MB");
        assert_eq!(format_size(2_147_483_648), "2.00 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1000)), "1.00s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_summary_lists_relative_paths() {
        crate::ui::init_colors(true);
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("dist/pkg.cjs.js");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "x".repeat(10)).unwrap();

        let report = BuildReport {
            packages: 1,
            entrypoints: 1,
            files: vec![file],
            elapsed: Duration::from_millis(12),
        };
        let lines = summary_lines(&report, dir.path());

        let expected = format!("  ▸ {} 10 B", Path::new("dist").join("pkg.cjs.js").display());
        assert!(lines.contains(&expected));
        assert_eq!(
            lines.last().unwrap(),
            "  Total: 1 package, 1 entrypoint, 10 B in 12ms"
        );
    }
}
