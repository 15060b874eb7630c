//! CLI output formatting.
//!
//! Every command prints a header line naming the entity, followed by
//! indented detail lines.
//!
//! ## mtime
//!
//! ```text
//! photos/dawn.jpg (source)
//!     Modified: 2024-05-01T10:00:00+00:00
//!     Remote: yes
//! ```
//!
//! ## check
//!
//! ```text
//! photos/dawn.jpg → thumbs/dawn.jpg_200x200.webp
//!     Source: 2024-05-01T10:00:00+00:00
//!     Thumbnail: 2024-04-30T08:00:00+00:00
//!     Rebuild: yes
//! ```
//!
//! ## invalidate
//!
//! ```text
//! Invalidated photos/dawn.jpg
//!     easy:source:photos/dawn.jpg*
//!     easy:thumbnail:photos/dawn.jpg*
//! ```
//!
//! ## inspect
//!
//! ```text
//! 001 album/dawn.jpg
//!     Size: 4000x3000
//!     Mode: RGB, opaque
//!     Entropy: 7.412
//!     Orientation: 6
//! 002 album/broken.png
//!     Error: Invalid PNG: truncated chunk
//!
//! Inspected 2 files, 1 failed
//! ```
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout.

use crate::cache::ImageClass;
use crate::freshness::Freshness;
use crate::imaging::ImagingError;
use crate::inspect::ImageReport;
use std::path::PathBuf;

fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

// ============================================================================
// mtime
// ============================================================================

pub fn format_mtime(name: &str, class: ImageClass, remote: bool, freshness: Freshness) -> Vec<String> {
    let modified = match freshness {
        Freshness::Fresh(ts) => ts.to_rfc3339(),
        Freshness::Stale => "stale (storage unavailable, rebuild)".to_string(),
        Freshness::Unknown => "unknown".to_string(),
    };
    vec![
        format!("{} ({})", name, class),
        format!("{}Modified: {}", indent(1), modified),
        format!("{}Remote: {}", indent(1), if remote { "yes" } else { "no" }),
    ]
}

pub fn print_mtime(name: &str, class: ImageClass, remote: bool, freshness: Freshness) {
    for line in format_mtime(name, class, remote, freshness) {
        println!("{}", line);
    }
}

// ============================================================================
// check
// ============================================================================

pub fn format_check(
    source: &str,
    thumbnail: &str,
    source_state: Freshness,
    thumbnail_state: Freshness,
) -> Vec<String> {
    let rebuild = source_state.needs_rebuild(thumbnail_state);
    vec![
        format!("{} → {}", source, thumbnail),
        format!("{}Source: {}", indent(1), source_state),
        format!("{}Thumbnail: {}", indent(1), thumbnail_state),
        format!("{}Rebuild: {}", indent(1), if rebuild { "yes" } else { "no" }),
    ]
}

pub fn print_check(
    source: &str,
    thumbnail: &str,
    source_state: Freshness,
    thumbnail_state: Freshness,
) {
    for line in format_check(source, thumbnail, source_state, thumbnail_state) {
        println!("{}", line);
    }
}

// ============================================================================
// invalidate
// ============================================================================

pub fn format_invalidate(name: &str, patterns: &[String]) -> Vec<String> {
    if patterns.is_empty() {
        return vec!["Nothing to invalidate".to_string()];
    }
    let mut lines = vec![format!("Invalidated {}", name)];
    lines.extend(patterns.iter().map(|p| format!("{}{}", indent(1), p)));
    lines
}

pub fn print_invalidate(name: &str, patterns: &[String]) {
    for line in format_invalidate(name, patterns) {
        println!("{}", line);
    }
}

// ============================================================================
// inspect
// ============================================================================

fn report_lines(report: &ImageReport) -> Vec<String> {
    let mut lines = vec![
        format!("{}Size: {}x{}", indent(1), report.width, report.height),
        format!(
            "{}Mode: {}, {}",
            indent(1),
            report.mode,
            if report.transparent { "transparent" } else { "opaque" }
        ),
        format!("{}Entropy: {:.3}", indent(1), report.entropy),
    ];
    if let Some(orientation) = report.orientation {
        lines.push(format!(
            "{}Orientation: {}",
            indent(1),
            orientation.exif_value()
        ));
    }
    lines
}

pub fn format_inspect(results: &[(PathBuf, Result<ImageReport, ImagingError>)]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut failed = 0;

    for (i, (path, result)) in results.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), path.display()));
        match result {
            Ok(report) => lines.extend(report_lines(report)),
            Err(e) => {
                failed += 1;
                lines.push(format!("{}Error: {}", indent(1), e));
            }
        }
    }

    if !lines.is_empty() {
        lines.push(String::new());
    }
    let noun = if results.len() == 1 { "file" } else { "files" };
    let mut summary = format!("Inspected {} {}", results.len(), noun);
    if failed > 0 {
        summary.push_str(&format!(", {} failed", failed));
    }
    lines.push(summary);
    lines
}

pub fn print_inspect(results: &[(PathBuf, Result<ImageReport, ImagingError>)]) {
    for line in format_inspect(results) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{ColorMode, Orientation};
    use crate::test_helpers::ts;

    fn report(path: &str) -> ImageReport {
        ImageReport {
            path: PathBuf::from(path),
            width: 40,
            height: 30,
            mode: ColorMode::Rgb,
            transparent: false,
            entropy: 7.41234,
            orientation: None,
        }
    }

    // =========================================================================
    // mtime
    // =========================================================================

    #[test]
    fn mtime_fresh_shows_rfc3339() {
        let lines = format_mtime("a.jpg", ImageClass::Source, true, Freshness::Fresh(ts(0)));
        assert_eq!(
            lines,
            vec![
                "a.jpg (source)",
                "    Modified: 1970-01-01T00:00:00+00:00",
                "    Remote: yes",
            ]
        );
    }

    #[test]
    fn mtime_degraded_states() {
        let stale = format_mtime("a.jpg", ImageClass::Thumbnail, false, Freshness::Stale);
        assert_eq!(stale[0], "a.jpg (thumbnail)");
        assert!(stale[1].contains("stale"));
        assert_eq!(stale[2], "    Remote: no");

        let unknown = format_mtime("a.jpg", ImageClass::Source, false, Freshness::Unknown);
        assert_eq!(unknown[1], "    Modified: unknown");
    }

    // =========================================================================
    // check
    // =========================================================================

    #[test]
    fn check_newer_source_needs_rebuild() {
        let lines = format_check(
            "a.jpg",
            "a.jpg_80x80.webp",
            Freshness::Fresh(ts(200)),
            Freshness::Fresh(ts(100)),
        );
        assert_eq!(
            lines,
            vec![
                "a.jpg → a.jpg_80x80.webp",
                "    Source: 1970-01-01T00:03:20+00:00",
                "    Thumbnail: 1970-01-01T00:01:40+00:00",
                "    Rebuild: yes",
            ]
        );
    }

    #[test]
    fn check_rebuild_decision() {
        let rebuild = |s, t| format_check("a", "b", s, t)[3].clone();
        assert_eq!(
            rebuild(Freshness::Fresh(ts(100)), Freshness::Fresh(ts(200))),
            "    Rebuild: no"
        );
        assert_eq!(
            rebuild(Freshness::Fresh(ts(100)), Freshness::Stale),
            "    Rebuild: yes"
        );
        assert_eq!(
            rebuild(Freshness::Unknown, Freshness::Fresh(ts(100))),
            "    Rebuild: no"
        );
    }

    // =========================================================================
    // invalidate
    // =========================================================================

    #[test]
    fn invalidate_lists_patterns() {
        let patterns = vec!["easy:source:a*".to_string(), "easy:thumbnail:a*".to_string()];
        assert_eq!(
            format_invalidate("a", &patterns),
            vec!["Invalidated a", "    easy:source:a*", "    easy:thumbnail:a*"]
        );
    }

    #[test]
    fn invalidate_nothing() {
        assert_eq!(format_invalidate("", &[]), vec!["Nothing to invalidate"]);
    }

    // =========================================================================
    // inspect
    // =========================================================================

    #[test]
    fn inspect_success_lines() {
        let results = vec![(PathBuf::from("x/a.jpg"), Ok(report("x/a.jpg")))];
        assert_eq!(
            format_inspect(&results),
            vec![
                "001 x/a.jpg",
                "    Size: 40x30",
                "    Mode: RGB, opaque",
                "    Entropy: 7.412",
                "",
                "Inspected 1 file",
            ]
        );
    }

    #[test]
    fn inspect_shows_orientation_and_transparency() {
        let mut r = report("b.png");
        r.mode = ColorMode::Rgba;
        r.transparent = true;
        r.orientation = Some(Orientation::Rotate90Cw);
        let lines = format_inspect(&[(PathBuf::from("b.png"), Ok(r))]);
        assert!(lines.contains(&"    Mode: RGBA, transparent".to_string()));
        assert!(lines.contains(&"    Orientation: 6".to_string()));
    }

    #[test]
    fn inspect_counts_failures() {
        let results = vec![
            (PathBuf::from("a.jpg"), Ok(report("a.jpg"))),
            (
                PathBuf::from("b.png"),
                Err(ImagingError::InvalidPng("truncated chunk".into())),
            ),
        ];
        let lines = format_inspect(&results);
        assert!(lines.contains(&"002 b.png".to_string()));
        assert!(lines.iter().any(|l| l.starts_with("    Error:") && l.contains("truncated chunk")));
        assert_eq!(lines.last().unwrap(), "Inspected 2 files, 1 failed");
    }

    #[test]
    fn inspect_empty() {
        assert_eq!(format_inspect(&[]), vec!["Inspected 0 files"]);
    }
}
