//! CLI output formatting for the batch driver.
//!
//! # Output Format
//!
//! ## Redact
//!
//! ```text
//! 001 ct-042 (120 frames, 512x512x1 int16)
//!     Regions: 2 applied, 1 outside frame
//!     Overlays: 3 burned in
//!     Storage: single temp file
//!     Output: out/ct-042.redacted.raw
//!
//! Redacted 4 studies, 1 failed
//! ```
//!
//! ## Resample
//!
//! ```text
//! ct-042 512x512 → 256x256 (weighted area)
//!     Output: out/ct-042.resampled.raw
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::imaging::ResamplePath;
use crate::raster::SampleType;
use crate::redact::StorageKind;
use std::path::PathBuf;

// ============================================================================
// Shared helpers
// ============================================================================

/// `001`, `002`, ... for the study listing.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Four spaces per nesting level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{count} {}", if count == 1 { one } else { many })
}

// ============================================================================
// Redact output
// ============================================================================

/// What one study's redaction did.
#[derive(Debug, Clone, PartialEq)]
pub struct RedactSummary {
    pub name: String,
    pub frames: usize,
    pub width: usize,
    pub height: usize,
    pub bands: usize,
    pub sample_type: SampleType,
    pub regions_applied: usize,
    pub regions_skipped: usize,
    pub overlays_burned: usize,
    pub storage: StorageKind,
    pub output: PathBuf,
}

/// Outcome of one study in a batch.
#[derive(Debug)]
pub enum StudyResult {
    Redacted(RedactSummary),
    Failed { name: String, error: String },
}

/// Format one study's result. `index` is 1-based.
pub fn format_study(index: usize, result: &StudyResult) -> Vec<String> {
    match result {
        StudyResult::Redacted(s) => {
            let mut lines = vec![format!(
                "{} {} ({}, {}x{}x{} {})",
                format_index(index),
                s.name,
                plural(s.frames, "frame", "frames"),
                s.width,
                s.height,
                s.bands,
                s.sample_type
            )];
            let mut regions = format!("{}Regions: {} applied", indent(1), s.regions_applied);
            if s.regions_skipped > 0 {
                regions.push_str(&format!(", {} outside frame", s.regions_skipped));
            }
            lines.push(regions);
            if s.overlays_burned > 0 {
                lines.push(format!(
                    "{}Overlays: {} burned in",
                    indent(1),
                    s.overlays_burned
                ));
            }
            lines.push(format!("{}Storage: {}", indent(1), s.storage));
            lines.push(format!("{}Output: {}", indent(1), s.output.display()));
            lines
        }
        StudyResult::Failed { name, error } => vec![
            format!("{} {} (failed)", format_index(index), name),
            format!("{}Error: {}", indent(1), error),
        ],
    }
}

/// Format a whole batch: every study, then a totals line.
pub fn format_redact_output(results: &[StudyResult]) -> Vec<String> {
    let mut lines: Vec<String> = results
        .iter()
        .enumerate()
        .flat_map(|(i, result)| format_study(i + 1, result))
        .collect();
    let failed = results
        .iter()
        .filter(|r| matches!(r, StudyResult::Failed { .. }))
        .count();
    lines.push(String::new());
    let redacted = plural(results.len() - failed, "study", "studies");
    let mut totals = format!("Redacted {redacted}");
    if failed > 0 {
        totals.push_str(&format!(", {failed} failed"));
    }
    lines.push(totals);
    lines
}

/// Print redact output to stdout.
pub fn print_redact_output(results: &[StudyResult]) {
    for line in format_redact_output(results) {
        println!("{}", line);
    }
}

// ============================================================================
// Resample output
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ResampleSummary {
    pub name: String,
    pub from: (usize, usize),
    pub to: (usize, usize),
    pub path: ResamplePath,
    pub output: PathBuf,
}

pub fn format_resample_output(summary: &ResampleSummary) -> Vec<String> {
    let path = match summary.path {
        ResamplePath::Primary => "weighted area",
        ResamplePath::Fallback => "interpolated",
    };
    vec![
        format!(
            "{} {}x{} → {}x{} ({})",
            summary.name, summary.from.0, summary.from.1, summary.to.0, summary.to.1, path
        ),
        format!("{}Output: {}", indent(1), summary.output.display()),
    ]
}

/// Print resample output to stdout.
pub fn print_resample_output(summary: &ResampleSummary) {
    for line in format_resample_output(summary) {
        println!("{}", line);
    }
}
