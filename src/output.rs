//! CLI output formatting for `import` and `check`.
//!
//! # Information-First Display
//!
//! Every post is shown by its position and title, with the file it was
//! written to (or its slug) as secondary context. Per-record diagnostics go
//! through `tracing` to stderr; this module only produces the stdout
//! inventory and summary.
//!
//! # Output Format
//!
//! ## Import
//!
//! ```text
//! 001 Hello World → hello.md
//!     Comments: 3
//! 002 Work in progress (draft) → work-in-progress.md
//!
//! Comments: 3 written, 1 orphaned
//! Images: 2 downloaded, 1 reused, 1 failed
//! Wrote 1 published posts to disk.
//! Wrote 1 drafts to disk.
//! ```
//!
//! ## Check
//!
//! ```text
//! Posts
//! 001 Hello World (3 comments)
//!     Slug: hello
//!     Labels: rust
//! 002 Work in progress (draft)
//!
//! Comments: 3 linked, 1 orphaned
//! Other entries: 1
//!
//! Warnings
//!     Entry 4: unparsable ID "tag:blogger.com,1999:blog-1.post-x"
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::import::{Analysis, ImportSummary};
use std::path::Path;

/// Longest title shown before truncation.
const TITLE_WIDTH: usize = 72;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Format a post header: positional index + title, with draft marker.
///
/// ```text
/// 001 Hello World
/// 002 (untitled) (draft)
/// ```
fn post_header(index: usize, title: &str, draft: bool) -> String {
    let title = match title.trim() {
        "" => "(untitled)".to_string(),
        t => truncate(t, TITLE_WIDTH),
    };
    let marker = if draft { " (draft)" } else { "" };
    format!("{} {}{}", format_index(index), title, marker)
}

// ============================================================================
// Import
// ============================================================================

/// Format the result of an import. Paths are shown relative to `target`.
pub fn format_import_summary(summary: &ImportSummary, target: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    for (i, post) in summary.posts.iter().enumerate() {
        let path = post.path.strip_prefix(target).unwrap_or(&post.path);
        lines.push(format!(
            "{} → {}",
            post_header(i + 1, &post.title, post.draft),
            path.display()
        ));
        if post.comments > 0 {
            lines.push(format!("{}Comments: {}", indent(1), post.comments));
        }
    }

    lines.push(String::new());
    if summary.comments_written > 0 || summary.orphaned > 0 {
        lines.push(format!(
            "Comments: {} written, {} orphaned",
            summary.comments_written, summary.orphaned
        ));
    }
    if summary.images_saved + summary.images_reused + summary.images_failed > 0 {
        lines.push(format!(
            "Images: {} downloaded, {} reused, {} failed",
            summary.images_saved, summary.images_reused, summary.images_failed
        ));
    }
    if summary.conversion_failures > 0 {
        lines.push(format!(
            "Markdown: {} posts kept as HTML",
            summary.conversion_failures
        ));
    }
    lines.push(format!(
        "Wrote {} published posts to disk.",
        summary.published()
    ));
    lines.push(format!("Wrote {} drafts to disk.", summary.drafts()));
    lines
}

pub fn print_import_summary(summary: &ImportSummary, target: &Path) {
    for line in format_import_summary(summary, target) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the inventory of an analyzed export.
pub fn format_check_output(analysis: &Analysis) -> Vec<String> {
    let records = &analysis.records;
    let mut lines = vec!["Posts".to_string()];

    for (i, k) in analysis.posts().enumerate() {
        let record = &records[k];
        let mut header = post_header(i + 1, &record.title, false);
        let comments = record.comment_order.len();
        if comments > 0 {
            header.push_str(&format!(" ({} comments)", comments));
        }
        if record.is_draft {
            header.push_str(" (draft)");
        }
        lines.push(header);

        if let Some(slug) = record.slug.as_deref() {
            lines.push(format!("{}Slug: {}", indent(1), slug));
        }
        let labels: Vec<&str> = record.labels().collect();
        if !labels.is_empty() {
            lines.push(format!("{}Labels: {}", indent(1), labels.join(", ")));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Comments: {} linked, {} orphaned",
        analysis.links.linked.len(),
        analysis.links.orphaned.len()
    ));
    lines.push(format!("Other entries: {}", analysis.other_count()));

    let warnings = check_warnings(analysis);
    if !warnings.is_empty() {
        lines.push(String::new());
        lines.push("Warnings".to_string());
        lines.extend(warnings.into_iter().map(|w| format!("{}{}", indent(1), w)));
    }
    lines
}

fn check_warnings(analysis: &Analysis) -> Vec<String> {
    let mut warnings = Vec::new();

    for &k in &analysis.resolution.unparsable {
        warnings.push(format!(
            "Entry {}: unparsable ID {:?}",
            k, analysis.records[k].raw_id
        ));
    }
    for c in &analysis.resolution.collisions {
        warnings.push(format!(
            "Duplicate ID {}: entry {} ignored (kept entry {})",
            c.id, c.ignored, c.kept
        ));
    }
    for &k in &analysis.links.orphaned {
        warnings.push(format!("Entry {}: comment has no parent", k));
    }
    warnings
}

pub fn print_check_output(analysis: &Analysis) {
    for line in format_check_output(analysis) {
        println!("{}", line);
    }
}
