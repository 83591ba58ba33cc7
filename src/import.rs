//! The import pipeline.
//!
//! Wires the stages together and writes the result to disk:
//!
//! ```text
//! export.xml
//!   → parse      records, each classified
//!   → resolve    numeric IDs, reply targets, slugs
//!   → link       comments attached to parents        (comments enabled)
//!   → flatten    per-post comment order              (comments enabled)
//!   → per post:  extra metadata → strip blogger URLs → localize images
//!                → Markdown → &nbsp; → render → write <target>/<slug>.md
//!   → per comment: render → write <target>/<comments_dir>/c<id>.toml
//! ```
//!
//! Every stage finishes over the whole record list before the next starts.
//! [`analyze`] runs the in-memory stages only and backs the `check` command.
//!
//! ## Failure Policy
//!
//! An inconsistent export (a comment whose parent is missing, a cyclic reply
//! chain), a header that does not render, or any failed write stops the run.
//! Unparsable IDs, orphaned comments, failed image downloads and failed
//! Markdown conversions are logged and skipped.

use crate::config::ImportConfig;
use crate::convert::{MarkdownConverter, MarkupConverter};
use crate::fs_utils::{ensure_dir, write_file};
use crate::localize::{FetchError, Fetcher, HttpFetcher, Localizer};
use crate::naming::slugify;
use crate::parse::{ParseError, parse_export};
use crate::render::{RenderError, render_comment, render_post};
use crate::resolve::{Resolution, resolve};
use crate::tree::{LinkReport, TreeError, assign_comment_order, link_comments};
use crate::types::{Author, Record};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Author URIs and images on this host are dropped by `strip_blogger_urls`.
const BLOGGER_HOST: &str = "blogger.com";

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Failed to read export {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Export contains no posts")]
    NoPosts,
    #[error("Comment tree error: {0}")]
    Tree(#[from] TreeError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("HTTP client error: {0}")]
    Client(#[from] FetchError),
}

/// In-memory result of parsing, resolving and linking an export.
#[derive(Debug)]
pub struct Analysis {
    pub records: Vec<Record>,
    pub resolution: Resolution,
    /// Empty when comments were not linked.
    pub links: LinkReport,
}

impl Analysis {
    /// Indices of post records, in export order.
    pub fn posts(&self) -> impl Iterator<Item = usize> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_post())
            .map(|(k, _)| k)
    }

    pub fn comment_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_comment()).count()
    }

    pub fn other_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| !r.role.is_linkable())
            .count()
    }
}

/// Parse and resolve an export. With `with_comments`, also link comments to
/// their parents and compute every post's comment order.
pub fn analyze(xml: &str, with_comments: bool) -> Result<Analysis, ImportError> {
    let mut records = parse_export(xml)?;
    if !records.iter().any(Record::is_post) {
        return Err(ImportError::NoPosts);
    }

    let resolution = resolve(&mut records);

    let mut links = LinkReport::default();
    if with_comments {
        links = link_comments(&mut records, &resolution)?;
        let posts: Vec<usize> = (0..records.len())
            .filter(|&k| records[k].is_post())
            .collect();
        for post in posts {
            assign_comment_order(&mut records, post)?;
        }
    }

    debug!(
        records = records.len(),
        resolved = resolution.len(),
        linked = links.linked.len(),
        "Analyzed export"
    );
    Ok(Analysis {
        records,
        resolution,
        links,
    })
}

/// One post file written by an import.
#[derive(Debug, Clone, Serialize)]
pub struct WrittenPost {
    pub title: String,
    pub path: PathBuf,
    pub draft: bool,
    pub comments: usize,
}

/// What an import wrote and skipped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub posts: Vec<WrittenPost>,
    pub comments_written: usize,
    pub images_saved: usize,
    pub images_reused: usize,
    pub images_failed: usize,
    pub orphaned: usize,
    pub conversion_failures: usize,
}

impl ImportSummary {
    pub fn published(&self) -> usize {
        self.posts.iter().filter(|p| !p.draft).count()
    }

    pub fn drafts(&self) -> usize {
        self.posts.iter().filter(|p| p.draft).count()
    }
}

/// Import an export file into `target` using the network for images.
pub fn import(
    export: &Path,
    target: &Path,
    config: &ImportConfig,
) -> Result<ImportSummary, ImportError> {
    let xml = std::fs::read_to_string(export).map_err(|source| ImportError::Read {
        path: export.to_path_buf(),
        source,
    })?;
    let fetcher = HttpFetcher::new(Duration::from_secs(config.download.timeout_secs))?;
    import_with(&xml, target, config, &fetcher, &MarkdownConverter)
}

/// Import an export document into `target`.
pub fn import_with<F: Fetcher>(
    xml: &str,
    target: &Path,
    config: &ImportConfig,
    fetcher: &F,
    converter: &dyn MarkupConverter,
) -> Result<ImportSummary, ImportError> {
    let output = &config.output;
    let mut analysis = analyze(xml, output.comments)?;
    let posts: Vec<usize> = analysis.posts().collect();
    let records = &mut analysis.records;

    ensure_dir(target).map_err(write_error(target))?;
    let comments_dir = target.join(&output.comments_dir);
    if output.comments {
        ensure_dir(&comments_dir).map_err(write_error(&comments_dir))?;
    }
    let localizer = match &config.images.static_dir {
        Some(dir) => {
            ensure_dir(dir).map_err(write_error(dir))?;
            Some(Localizer::new(fetcher, dir))
        }
        None => None,
    };

    let mut summary = ImportSummary {
        orphaned: analysis.links.orphaned.len(),
        ..ImportSummary::default()
    };

    for &k in &posts {
        let record = &mut records[k];
        record.extra_metadata = output.extra.clone();
        if output.strip_blogger_urls {
            strip_blogger_urls(&mut record.author);
        }

        if let Some(localizer) = &localizer {
            let localized = localizer.localize(&record.content);
            summary.images_reused += localized.saved.iter().filter(|s| s.reused).count();
            summary.images_saved += localized.saved.iter().filter(|s| !s.reused).count();
            summary.images_failed += localized.failed.len();
            record.content = localized.content;
        }

        if output.markdown {
            match converter.convert(&record.content) {
                Ok(markdown) => record.content = markdown,
                Err(e) => {
                    warn!(title = %record.title, error = %e, "Markdown conversion failed, keeping HTML");
                    summary.conversion_failures += 1;
                }
            }
        }

        record.content = record.content.replace("&nbsp;", " ");
    }

    let mut file_names = HashSet::new();
    for &k in &posts {
        let record = &records[k];
        let name = post_file_name(record, k, output.slug_filenames);
        if !file_names.insert(name.clone()) {
            warn!(title = %record.title, file = %name, "Another post already uses this file name; overwriting");
        }

        let rendered = render_post(record, &config.images)?;
        let path = target.join(format!("{name}.md"));
        write_file(&path, &rendered).map_err(write_error(&path))?;
        info!(title = %record.title, path = %path.display(), draft = record.is_draft, "Wrote post");

        summary.posts.push(WrittenPost {
            title: record.title.clone(),
            path,
            draft: record.is_draft,
            comments: record.comment_order.len(),
        });
    }

    if output.comments {
        for &k in &analysis.links.linked {
            let record = &mut records[k];
            let Some(id) = record.numeric_id else {
                warn!(entry = k, raw_id = %record.raw_id, "Skipping comment without numeric ID");
                continue;
            };
            if output.strip_blogger_urls {
                strip_blogger_urls(&mut record.author);
            }
            let rendered = render_comment(record)?;
            let path = comments_dir.join(format!("c{id}.toml"));
            write_file(&path, &rendered).map_err(write_error(&path))?;
            debug!(id, path = %path.display(), "Wrote comment");
            summary.comments_written += 1;
        }
    }

    Ok(summary)
}

fn write_error(path: &Path) -> impl FnOnce(std::io::Error) -> ImportError + '_ {
    move |source| ImportError::Write {
        path: path.to_path_buf(),
        source,
    }
}

/// File stem for a post: its permalink slug, or the slugified title.
/// Falls back to `post-<id>` when both are empty.
pub fn post_file_name(record: &Record, index: usize, prefer_slug: bool) -> String {
    let slug = record
        .slug
        .as_deref()
        .filter(|s| prefer_slug && !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| slugify(&record.title));
    if !slug.is_empty() {
        return slug;
    }
    match record.numeric_id {
        Some(id) => format!("post-{id}"),
        None => format!("post-{index}"),
    }
}

fn strip_blogger_urls(author: &mut Author) {
    if author.uri.contains(BLOGGER_HOST) {
        author.uri.clear();
    }
    if author.image.src.contains(BLOGGER_HOST) {
        author.image.src.clear();
    }
}
