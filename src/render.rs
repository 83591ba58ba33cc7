//! Frontmatter rendering for posts and comments.
//!
//! Every field and its emission condition is spelled out here; there is no
//! template engine. All string values go through [`toml_string`], and the
//! finished post header is parsed back with `toml` so a malformed value (most
//! likely injected extra metadata) stops the import instead of producing a file
//! the site generator cannot read.
//!
//! ## Post Layout
//!
//! ```text
//! +++
//! title = "Hello"
//! slug = "hello-world"            ← only when it differs from the title slug
//! date = 2014-03-02T10:20:30-08:00
//! updated = 2014-03-03T08:00:00-08:00
//! tags = ["rust", "travel"]       ← only blog labels, omitted when none
//! draft = true                    ← only for drafts
//! blogimport = true
//! <extra metadata>                ← verbatim, when configured
//! comments = [ 11, 12 ]           ← only when the post has comments
//!                                    (IDs beyond i64 are quoted)
//! [author]
//!     name = "Ann"
//!     uri = "..."
//!     image = "..."
//! [image]                         ← only when the post has a thumbnail
//!     src = "...s1600/pic.jpg"
//!     thumblink = "...s72-c/pic.jpg"
//!     ...
//! +++
//!
//! <content>
//! ```

use crate::config::ImagesConfig;
use crate::naming::slugify;
use crate::types::{Record, Timestamp};
use chrono::SecondsFormat;
use std::fmt::Write;
use thiserror::Error;

/// Line that opens and closes a post's frontmatter.
pub const DELIMITER: &str = "+++";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Frontmatter of {title:?} is not valid TOML: {source}")]
    InvalidFrontmatter {
        title: String,
        source: toml::de::Error,
    },
    #[error("Comment {0:?} has no numeric ID")]
    MissingId(String),
    #[error("Formatting failed: {0}")]
    Fmt(#[from] std::fmt::Error),
}

/// Render a post: frontmatter block, blank line, body.
pub fn render_post(record: &Record, images: &ImagesConfig) -> Result<String, RenderError> {
    let header = post_header(record, images)?;

    if let Err(source) = header.parse::<toml::Table>() {
        return Err(RenderError::InvalidFrontmatter {
            title: record.title.clone(),
            source,
        });
    }

    let mut out = String::with_capacity(header.len() + record.content.len() + 16);
    writeln!(out, "{DELIMITER}")?;
    out.push_str(&header);
    writeln!(out, "{DELIMITER}")?;
    writeln!(out)?;
    writeln!(out, "{}", record.content)?;
    Ok(out)
}

fn post_header(record: &Record, images: &ImagesConfig) -> Result<String, RenderError> {
    let mut h = String::new();

    writeln!(h, "title = {}", toml_string(&record.title))?;
    if let Some(slug) = record.slug.as_deref()
        && slug != slugify(&record.title)
    {
        writeln!(h, "slug = {}", toml_string(slug))?;
    }
    writeln!(h, "date = {}", timestamp(&record.published))?;
    writeln!(h, "updated = {}", timestamp(&record.updated))?;

    let labels: Vec<String> = record.labels().map(toml_string).collect();
    if !labels.is_empty() {
        writeln!(h, "tags = [{}]", labels.join(", "))?;
    }
    if record.is_draft {
        writeln!(h, "draft = true")?;
    }
    writeln!(h, "blogimport = true")?;
    if !record.extra_metadata.is_empty() {
        writeln!(h, "{}", record.extra_metadata.trim_end())?;
    }
    if !record.comment_order.is_empty() {
        let ids: Vec<String> = record.comment_order.iter().copied().map(toml_id).collect();
        writeln!(h, "comments = [ {} ]", ids.join(", "))?;
    }

    writeln!(h, "[author]")?;
    writeln!(h, "\tname = {}", toml_string(&record.author.name))?;
    writeln!(h, "\turi = {}", toml_string(&record.author.uri))?;
    writeln!(h, "\timage = {}", toml_string(&record.author.image.src))?;

    if let Some(thumbnail) = &record.thumbnail {
        let full = thumbnail
            .url
            .replace(&images.thumbnail_size_token, &images.full_size_token);
        writeln!(h, "[image]")?;
        writeln!(h, "\tsrc = {}", toml_string(&full))?;
        writeln!(h, "\tlink = \"\"")?;
        writeln!(h, "\tthumblink = {}", toml_string(&thumbnail.url))?;
        for key in ["alt", "title", "author", "license", "licenseLink"] {
            writeln!(h, "\t{key} = \"\"")?;
        }
    }

    Ok(h)
}

/// Render a comment as a standalone TOML document.
pub fn render_comment(record: &Record) -> Result<String, RenderError> {
    let id = record
        .numeric_id
        .ok_or_else(|| RenderError::MissingId(record.raw_id.clone()))?;
    let title: String = record
        .title
        .chars()
        .filter(|c| !matches!(c, '\n' | '\r'))
        .collect();

    let mut out = String::new();
    writeln!(out, "id = \"{id}\"")?;
    writeln!(out, "date = {}", timestamp(&record.published))?;
    writeln!(out, "updated = {}", timestamp(&record.updated))?;
    writeln!(out, "title = {}", toml_string(&title))?;
    writeln!(out, "content = {}", toml_string(&record.content))?;
    if let Some(reply) = record.reply_target {
        writeln!(out, "reply = {}", toml_id(reply))?;
    }
    writeln!(out, "[author]")?;
    writeln!(out, "\tname = {}", toml_string(&record.author.name))?;
    writeln!(out, "\turi = {}", toml_string(&record.author.uri))?;
    writeln!(out, "[author.image]")?;
    writeln!(out, "\tsource = {}", toml_string(&record.author.image.src))?;
    writeln!(out, "\twidth = {}", toml_string(&record.author.image.width))?;
    writeln!(out, "\theight = {}", toml_string(&record.author.image.height))?;
    Ok(out)
}

/// Quote a value as a TOML basic string.
pub fn toml_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// A numeric ID as a TOML integer, or as a string when it exceeds `i64`.
fn toml_id(id: u64) -> String {
    match i64::try_from(id) {
        Ok(n) => n.to_string(),
        Err(_) => format!("\"{id}\""),
    }
}

fn timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
