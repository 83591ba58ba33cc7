//! # blogimport
//!
//! Converts a Blogger Atom export into content files for a static site
//! generator: one file per post with TOML frontmatter between `+++` lines,
//! optionally one TOML file per comment, images downloaded next to the site,
//! and bodies converted to Markdown.
//!
//! # Architecture: Staged Pipeline
//!
//! The export is a flat list of entries: posts, comments, templates and
//! settings, in no particular order. Each stage works over the whole list and
//! finishes before the next one starts:
//!
//! ```text
//! 1. Parse      export.xml →  Vec<Record>      (each record classified once)
//! 2. Resolve    records    →  Resolution       (numeric ID → index, slugs)
//! 3. Link       records    →  children lists   (comment → parent)
//! 4. Flatten    per post   →  comment order    (by time, replies nested)
//! 5. Write      per post   →  <slug>.md        (localize, convert, render)
//! ```
//!
//! Resolution has to cover the whole export before linking: a comment can
//! point at a post that appears further down. The linking stage therefore
//! takes the [`resolve::Resolution`] as an explicit argument.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`parse`] | Stage 1: reads the Atom export into records |
//! | [`classify`] | Post / comment / other, from the kind category |
//! | [`resolve`] | Stage 2: numeric IDs, reply targets and slugs |
//! | [`tree`] | Stages 3 and 4: links comments and flattens each post's thread |
//! | [`localize`] | Downloads referenced images and rewrites their URLs |
//! | [`convert`] | Optional HTML → Markdown conversion of post bodies |
//! | [`render`] | TOML frontmatter for posts and comments |
//! | [`import`] | Runs the stages and writes the output |
//! | [`config`] | `blogimport.toml` loading, validation and merging |
//! | [`types`] | The shared [`types::Record`] and its parts |
//! | [`naming`] | Slugs, numeric IDs and file names |
//! | [`fs_utils`] | Directory creation and whole-file writes |
//! | [`output`] | CLI output formatting for `import` and `check` |
//!
//! # Design Decisions
//!
//! ## Indices, Not References
//!
//! Records never point at each other. A comment's parent is looked up by
//! numeric ID in the [`resolve::Resolution`], and a parent's replies are kept
//! as indices into the record list. Flattening walks those indices with an
//! explicit stack, so reply chains of any depth are fine and a cycle in a
//! broken export is reported instead of looping forever.
//!
//! ## Deterministic Image Names
//!
//! When two posts embed different images with the same file name, the second
//! one is stored under a prefix taken from its content hash. Identical content
//! is never stored twice. Running the same import twice produces the same
//! files, byte for byte.
//!
//! ## Frontmatter Without Templates
//!
//! [`render`] writes each frontmatter field explicitly, with its emission
//! condition next to it, and parses the result back with `toml` before
//! anything is written. Values injected through `extra` cannot silently
//! produce a header the site generator rejects.

pub mod classify;
pub mod config;
pub mod convert;
pub mod fs_utils;
pub mod import;
pub mod localize;
pub mod naming;
pub mod output;
pub mod parse;
pub mod render;
pub mod resolve;
pub mod tree;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
