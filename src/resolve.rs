//! Identifier resolution.
//!
//! Stage 2 of the import pipeline. Gives every post and comment its numeric ID,
//! infers reply targets and slugs from outbound links, and builds the
//! [`Resolution`] map that the linking stage consumes.
//!
//! Resolution must finish for the whole record list before any linking
//! happens: a comment may reference a post that appears later in the export.
//! The linking stage therefore takes a `&Resolution`, which only exists once
//! this stage has returned.
//!
//! ## Link Inference
//!
//! | `rel` | effect |
//! |-------|--------|
//! | `related` | `reply_target` = numeric tail of `href` (reply to a comment) |
//! | `replies` | `slug` = permalink stem of `href` (feed-typed links skipped) |
//!
//! When several links of the same relation are present the last one wins.

use crate::naming;
use crate::types::Record;
use std::collections::HashMap;
use tracing::warn;

const FEED_MEDIA_TYPE: &str = "application/atom+xml";

/// Two records claiming the same numeric ID. The first one keeps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdCollision {
    pub id: u64,
    pub kept: usize,
    pub ignored: usize,
}

/// Numeric ID → record index, restricted to posts and comments.
#[derive(Debug, Default)]
pub struct Resolution {
    index: HashMap<u64, usize>,
    /// Posts and comments whose raw ID carried no parsable number.
    pub unparsable: Vec<usize>,
    pub collisions: Vec<IdCollision>,
}

impl Resolution {
    /// Record index holding a numeric ID.
    pub fn lookup(&self, id: u64) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Resolve numeric IDs, reply targets and slugs for all linkable records.
///
/// Records classified as [`Role::Other`](crate::types::Role::Other) are left
/// untouched and never enter the map.
pub fn resolve(records: &mut [Record]) -> Resolution {
    let mut resolution = Resolution::default();

    for (k, record) in records.iter_mut().enumerate() {
        if !record.role.is_linkable() {
            continue;
        }

        match naming::numeric_id(&record.raw_id) {
            Some(id) => {
                record.numeric_id = Some(id);
                if let Some(&kept) = resolution.index.get(&id) {
                    warn!(id, kept, ignored = k, "Duplicate entry ID");
                    resolution.collisions.push(IdCollision {
                        id,
                        kept,
                        ignored: k,
                    });
                } else {
                    resolution.index.insert(id, k);
                }
            }
            None => {
                warn!(entry = k, raw_id = %record.raw_id, "Can't parse entry ID");
                resolution.unparsable.push(k);
            }
        }

        infer_from_links(record);
    }

    resolution
}

fn infer_from_links(record: &mut Record) {
    for link in &record.links {
        if link.rel.eq_ignore_ascii_case("related") {
            record.reply_target = naming::numeric_tail(&link.href);
        } else if link.rel.eq_ignore_ascii_case("replies")
            && !link.media_type.eq_ignore_ascii_case(FEED_MEDIA_TYPE)
        {
            if let Some(slug) = naming::link_stem(&link.href) {
                record.slug = Some(slug);
            }
        }
    }
}
