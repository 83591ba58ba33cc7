//! Comment hierarchy: linking and flattening.
//!
//! Stage 3 of the import pipeline. Comments are attached to their parent
//! (a post, or another comment they reply to) by pushing their index onto the
//! parent's `children`. Each post's subtree is then flattened into the order
//! comments are displayed in: siblings by publish time, every comment
//! immediately followed by its own replies.
//!
//! ```text
//! post                         flattened: c1, c3, c4, c2
//! ├── c1 (09:00)
//! │   ├── c4 (11:00)
//! │   └── c3 (10:00)  ← sorted before c4
//! └── c2 (09:30)
//! ```
//!
//! The tree is index-based: records live in one flat list and refer to each
//! other by position. Flattening walks an explicit stack, so reply chains of
//! any depth are fine, and a visited set turns a cyclic export into an error.

use crate::resolve::Resolution;
use crate::types::Record;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TreeError {
    #[error("Entry {index} replies to entry ID {parent}, which does not exist in the export")]
    MissingParent { index: usize, parent: u64 },
    #[error("Entry {index} is its own ancestor; the reply chain is cyclic")]
    Cycle { index: usize },
}

/// Outcome of linking comments to their parents.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LinkReport {
    /// Comments attached to a parent, in export order.
    pub linked: Vec<usize>,
    /// Comments with no parent reference at all (parent was deleted).
    pub orphaned: Vec<usize>,
}

/// Attach every comment to its parent's `children`.
///
/// The parent is the comment's `reply_target` (a reply to another comment),
/// falling back to the numeric tail of its `in-reply-to` source (the post).
/// A parent ID that resolves to nothing means the export is inconsistent and
/// aborts linking.
pub fn link_comments(
    records: &mut [Record],
    resolution: &Resolution,
) -> Result<LinkReport, TreeError> {
    let mut report = LinkReport::default();

    for k in 0..records.len() {
        if !records[k].is_comment() {
            continue;
        }

        let Some(parent) = parent_id(&records[k]) else {
            warn!(entry = k, raw_id = %records[k].raw_id, "Skipping deleted comment");
            report.orphaned.push(k);
            continue;
        };

        let Some(parent_index) = resolution.lookup(parent) else {
            return Err(TreeError::MissingParent { index: k, parent });
        };

        records[parent_index].children.push(k);
        report.linked.push(k);
    }

    debug!(
        linked = report.linked.len(),
        orphaned = report.orphaned.len(),
        "Linked comments"
    );
    Ok(report)
}

fn parent_id(record: &Record) -> Option<u64> {
    record.reply_target.or_else(|| {
        record
            .reply_source
            .as_ref()
            .and_then(|s| crate::naming::numeric_tail(&s.source))
    })
}

/// Flatten the comment subtree below `root` into display order.
///
/// Sorts every visited `children` list in place by `published` (stable, so
/// ties keep export order) and returns the indices of all descendants,
/// depth-first, each parent before its replies.
pub fn flatten_comments(records: &mut [Record], root: usize) -> Result<Vec<usize>, TreeError> {
    let mut order = Vec::new();
    let mut visited = HashSet::from([root]);
    let mut stack: Vec<usize> = Vec::new();

    sort_children(records, root);
    stack.extend(records[root].children.iter().rev());

    while let Some(k) = stack.pop() {
        if !visited.insert(k) {
            return Err(TreeError::Cycle { index: k });
        }
        order.push(k);
        sort_children(records, k);
        stack.extend(records[k].children.iter().rev());
    }

    Ok(order)
}

fn sort_children(records: &mut [Record], k: usize) {
    let mut children = std::mem::take(&mut records[k].children);
    children.sort_by_key(|&c| records[c].published);
    records[k].children = children;
}

/// Flatten a post's comments and store their numeric IDs as `comment_order`.
pub fn assign_comment_order(records: &mut [Record], post: usize) -> Result<(), TreeError> {
    let order = flatten_comments(records, post)?;
    records[post].comment_order = order.iter().filter_map(|&c| records[c].numeric_id).collect();
    Ok(())
}
