//! Record classification by kind tag.
//!
//! Every export entry carries a category whose scheme is [`KIND_SCHEME`]; its
//! term says whether the entry is a post, a comment, or something else
//! (template, settings, page). When several kind tags are present the first
//! one wins.

use crate::types::{KIND_COMMENT, KIND_POST, KIND_SCHEME, Role, Tag};

/// Decide the role of a record from its tags.
pub fn classify(tags: &[Tag]) -> Role {
    match tags.iter().find(|t| t.scheme == KIND_SCHEME) {
        Some(tag) if tag.name == KIND_POST => Role::Post,
        Some(tag) if tag.name == KIND_COMMENT => Role::Comment,
        _ => Role::Other,
    }
}
