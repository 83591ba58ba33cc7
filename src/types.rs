//! Shared types used across all pipeline stages.
//!
//! A [`Record`] is created once by [`parse`](crate::parse) and then mutated in
//! place by the later stages (resolve → link → flatten → localize). Records
//! refer to each other by their position in the record list, never by
//! reference.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Scheme of the category tag that carries a record's kind.
pub const KIND_SCHEME: &str = "http://schemas.google.com/g/2005#kind";
/// Kind value of a blog post.
pub const KIND_POST: &str = "http://schemas.google.com/blogger/2008/kind#post";
/// Kind value of a comment.
pub const KIND_COMMENT: &str = "http://schemas.google.com/blogger/2008/kind#comment";
/// Scheme of user-facing blog labels (rendered as `tags`).
pub const LABEL_SCHEME: &str = "http://www.blogger.com/atom/ns#";

/// Timestamps keep the zone offset they were exported with.
pub type Timestamp = DateTime<FixedOffset>;

/// What a record is. Decided once, when the record is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Post,
    Comment,
    /// Templates, settings, pages and anything else the export carries.
    Other,
}

impl Role {
    /// Posts and comments take part in ID resolution and linking.
    pub fn is_linkable(self) -> bool {
        matches!(self, Role::Post | Role::Comment)
    }
}

/// A `(term, scheme)` category pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub name: String,
    pub scheme: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scheme: scheme.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthorImage {
    pub src: String,
    pub width: String,
    pub height: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Author {
    pub name: String,
    pub uri: String,
    pub image: AuthorImage,
}

/// `media:thumbnail` of a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Thumbnail {
    pub url: String,
}

/// An outbound `<link>` of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
    /// The link's `type` attribute, empty if absent.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub media_type: String,
}

/// `thr:in-reply-to` of a comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplySource {
    /// The `ref` attribute (tag URI of the replied-to post).
    pub reference: String,
    pub href: String,
    /// Feed URL of the replied-to entry; its last segment is a numeric ID.
    pub source: String,
}

/// One entry of the export.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub raw_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_id: Option<u64>,
    pub published: Timestamp,
    pub updated: Timestamp,
    pub is_draft: bool,
    pub title: String,
    #[serde(skip)]
    pub content: String,
    pub tags: Vec<Tag>,
    pub author: Author,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Thumbnail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_source: Option<ReplySource>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    pub role: Role,
    /// Numeric ID of the entry this one replies to, inferred from a
    /// `related` link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_target: Option<u64>,
    /// Indices of direct replies. Filled by [`crate::tree::link_comments`].
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<usize>,
    /// Numeric IDs of every comment below a post, in display order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comment_order: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip)]
    pub extra_metadata: String,
}

impl Record {
    pub fn is_post(&self) -> bool {
        self.role == Role::Post
    }

    pub fn is_comment(&self) -> bool {
        self.role == Role::Comment
    }

    /// Blog labels, i.e. the tags rendered into frontmatter.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .filter(|t| t.scheme == LABEL_SCHEME)
            .map(|t| t.name.as_str())
    }
}
