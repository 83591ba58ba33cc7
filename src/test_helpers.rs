//! Shared test utilities for the blogimport test suite.
//!
//! Record constructors for the in-memory stages, an [`EntryXml`] builder for
//! export documents, and a [`MockFetcher`] standing in for the network.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let xml = feed(&[
//!     EntryXml::post(1, "Hello").label("rust").to_xml(),
//!     EntryXml::comment(10, 1).published("2014-01-02T09:00:00.000Z").to_xml(),
//! ]);
//! let records = parse_export(&xml).unwrap();
//! ```

use crate::localize::{FetchError, Fetched, Fetcher};
use crate::types::{
    KIND_COMMENT, KIND_POST, KIND_SCHEME, LABEL_SCHEME, Link, Record, ReplySource, Role, Tag,
    Timestamp,
};
use chrono::DateTime;
use std::collections::HashMap;
use std::sync::Mutex;

const BLOG_ID: &str = "1";

/// Raw tag URI of an entry.
pub fn raw_id(id: u64) -> String {
    format!("tag:blogger.com,1999:blog-{BLOG_ID}.post-{id}")
}

/// Feed URL of an entry, the form used by `in-reply-to` sources and
/// `related` links.
pub fn feed_url(id: u64) -> String {
    format!("http://www.blogger.com/feeds/{BLOG_ID}/posts/default/{id}")
}

/// Parse an RFC 3339 timestamp. Panics on bad input.
pub fn ts(value: &str) -> Timestamp {
    DateTime::parse_from_rfc3339(value)
        .unwrap_or_else(|e| panic!("bad test timestamp {value:?}: {e}"))
}

// =========================================================================
// Records
// =========================================================================

/// A blank record with the given role.
pub fn record(role: Role) -> Record {
    Record {
        raw_id: String::new(),
        numeric_id: None,
        published: Timestamp::default(),
        updated: Timestamp::default(),
        is_draft: false,
        title: String::new(),
        content: String::new(),
        tags: Vec::new(),
        author: Default::default(),
        thumbnail: None,
        reply_source: None,
        links: Vec::new(),
        role,
        reply_target: None,
        children: Vec::new(),
        comment_order: Vec::new(),
        slug: None,
        extra_metadata: String::new(),
    }
}

pub fn record_with_id(role: Role, raw: &str) -> Record {
    Record {
        raw_id: raw.to_string(),
        ..record(role)
    }
}

/// An unresolved post.
pub fn post_record(id: u64) -> Record {
    Record {
        tags: vec![Tag::new(KIND_POST, KIND_SCHEME)],
        ..record_with_id(Role::Post, &raw_id(id))
    }
}

/// An unresolved comment whose `in-reply-to` points at `parent`.
pub fn comment_record(id: u64, parent: u64) -> Record {
    Record {
        tags: vec![Tag::new(KIND_COMMENT, KIND_SCHEME)],
        reply_source: Some(ReplySource {
            reference: raw_id(parent),
            href: format!("http://b.blogspot.com/p/{parent}.html"),
            source: feed_url(parent),
        }),
        ..record_with_id(Role::Comment, &raw_id(id))
    }
}

/// A `related` link naming the entry a comment replies to.
pub fn related(id: u64) -> Link {
    Link {
        rel: "related".into(),
        href: feed_url(id),
        media_type: "application/atom+xml".into(),
    }
}

// =========================================================================
// Export documents
// =========================================================================

/// Builder for one `<entry>` of an export.
#[derive(Debug, Clone)]
pub struct EntryXml {
    id: String,
    kind: String,
    title: String,
    content: Option<String>,
    published: String,
    updated: String,
    draft: Option<String>,
    labels: Vec<String>,
    links: Vec<(String, String, String)>,
    thumbnail: Option<String>,
    author: (String, String, String),
    reply_to: Option<u64>,
}

impl EntryXml {
    fn new(id: String, kind: &str, title: &str) -> Self {
        Self {
            id,
            kind: kind.to_string(),
            title: title.to_string(),
            content: None,
            published: "2014-01-01T00:00:00.000Z".into(),
            updated: "2014-01-01T00:00:00.000Z".into(),
            draft: None,
            labels: Vec::new(),
            links: Vec::new(),
            thumbnail: None,
            author: ("Anonymous".into(), String::new(), String::new()),
            reply_to: None,
        }
    }

    pub fn post(id: u64, title: &str) -> Self {
        Self::new(raw_id(id), KIND_POST, title)
    }

    /// A comment replying to post `parent`.
    pub fn comment(id: u64, parent: u64) -> Self {
        Self {
            reply_to: Some(parent),
            ..Self::new(raw_id(id), KIND_COMMENT, "")
        }
    }

    /// An entry of arbitrary kind, e.g. a template or setting.
    pub fn other(raw: &str, kind: &str) -> Self {
        Self::new(raw.to_string(), kind, "")
    }

    /// Content as it appears inside `<content>`; pass escaped HTML.
    pub fn content(mut self, escaped: &str) -> Self {
        self.content = Some(escaped.to_string());
        self
    }

    /// Content emitted without any processing, e.g. a CDATA section.
    pub fn raw_content(self, raw: &str) -> Self {
        self.content(raw)
    }

    /// Content given as plain HTML, escaped here.
    pub fn html(self, html: &str) -> Self {
        let escaped = escape(html);
        self.content(&escaped)
    }

    pub fn label(mut self, name: &str) -> Self {
        self.labels.push(name.to_string());
        self
    }

    pub fn published(mut self, value: &str) -> Self {
        self.published = value.to_string();
        self
    }

    pub fn updated(mut self, value: &str) -> Self {
        self.updated = value.to_string();
        self
    }

    pub fn draft(mut self, value: &str) -> Self {
        self.draft = Some(value.to_string());
        self
    }

    pub fn link(mut self, rel: &str, media_type: &str, href: &str) -> Self {
        self.links
            .push((rel.to_string(), media_type.to_string(), href.to_string()));
        self
    }

    /// A `related` link marking this comment as a reply to comment `id`.
    pub fn replying_to(self, id: u64) -> Self {
        let href = feed_url(id);
        self.link("related", "application/atom+xml", &href)
    }

    pub fn thumbnail(mut self, url: &str) -> Self {
        self.thumbnail = Some(url.to_string());
        self
    }

    pub fn author(mut self, name: &str, uri: &str, image: &str) -> Self {
        self.author = (name.to_string(), uri.to_string(), image.to_string());
        self
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<entry>");
        xml.push_str(&format!("<id>{}</id>", escape(&self.id)));
        xml.push_str(&format!("<published>{}</published>", self.published));
        xml.push_str(&format!("<updated>{}</updated>", self.updated));
        if let Some(draft) = &self.draft {
            xml.push_str(&format!("<app:control><app:draft>{draft}</app:draft></app:control>"));
        }
        xml.push_str(&format!(
            "<category scheme='{KIND_SCHEME}' term='{}'/>",
            escape(&self.kind)
        ));
        for label in &self.labels {
            xml.push_str(&format!(
                "<category scheme='{LABEL_SCHEME}' term='{}'/>",
                escape(label)
            ));
        }
        xml.push_str(&format!("<title type='text'>{}</title>", escape(&self.title)));
        if let Some(content) = &self.content {
            xml.push_str(&format!("<content type='html'>{content}</content>"));
        }
        for (rel, media_type, href) in &self.links {
            xml.push_str(&format!(
                "<link rel='{rel}' type='{media_type}' href='{}'/>",
                escape(href)
            ));
        }
        let (name, uri, image) = &self.author;
        xml.push_str(&format!("<author><name>{}</name>", escape(name)));
        if !uri.is_empty() {
            xml.push_str(&format!("<uri>{}</uri>", escape(uri)));
        }
        if !image.is_empty() {
            xml.push_str(&format!(
                "<gd:image rel='http://schemas.google.com/g/2005#thumbnail' width='16' height='16' src='{}'/>",
                escape(image)
            ));
        }
        xml.push_str("</author>");
        if let Some(url) = &self.thumbnail {
            xml.push_str(&format!(
                "<media:thumbnail url='{}' height='72' width='72'/>",
                escape(url)
            ));
        }
        if let Some(parent) = self.reply_to {
            xml.push_str(&format!(
                "<thr:in-reply-to ref='{}' href='http://b.blogspot.com/p/{parent}.html' source='{}' type='text/html'/>",
                raw_id(parent),
                feed_url(parent)
            ));
        }
        xml.push_str("</entry>");
        xml
    }
}

/// Wrap entries in a `<feed>` document with the namespaces exports declare.
pub fn feed(entries: &[String]) -> String {
    let mut xml = String::from(
        "<?xml version='1.0' encoding='UTF-8'?>\
         <feed xmlns='http://www.w3.org/2005/Atom' \
         xmlns:openSearch='http://a9.com/-/spec/opensearchrss/1.0/' \
         xmlns:gd='http://schemas.google.com/g/2005' \
         xmlns:thr='http://purl.org/syndication/thread/1.0' \
         xmlns:georss='http://www.georss.org/georss' \
         xmlns:media='http://search.yahoo.com/mrss/' \
         xmlns:app='http://purl.org/atom/app#'>\
         <id>tag:blogger.com,1999:blog-1.archive</id>\
         <title type='text'>Test Blog</title>",
    );
    for entry in entries {
        xml.push_str(entry);
    }
    xml.push_str("</feed>");
    xml
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&apos;")
        .replace('"', "&quot;")
}

// =========================================================================
// Network
// =========================================================================

/// In-memory [`Fetcher`] that records every request.
///
/// Unknown URLs answer 404; URLs registered with [`failing`](Self::failing)
/// fail like a dropped connection.
#[derive(Default)]
pub struct MockFetcher {
    responses: HashMap<String, Option<Fetched>>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, bytes: &[u8], content_type: Option<&str>) -> Self {
        self.responses.insert(
            url.to_string(),
            Some(Fetched {
                bytes: bytes.to_vec(),
                content_type: content_type.map(str::to_string),
            }),
        );
        self
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.responses.insert(url.to_string(), None);
        self
    }

    /// Every URL fetched so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.responses.get(url) {
            Some(Some(fetched)) => Ok(fetched.clone()),
            Some(None) => Err(FetchError::Other(format!("connection to {url} refused"))),
            None => Err(FetchError::Status(404)),
        }
    }
}
