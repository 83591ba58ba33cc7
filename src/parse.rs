//! Export parsing.
//!
//! Stage 1 of the import pipeline. Reads a Blogger Atom export and produces the
//! flat record list every later stage works on.
//!
//! ## Input Shape
//!
//! ```text
//! <feed xmlns="http://www.w3.org/2005/Atom" ...>
//!   <entry>
//!     <id>tag:blogger.com,1999:blog-1.post-42</id>
//!     <published>2014-03-02T10:20:30.000-08:00</published>
//!     <updated>2014-03-03T08:00:00.000-08:00</updated>
//!     <app:control><app:draft>no</app:draft></app:control>
//!     <category scheme="http://schemas.google.com/g/2005#kind"
//!               term="http://schemas.google.com/blogger/2008/kind#post"/>
//!     <title type="text">Hello</title>
//!     <content type="html">&lt;p&gt;Hi&lt;/p&gt;</content>
//!     <link rel="replies" type="text/html" href=".../hello.html#comment-form"/>
//!     <author><name>Ann</name><uri>...</uri><gd:image src="..."/></author>
//!     <media:thumbnail url="..."/>
//!     <thr:in-reply-to ref="..." href="..." source=".../posts/default/42"/>
//!   </entry>
//! </feed>
//! ```
//!
//! Elements are matched by local name, so namespace prefixes do not matter.
//! Each record is classified as soon as its tags are known.

use crate::classify::classify;
use crate::types::{Author, AuthorImage, Link, Record, ReplySource, Tag, Thumbnail, Timestamp};
use chrono::DateTime;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Document has no root element")]
    Empty,
    #[error("Document root is <{0}>, expected <feed>")]
    NotAFeed(String),
    #[error("Document ends inside entry {0}")]
    Truncated(usize),
    #[error("Entry {index}: invalid {field} timestamp {value:?}")]
    InvalidTimestamp {
        index: usize,
        field: &'static str,
        value: String,
    },
    #[error("Entry {index}: unknown value for draft flag: {value:?}")]
    InvalidDraft { index: usize, value: String },
}

/// Exported timestamps carry milliseconds and a zone offset.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";

/// Read and parse an export file.
pub fn read_export(path: &Path) -> Result<Vec<Record>, ParseError> {
    let xml = std::fs::read_to_string(path)?;
    parse_export(&xml)
}

/// Parse an export document into records, in document order.
pub fn parse_export(xml: &str) -> Result<Vec<Record>, ParseError> {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut records = Vec::new();
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut entry: Option<EntryBuilder> = None;
    let mut capture: Option<(Field, usize)> = None;
    let mut text = String::new();
    let mut seen_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                check_root(&e, &mut seen_root)?;
                let name = e.local_name().as_ref().to_vec();
                if let Some(builder) = entry.as_mut() {
                    let parent = stack.last().map(Vec::as_slice).unwrap_or_default();
                    builder.attributes(parent, &name, &e);
                    if capture.is_none()
                        && let Some(field) = Field::for_element(parent, &name, stack.len() == 2)
                    {
                        capture = Some((field, stack.len() + 1));
                        text.clear();
                    }
                } else if name == b"entry" && stack.len() == 1 {
                    entry = Some(EntryBuilder::default());
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                check_root(&e, &mut seen_root)?;
                if let Some(builder) = entry.as_mut() {
                    let parent = stack.last().map(Vec::as_slice).unwrap_or_default();
                    builder.attributes(parent, e.local_name().as_ref(), &e);
                }
            }
            Event::Text(t) => {
                if capture.is_some() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if capture.is_some() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                let depth = stack.len();
                if let Some((field, at)) = capture
                    && at == depth
                {
                    if let Some(builder) = entry.as_mut() {
                        builder.set(field, std::mem::take(&mut text));
                    }
                    capture = None;
                }
                let name = stack.pop().unwrap_or_default();
                if name == b"entry" && stack.len() == 1 {
                    if let Some(builder) = entry.take() {
                        let record = builder.finish(records.len())?;
                        records.push(record);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(ParseError::Empty);
    }
    if entry.is_some() {
        return Err(ParseError::Truncated(records.len()));
    }
    Ok(records)
}

fn check_root(e: &BytesStart<'_>, seen_root: &mut bool) -> Result<(), ParseError> {
    if *seen_root {
        return Ok(());
    }
    *seen_root = true;
    let name = e.local_name();
    if name.as_ref() != b"feed" {
        return Err(ParseError::NotAFeed(
            String::from_utf8_lossy(name.as_ref()).into_owned(),
        ));
    }
    Ok(())
}

/// Text-bearing elements of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Published,
    Updated,
    Draft,
    Title,
    Content,
    AuthorName,
    AuthorUri,
}

impl Field {
    fn for_element(parent: &[u8], name: &[u8], entry_child: bool) -> Option<Field> {
        if entry_child {
            return match name {
                b"id" => Some(Field::Id),
                b"published" => Some(Field::Published),
                b"updated" => Some(Field::Updated),
                b"title" => Some(Field::Title),
                b"content" => Some(Field::Content),
                _ => None,
            };
        }
        match (parent, name) {
            (b"control", b"draft") => Some(Field::Draft),
            (b"author", b"name") => Some(Field::AuthorName),
            (b"author", b"uri") => Some(Field::AuthorUri),
            _ => None,
        }
    }
}

#[derive(Default)]
struct EntryBuilder {
    id: String,
    published: String,
    updated: String,
    draft: String,
    title: String,
    content: String,
    tags: Vec<Tag>,
    author: Author,
    thumbnail: Option<Thumbnail>,
    reply_source: Option<ReplySource>,
    links: Vec<Link>,
}

impl EntryBuilder {
    fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Id => self.id = value.trim().to_string(),
            Field::Published => self.published = value,
            Field::Updated => self.updated = value,
            Field::Draft => self.draft = value,
            Field::Title => self.title = value,
            Field::Content => self.content = value,
            Field::AuthorName => self.author.name = value,
            Field::AuthorUri => self.author.uri = value,
        }
    }

    /// Collect attribute-only data from an element inside the entry.
    fn attributes(&mut self, parent: &[u8], name: &[u8], e: &BytesStart<'_>) {
        match (parent, name) {
            (b"entry", b"category") => self.tags.push(Tag {
                name: attr(e, b"term"),
                scheme: attr(e, b"scheme"),
            }),
            (b"entry", b"link") => self.links.push(Link {
                rel: attr(e, b"rel"),
                href: attr(e, b"href"),
                media_type: attr(e, b"type"),
            }),
            (b"entry", b"thumbnail") => {
                let url = attr(e, b"url");
                if !url.is_empty() {
                    self.thumbnail = Some(Thumbnail { url });
                }
            }
            (b"entry", b"in-reply-to") => {
                self.reply_source = Some(ReplySource {
                    reference: attr(e, b"ref"),
                    href: attr(e, b"href"),
                    source: attr(e, b"source"),
                });
            }
            (b"author", b"image") => {
                self.author.image = AuthorImage {
                    src: attr(e, b"src"),
                    width: attr(e, b"width"),
                    height: attr(e, b"height"),
                };
            }
            _ => {}
        }
    }

    fn finish(self, index: usize) -> Result<Record, ParseError> {
        let published = parse_timestamp(&self.published, index, "published")?;
        let updated = parse_timestamp(&self.updated, index, "updated")?;
        let is_draft = match self.draft.trim() {
            "yes" => true,
            "no" | "" => false,
            other => {
                return Err(ParseError::InvalidDraft {
                    index,
                    value: other.to_string(),
                });
            }
        };
        let role = classify(&self.tags);

        Ok(Record {
            raw_id: self.id,
            numeric_id: None,
            published,
            updated,
            is_draft,
            title: self.title,
            content: self.content,
            tags: self.tags,
            author: self.author,
            thumbnail: self.thumbnail,
            reply_source: self.reply_source,
            links: self.links,
            role,
            reply_target: None,
            children: Vec::new(),
            comment_order: Vec::new(),
            slug: None,
            extra_metadata: String::new(),
        })
    }
}

/// Unescaped value of a local-named attribute, empty if absent.
fn attr(e: &BytesStart<'_>, key: &[u8]) -> String {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
        .unwrap_or_default()
}

/// Absent timestamps default to the Unix epoch.
fn parse_timestamp(value: &str, index: usize, field: &'static str) -> Result<Timestamp, ParseError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(Timestamp::default());
    }
    DateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .map_err(|_| ParseError::InvalidTimestamp {
            index,
            field,
            value: value.to_string(),
        })
}
