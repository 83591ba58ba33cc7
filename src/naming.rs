//! Centralized name derivation for identifiers, slugs and file names.
//!
//! The export identifies things in several inconsistent ways: tag URIs
//! (`tag:blogger.com,1999:blog-1.post-42`), feed URLs whose last segment is a
//! numeric ID (`.../posts/default/42`), permalinks whose last segment is the
//! post slug (`.../2014/03/my-post.html`) and image URLs. Every stage derives
//! names through this module so the rules stay consistent.
//!
//! ## Slugs
//!
//! Title-derived slugs keep letters, digits, `.`, `_` and `-`, with spaces
//! turned into dashes and everything lowercased:
//! - `"Social Media"` → `"social-media"`
//! - `"  Ça va? Oui!  "` → `"ça-va-oui"`

/// Marker that precedes the numeric part of an entry ID.
pub const ID_MARKER: &str = "post-";

/// Build a filesystem-safe slug from a title.
pub fn slugify(title: &str) -> String {
    title
        .trim()
        .replace(' ', "-")
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}

/// Parse the numeric ID that follows the last [`ID_MARKER`] of an entry ID.
///
/// - `"tag:blogger.com,1999:blog-7.post-123"` → `Some(123)`
/// - `"tag:blogger.com,1999:blog-7.layout"` → `None` (no marker)
/// - `"tag:blogger.com,1999:blog-7.post-abc"` → `None`
pub fn numeric_id(raw_id: &str) -> Option<u64> {
    let pos = raw_id.rfind(ID_MARKER)?;
    raw_id[pos + ID_MARKER.len()..].parse().ok()
}

/// Parse the last path segment of a reference as a numeric ID.
///
/// Zero is not a valid entry ID and yields `None`.
///
/// - `"http://www.blogger.com/feeds/1/posts/default/42"` → `Some(42)`
/// - `"http://example.com/2014/03/post.html"` → `None`
pub fn numeric_tail(reference: &str) -> Option<u64> {
    last_segment(reference)
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
}

/// Slug carried by a permalink: last segment without query, fragment or
/// extension.
///
/// - `"http://b.blogspot.com/2014/03/my-post.html#comment-form"` → `Some("my-post")`
/// - `"http://b.blogspot.com/"` → `None`
pub fn link_stem(href: &str) -> Option<String> {
    let segment = strip_query(last_segment(href));
    let stem = match segment.rfind('.') {
        Some(dot) if dot > 0 => &segment[..dot],
        _ => segment,
    };
    (!stem.is_empty()).then(|| stem.to_string())
}

/// Local file name for a downloaded resource.
///
/// Takes the last path segment, drops the query string and percent-decodes
/// it. Path separators produced by decoding are replaced with dashes.
/// Falls back to `"image"` when the URL has no usable segment.
///
/// - `"https://host/a/My%20Photo.jpg?w=200"` → `"My Photo.jpg"`
/// - `"https://host/a/b/"` → `"image"`
pub fn url_file_name(url: &str) -> String {
    let raw = match url::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string(),
        Err(_) => strip_query(last_segment(url)).to_string(),
    };
    let decoded = urlencoding::decode(&raw)
        .map(|s| s.into_owned())
        .unwrap_or(raw);
    let cleaned: String = decoded
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
        .collect();
    let cleaned = cleaned.trim().trim_matches('.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

/// File extension implied by an `image/*` content type.
///
/// - `"image/png"` → `Some("png")`
/// - `"image/jpeg; charset=binary"` → `Some("jpg")`
/// - `"image/svg+xml"` → `Some("svg")`
/// - `"text/html"` → `None`
pub fn extension_for_content_type(content_type: &str) -> Option<String> {
    let subtype = content_type
        .split(';')
        .next()?
        .trim()
        .to_ascii_lowercase()
        .strip_prefix("image/")?
        .to_string();
    let subtype = subtype.split('+').next().unwrap_or_default();
    match subtype {
        "" => None,
        "jpeg" | "pjpeg" => Some("jpg".to_string()),
        other => Some(other.to_string()),
    }
}

fn last_segment(reference: &str) -> &str {
    let trimmed = reference.trim();
    match trimmed.rfind('/') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

fn strip_query(segment: &str) -> &str {
    match segment.find(['?', '#']) {
        Some(pos) => &segment[..pos],
        None => segment,
    }
}
