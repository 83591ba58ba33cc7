//! Image localization.
//!
//! Finds `<img src="...">` references to external images in a post body,
//! downloads each distinct one into a destination directory and rewrites every
//! quoted attribute value equal to the reference (`src`, and `href` of a
//! wrapping link) to the image's public path. Values that merely start with a
//! reference are not touched.
//!
//! ## Naming
//!
//! The file name is the last URL path segment (query dropped, percent-decoded),
//! with an extension inferred from the `Content-Type` when it has none. When
//! that name is taken:
//!
//! | existing file | result |
//! |---------------|--------|
//! | same bytes | reused, nothing written |
//! | different bytes | `<first 12 hex of SHA-256>-<name>` |
//! | hashed name also taken by other bytes | `<hash>-<n>-<name>` |
//!
//! Names only depend on the downloaded content, so re-running an import yields
//! the same files and the same rewritten bodies.
//!
//! ## Public Paths
//!
//! Rewritten references are relative to the site's static root: the path
//! components after the last `static` directory of the destination.
//! `site/static/img/photo.jpg` becomes `/img/photo.jpg`.
//!
//! ## Parallel Downloads
//!
//! Distinct references of one body are downloaded in parallel using
//! [rayon](https://docs.rs/rayon). Files are then named and written one at a
//! time, in order of first appearance and under a lock, so two downloads can
//! never claim the same name and the outcome does not depend on which
//! download finished first.

use crate::naming;
use rayon::prelude::*;
use regex::{Captures, Regex};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{LazyLock, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Directory name that marks the root of the site's static assets.
pub const STATIC_ROOT: &str = "static";

static IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*?\ssrc\s*=\s*["']([^"']+)["'][^>]*>"#)
        .expect("image pattern must compile")
});

/// A quoted attribute value.
static ATTR_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"=(\s*)(?:"([^"]*)"|'([^']*)')"#).expect("attribute pattern must compile")
});

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server answered with status {0}")]
    Status(u16),
    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum LocalizeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A downloaded resource.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Source of remote resources.
///
/// The production implementation is [`HttpFetcher`]; tests use an in-memory
/// fetcher.
pub trait Fetcher: Sync {
    fn fetch(&self, url: &str) -> Result<Fetched, FetchError>;
}

/// Blocking HTTP fetcher.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(concat!("blogimport/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes()?.to_vec();
        Ok(Fetched {
            bytes,
            content_type,
        })
    }
}

/// An image stored on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedImage {
    /// Reference as it appeared in the content.
    pub source: String,
    /// Public path the reference was rewritten to.
    pub local: String,
    pub path: PathBuf,
    /// An identical file already existed under the chosen name.
    pub reused: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedImage {
    pub source: String,
    pub error: String,
}

/// Result of localizing one body.
#[derive(Debug, Clone, Default)]
pub struct Localized {
    pub content: String,
    pub saved: Vec<SavedImage>,
    pub failed: Vec<FailedImage>,
}

/// Downloads images into one destination directory.
pub struct Localizer<'a, F: Fetcher> {
    fetcher: &'a F,
    dest: PathBuf,
    reserve: Mutex<()>,
}

impl<'a, F: Fetcher> Localizer<'a, F> {
    /// `dest` must exist.
    pub fn new(fetcher: &'a F, dest: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            dest: dest.into(),
            reserve: Mutex::new(()),
        }
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Download every external image of `content` and rewrite its references.
    ///
    /// Failed downloads are logged and their references left untouched.
    pub fn localize(&self, content: &str) -> Localized {
        let references = image_references(content);
        if references.is_empty() {
            return Localized {
                content: content.to_string(),
                ..Localized::default()
            };
        }

        let fetched: Vec<(String, Result<Fetched, FetchError>)> = references
            .into_par_iter()
            .map(|src| {
                // References come from HTML attributes, where `&` is escaped.
                let result = self.fetcher.fetch(&src.replace("&amp;", "&"));
                (src, result)
            })
            .collect();

        let mut localized = Localized::default();
        for (source, result) in fetched {
            let result = result
                .map_err(LocalizeError::from)
                .and_then(|fetched| self.save(&source, fetched));
            match result {
                Ok(saved) => {
                    debug!(src = %saved.source, local = %saved.local, reused = saved.reused, "Localized image");
                    localized.saved.push(saved);
                }
                Err(e) => {
                    warn!(src = %source, error = %e, "Failed to download image");
                    localized.failed.push(FailedImage {
                        source,
                        error: e.to_string(),
                    });
                }
            }
        }

        localized.content = rewrite(content, &localized.saved);
        localized
    }

    fn save(&self, src: &str, fetched: Fetched) -> Result<SavedImage, LocalizeError> {
        let url = src.replace("&amp;", "&");
        let mut name = naming::url_file_name(&url);
        if Path::new(&name).extension().is_none()
            && let Some(ext) = fetched
                .content_type
                .as_deref()
                .and_then(naming::extension_for_content_type)
        {
            name = format!("{name}.{ext}");
        }

        let (path, reused) = self.store(&name, &fetched.bytes)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or(name);

        Ok(SavedImage {
            source: src.to_string(),
            local: public_path(&self.dest, &file_name),
            path,
            reused,
        })
    }

    /// Pick a free (or identical) name for `bytes` and write them.
    fn store(&self, name: &str, bytes: &[u8]) -> io::Result<(PathBuf, bool)> {
        let _guard = self.reserve.lock().unwrap_or_else(PoisonError::into_inner);
        let hash = content_hash(bytes);
        let prefix = &hash[..12];

        let mut attempt = 0u32;
        loop {
            let candidate = match attempt {
                0 => name.to_string(),
                1 => format!("{prefix}-{name}"),
                n => format!("{prefix}-{n}-{name}"),
            };
            let path = self.dest.join(&candidate);
            match std::fs::read(&path) {
                Ok(existing) if existing == bytes => return Ok((path, true)),
                Ok(_) => attempt += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    std::fs::write(&path, bytes)?;
                    return Ok((path, false));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Distinct external (`http`/`https`) image references, in order of first
/// appearance.
pub fn image_references(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    IMG_SRC
        .captures_iter(content)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|src| is_external(src))
        .filter(|src| seen.insert(*src))
        .map(str::to_string)
        .collect()
}

fn is_external(src: &str) -> bool {
    let lower = src.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Replace every attribute value that is exactly a saved reference.
fn rewrite(content: &str, saved: &[SavedImage]) -> String {
    let locals: HashMap<&str, &str> = saved
        .iter()
        .map(|s| (s.source.as_str(), s.local.as_str()))
        .collect();
    ATTR_VALUE
        .replace_all(content, |caps: &Captures| {
            let (value, quote) = match (caps.get(2), caps.get(3)) {
                (Some(v), _) => (v.as_str(), '"'),
                (None, Some(v)) => (v.as_str(), '\''),
                (None, None) => return caps[0].to_string(),
            };
            match locals.get(value) {
                Some(local) => format!("={}{quote}{local}{quote}", &caps[1]),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Path of `file_name` in `dest`, as seen from the site's static root.
pub fn public_path(dest: &Path, file_name: &str) -> String {
    let components: Vec<String> = dest
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    let below_root = components
        .iter()
        .rposition(|c| c == STATIC_ROOT)
        .map(|pos| &components[pos + 1..])
        .unwrap_or_default();

    let mut path = String::new();
    for component in below_root {
        path.push('/');
        path.push_str(component);
    }
    path.push('/');
    path.push_str(file_name);
    path
}

/// SHA-256 of `bytes` as a hex string.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
