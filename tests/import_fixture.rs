//! End-to-end import of `fixtures/export.xml` through the public API.

use blogimport::config::ImportConfig;
use blogimport::convert::MarkdownConverter;
use blogimport::import::{analyze, import_with};
use blogimport::localize::{FetchError, Fetched, Fetcher, content_hash};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const RIDGE: &str = "http://1.bp.blogspot.com/ridge/s320/ridge.jpg";
const GEAR: &str = "http://2.bp.blogspot.com/gear/s400/ridge.jpg";
const GONE: &str = "http://3.bp.blogspot.com/missing/s400/gone.png";

/// Serves a fixed set of images; everything else is a 404.
struct StubFetcher {
    images: HashMap<&'static str, &'static [u8]>,
}

impl StubFetcher {
    fn new() -> Self {
        Self {
            images: HashMap::from([
                (RIDGE, b"ridge photo".as_slice()),
                (GEAR, b"gear photo".as_slice()),
            ]),
        }
    }
}

impl Fetcher for StubFetcher {
    fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
        match self.images.get(url) {
            Some(bytes) => Ok(Fetched {
                bytes: bytes.to_vec(),
                content_type: Some("image/jpeg".into()),
            }),
            None => Err(FetchError::Status(404)),
        }
    }
}

fn export() -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/export.xml");
    std::fs::read_to_string(path).unwrap()
}

struct Site {
    _tmp: TempDir,
    posts: PathBuf,
    images: PathBuf,
}

fn site() -> Site {
    let tmp = TempDir::new().unwrap();
    let posts = tmp.path().join("site/content/post");
    let images = tmp.path().join("site/static/img");
    Site {
        _tmp: tmp,
        posts,
        images,
    }
}

fn full_config(site: &Site) -> ImportConfig {
    let mut config = ImportConfig::default();
    config.output.comments = true;
    config.images.static_dir = Some(site.images.clone());
    config
}

/// Split a post file into its parsed frontmatter and its body.
fn read_post(path: &Path) -> (toml::Table, String) {
    let text = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    let rest = text.strip_prefix("+++\n").expect("post starts with +++");
    let (header, body) = rest.split_once("+++\n\n").expect("closing +++");
    (header.parse().unwrap(), body.to_string())
}

fn read_comment(site: &Site, id: u64) -> toml::Table {
    let path = site.posts.join(format!("comments/c{id}.toml"));
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
        .parse()
        .unwrap()
}

#[test]
fn imports_posts_comments_and_images() {
    let site = site();
    let config = full_config(&site);
    let summary = import_with(
        &export(),
        &site.posts,
        &config,
        &StubFetcher::new(),
        &MarkdownConverter,
    )
    .unwrap();

    assert_eq!(summary.published(), 1);
    assert_eq!(summary.drafts(), 1);
    assert_eq!(summary.comments_written, 4);
    assert_eq!(summary.orphaned, 1);
    assert_eq!(summary.images_saved, 2);
    assert_eq!(summary.images_failed, 1);

    let (header, body) = read_post(&site.posts.join("first-snow.md"));
    assert_eq!(header["title"].as_str(), Some("First Snow on the Ridge"));
    assert_eq!(header["slug"].as_str(), Some("first-snow"));
    assert_eq!(
        header["date"].as_datetime().map(|d| d.to_string()),
        Some("2014-03-02T10:20:30-08:00".to_string())
    );
    let tags: Vec<&str> = header["tags"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t.as_str())
        .collect();
    assert_eq!(tags, vec!["hiking", "winter"]);
    assert!(header.get("draft").is_none());
    let comments: Vec<i64> = header["comments"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|c| c.as_integer())
        .collect();
    assert_eq!(comments, vec![7004, 7001, 7002, 7003]);
    assert_eq!(
        header["image"]["src"].as_str(),
        Some("http://1.bp.blogspot.com/ridge/s1600/ridge.jpg")
    );
    assert_eq!(header["author"]["name"].as_str(), Some("Ann Walker"));

    assert!(body.contains("morning. Cold, too."));
    assert!(body.contains(r#"<img src="/img/ridge.jpg" />"#));
    assert!(!body.contains(RIDGE));
    assert_eq!(
        std::fs::read(site.images.join("ridge.jpg")).unwrap(),
        b"ridge photo"
    );
}

#[test]
fn draft_keeps_failed_image_and_gets_prefixed_name() {
    let site = site();
    let config = full_config(&site);
    import_with(
        &export(),
        &site.posts,
        &config,
        &StubFetcher::new(),
        &MarkdownConverter,
    )
    .unwrap();

    let (header, body) = read_post(&site.posts.join("gear-list-for-spring.md"));
    assert_eq!(header["title"].as_str(), Some("Gear \"List\" for Spring"));
    assert_eq!(header["draft"].as_bool(), Some(true));
    assert!(header.get("comments").is_none());
    assert!(header.get("image").is_none());

    let prefixed = format!("{}-ridge.jpg", &content_hash(b"gear photo")[..12]);
    assert!(body.contains(&format!(r#"<img src="/img/{prefixed}">"#)));
    assert!(body.contains(GONE));
    assert_eq!(
        std::fs::read(site.images.join(&prefixed)).unwrap(),
        b"gear photo"
    );
}

#[test]
fn comment_files_carry_replies_and_authors() {
    let site = site();
    let config = full_config(&site);
    import_with(
        &export(),
        &site.posts,
        &config,
        &StubFetcher::new(),
        &MarkdownConverter,
    )
    .unwrap();

    let reply = read_comment(&site, 7002);
    assert_eq!(reply["id"].as_str(), Some("7002"));
    assert_eq!(reply["reply"].as_integer(), Some(7001));
    assert_eq!(reply["title"].as_str(), Some("A 24mmprime"));
    assert_eq!(reply["author"]["image"]["width"].as_str(), Some("32"));

    let top = read_comment(&site, 7004);
    assert!(top.get("reply").is_none());

    let thanks = read_comment(&site, 7003);
    assert_eq!(thanks["content"].as_str(), Some("Thanks, I'll try it."));

    assert!(!site.posts.join("comments/c7005.toml").exists());
}

#[test]
fn markdown_import_without_comments() {
    let site = site();
    let mut config = ImportConfig::default();
    config.output.markdown = true;
    config.output.slug_filenames = false;
    import_with(
        &export(),
        &site.posts,
        &config,
        &StubFetcher::new(),
        &MarkdownConverter,
    )
    .unwrap();

    let (header, body) = read_post(&site.posts.join("first-snow-on-the-ridge.md"));
    assert!(header.get("comments").is_none());
    assert!(body.starts_with("The ridge was white this morning. Cold, too.\n"));
    assert!(body.contains(&format!("[![]({RIDGE})]")));
    assert!(!site.posts.join("comments").exists());
    assert!(!site.images.exists());
}

#[test]
fn reimport_produces_identical_files() {
    let site = site();
    let config = full_config(&site);
    let fetcher = StubFetcher::new();
    let second = site.posts.with_file_name("again");

    import_with(&export(), &site.posts, &config, &fetcher, &MarkdownConverter).unwrap();
    let summary = import_with(&export(), &second, &config, &fetcher, &MarkdownConverter).unwrap();
    assert_eq!(summary.images_saved, 0);
    assert_eq!(summary.images_reused, 2);

    for name in [
        "first-snow.md",
        "gear-list-for-spring.md",
        "comments/c7001.toml",
        "comments/c7003.toml",
    ] {
        assert_eq!(
            std::fs::read(site.posts.join(name)).unwrap(),
            std::fs::read(second.join(name)).unwrap(),
            "{name} differs between runs"
        );
    }
}

#[test]
fn analyze_fixture_inventory() {
    let analysis = analyze(&export(), true).unwrap();
    assert_eq!(analysis.records.len(), 9);
    assert_eq!(analysis.posts().count(), 2);
    assert_eq!(analysis.comment_count(), 5);
    assert_eq!(analysis.other_count(), 2);
    assert_eq!(analysis.links.linked.len(), 4);
    assert_eq!(analysis.links.orphaned, vec![7]);
    assert!(analysis.resolution.collisions.is_empty());
    assert!(analysis.resolution.unparsable.is_empty());
}
