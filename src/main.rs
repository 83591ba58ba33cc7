use blogimport::{config, import, output};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "blogimport")]
#[command(about = "Convert a Blogger export into static site content")]
#[command(long_about = "\
Convert a Blogger export into static site content

Reads the Atom export Blogger produces (Settings → Back up content) and writes
one file per post: TOML frontmatter between +++ lines, then the post body.

Output layout:

  <TARGET>/
  ├── hello-world.md               # One file per post, named after its slug
  ├── work-in-progress.md          # Drafts carry draft = true
  └── comments/                    # With --comments
      ├── c1234.toml               # One file per comment
      └── c1240.toml

Posts list their comment IDs in display order (oldest first, replies right
after the comment they answer). With --static, every external image is
downloaded and its references rewritten to the local copy.

Logging goes to stderr; set RUST_LOG to adjust (default: blogimport=info) and
LOG_FORMAT=json for JSON lines.

Run 'blogimport gen-config' to generate a documented blogimport.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Flags that override `blogimport.toml`.
#[derive(Args, Clone, Default)]
struct ImportArgs {
    /// Download images into this directory and rewrite references
    #[arg(long = "static", value_name = "DIR")]
    static_dir: Option<PathBuf>,

    /// TOML lines added to every post's frontmatter
    #[arg(long)]
    extra: Option<String>,

    /// Drop author URIs and images hosted on blogger.com
    #[arg(long)]
    no_blogger: bool,

    /// Write comment files and comment lists
    #[arg(long)]
    comments: bool,

    /// Convert post bodies to Markdown
    #[arg(long)]
    md: bool,

    /// Name post files after their title instead of their permalink slug
    #[arg(long)]
    title_filenames: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Convert an export into content files
    Import {
        /// Blogger export file
        export: PathBuf,
        /// Directory that receives the post files
        target: PathBuf,
        #[command(flatten)]
        args: ImportArgs,
    },
    /// Parse and link an export without writing anything
    Check {
        /// Blogger export file
        export: PathBuf,
        /// Print the parsed records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock blogimport.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing()?;

    match cli.command {
        Command::Import {
            export,
            target,
            args,
        } => {
            let mut config = config::load_config(&cli.config)?;
            apply_overrides(&mut config, &args);
            config.validate()?;
            init_thread_pool(&config.download);

            let summary = import::import(&export, &target, &config)?;
            output::print_import_summary(&summary, &target);
        }
        Command::Check { export, json } => {
            let xml = read_export(&export)?;
            let analysis = import::analyze(&xml, true)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&analysis.records)?);
            } else {
                output::print_check_output(&analysis);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn read_export(path: &Path) -> Result<String, import::ImportError> {
    std::fs::read_to_string(path).map_err(|source| import::ImportError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Command-line flags win over the config file. Boolean flags can only turn
/// a setting on.
fn apply_overrides(config: &mut config::ImportConfig, args: &ImportArgs) {
    if let Some(dir) = &args.static_dir {
        config.images.static_dir = Some(dir.clone());
    }
    if let Some(extra) = &args.extra {
        config.output.extra = extra.clone();
    }
    if args.no_blogger {
        config.output.strip_blogger_urls = true;
    }
    if args.comments {
        config.output.comments = true;
    }
    if args.md {
        config.output.markdown = true;
    }
    if args.title_filenames {
        config.output.slug_filenames = false;
    }
}

/// Log to stderr, filtered by `RUST_LOG`. `LOG_FORMAT=json` switches to JSON
/// lines.
fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("blogimport=info"));
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }
    Ok(())
}

/// Initialize the rayon thread pool used for image downloads.
///
/// Capped at the number of available cores.
fn init_thread_pool(download: &config::DownloadConfig) {
    let threads = config::effective_threads(download);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
