//! Filescope - live local storage queries
//!
//! Entry point for the filescope command line tool.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use filescope::catalog::{scan_media_async, SqliteCatalog};
use filescope::observability::init_tracing;
use filescope::repository::StoragePaths;
use filescope::{CollectionSelector, Config, Error, QueryStream, Result, SearchFilter, StorageRepository};

/// Filescope - live local storage queries
#[derive(Parser, Debug)]
#[command(name = "filescope")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root of the storage tree
    #[arg(short, long, env = "FILESCOPE_ROOT", default_value = "/storage/emulated/0")]
    root: PathBuf,

    /// Downloads directory (defaults to <root>/Download)
    #[arg(long, env = "FILESCOPE_DOWNLOADS")]
    downloads: Option<PathBuf>,

    /// Data directory for the media catalog
    #[arg(short, long, env = "FILESCOPE_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FILESCOPE_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "FILESCOPE_LOG_JSON")]
    log_json: bool,

    /// Quiet period in milliseconds before a burst of changes re-runs a query
    #[arg(long, env = "FILESCOPE_WATCH_DEBOUNCE_MS", default_value = "200")]
    watch_debounce_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the children of a directory
    Folder {
        /// Directory to list
        path: String,

        /// Include entries whose name starts with a dot
        #[arg(long)]
        hidden: bool,

        /// Keep emitting on every change until interrupted
        #[arg(short, long)]
        follow: bool,
    },

    /// Search file names or media titles
    Search {
        /// Case-insensitive substring to look for
        query: String,

        /// Where to search: all, downloads, image, audio, video
        #[arg(long, default_value = "all")]
        filter: SearchFilter,

        /// Keep emitting on every change until interrupted
        #[arg(short, long)]
        follow: bool,
    },

    /// List a media collection
    Collection {
        /// Collection to list: image, audio, video
        selector: CollectionSelector,

        /// Keep emitting on every change until interrupted
        #[arg(short, long)]
        follow: bool,
    },

    /// Index media files under the root into the catalog
    Scan,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.log_json);

    let config = Config {
        downloads_path: cli.downloads.unwrap_or_else(|| cli.root.join("Download")),
        root_path: cli.root,
        data_dir: cli.data_dir,
        log_level: cli.log_level,
        watch_debounce: Duration::from_millis(cli.watch_debounce_ms),
        ..Config::default()
    };

    tracing::debug!(?config, "Configuration loaded");
    config.validate()?;

    std::fs::create_dir_all(&config.data_dir)?;
    let catalog = SqliteCatalog::open(config.catalog_path())?;
    for selector in [CollectionSelector::Image, CollectionSelector::Video, CollectionSelector::Audio] {
        catalog.register_collection(&StoragePaths::media_collection(selector))?;
    }

    let catalog = Arc::new(catalog);
    let repository = StorageRepository::new(&config, catalog.clone());
    let (stream, follow) = match cli.command {
        Command::Folder { path, hidden, follow } => (repository.get_folder(&path, hidden), follow),
        Command::Search { query, filter, follow } => (repository.search(&query, filter), follow),
        Command::Collection { selector, follow } => (repository.get_collection(selector), follow),
        Command::Scan => {
            let stats = scan_media_async(&config.root_path, &catalog, StoragePaths::media_collection).await?;
            return print_json(&stats);
        }
    };

    run_stream(stream, follow).await
}

/// Print emissions as JSON lines. Without `follow`, only the first one.
async fn run_stream(mut stream: QueryStream, follow: bool) -> Result<()> {
    loop {
        tokio::select! {
            listing = stream.recv() => {
                let Some(listing) = listing else { break };
                print_json(&listing)?;
                if !follow {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    stream.close().await;
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let line = serde_json::to_string(value).map_err(|e| Error::internal(format!("encode failed: {e}")))?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}")?;
    stdout.flush()?;
    Ok(())
}
