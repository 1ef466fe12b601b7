//! keyshelf CLI
//!
//! Command-line interface for matching storefront listings to store catalog
//! entries and reporting library status, reviews and compatibility.

mod commands;
mod error;

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stderr;

use keyshelf_core::SiteProfile;

use commands::appdb::run_appdb_build;
use commands::cache::{run_cache_clear, run_cache_path};
use commands::config::{run_config_path, run_config_show};
use commands::resolve::run_resolve;
use commands::scan::{ScanOptions, run_scan};

#[derive(Parser)]
#[command(name = "keyshelf")]
#[command(about = "Match storefront listings to store catalog entries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and enrich every listing in a JSON listing file
    Scan {
        /// JSON array of listings scraped from a storefront page
        listings: PathBuf,

        /// Storefront the listings come from (e.g., humble, fanatical, dig, gog, indiegala)
        #[arg(short, long)]
        site: SiteProfile,

        /// Write a plain-text stats report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Minimum spacing between store requests, in milliseconds
        #[arg(long)]
        min_interval_ms: Option<u64>,

        /// Store requests allowed in flight at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Hide the progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Resolve a single title
    Resolve {
        /// Title as shown by the storefront
        title: String,

        /// Storefront the title comes from
        #[arg(short, long, default_value = "humble")]
        site: SiteProfile,

        /// Link or image URL found inside the listing (repeatable)
        #[arg(long = "asset")]
        assets: Vec<String>,
    },

    /// Manage the persistent cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Manage the offline title dictionary
    Appdb {
        #[command(subcommand)]
        action: AppdbAction,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Remove every cached entry
    Clear,

    /// Print the cache file path
    Path,
}

#[derive(Subcommand)]
enum AppdbAction {
    /// Build the dictionary from the store's full application list
    Build {
        /// Output file
        #[arg(short, long, default_value = "steam_apps.min.json")]
        output: PathBuf,

        /// Also store the result in the cache for immediate use
        #[arg(long)]
        install: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show effective settings and their file
    Show,

    /// Print the settings file path
    Path,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scan {
            listings,
            site,
            report,
            min_interval_ms,
            concurrency,
            quiet,
        } => run_scan(ScanOptions {
            listings,
            site,
            report,
            min_interval_ms,
            concurrency,
            quiet,
        }),
        Commands::Resolve {
            title,
            site,
            assets,
        } => run_resolve(&title, site, assets),
        Commands::Cache { action } => match action {
            CacheAction::Clear => run_cache_clear(),
            CacheAction::Path => run_cache_path(),
        },
        Commands::Appdb { action } => match action {
            AppdbAction::Build { output, install } => run_appdb_build(&output, install),
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => run_config_show(),
            ConfigAction::Path => {
                run_config_path();
                Ok(())
            }
        },
    };

    if let Err(e) = result {
        log::error!(
            "{} {}",
            "\u{2718}".if_supports_color(Stderr, |t| t.red()),
            e,
        );
        std::process::exit(1);
    }
}

/// Plain messages at info level, level-prefixed otherwise. `RUST_LOG`
/// overrides the default `info` filter.
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| match record.level() {
            log::Level::Info => writeln!(buf, "{}", record.args()),
            level => writeln!(buf, "{}: {}", level, record.args()),
        })
        .init();
}
