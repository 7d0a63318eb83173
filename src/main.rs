//! Subfetch - Concurrent Subtitle Downloader
//!
//! Command-line entry point: scans the given paths for video files and
//! fetches subtitles for them from the configured provider services.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subfetch::age::AgeFilter;
use subfetch::cache::CacheStore;
use subfetch::cli::Args;
use subfetch::config::{self, Config};
use subfetch::fetch::{FetchOptions, FetchOrchestrator};
use subfetch::provider::ProviderFactory;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args)?;

    // Load configuration
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("subfetch.toml").exists() {
                info!("Found subfetch.toml in current directory, loading...");
                Config::from_file("subfetch.toml")?
            } else {
                Config::default()
            }
        }
    };

    // Compile the age filter before anything touches the filesystem; a bad
    // expression aborts the invocation.
    let age_filter = match &args.age {
        Some(expr) => Some(AgeFilter::parse(expr)?),
        None => None,
    };

    // Resolve the cache store
    let cache = if args.no_cache_dir {
        info!("Cache directory disabled");
        CacheStore::disabled()
    } else {
        let dir = args
            .cache_dir
            .clone()
            .unwrap_or_else(config::default_cache_dir);
        CacheStore::open(dir)?
    };

    let providers = ProviderFactory::create_pool(&config, Arc::new(cache), &args.services)?;
    if providers.is_empty() {
        info!("No subtitle services available");
    }

    let orchestrator = FetchOrchestrator::new(&config, providers);
    let results = orchestrator
        .run(FetchOptions {
            paths: args.paths.clone(),
            languages: args.languages.clone(),
            force: args.force,
            multi: args.multi,
            age_filter,
            workers: args.workers,
            progress: !args.quiet && !args.verbose,
        })
        .await?;

    if results.is_empty() {
        if !args.quiet {
            eprintln!("No subtitles downloaded");
        }
        std::process::exit(1);
    }

    if !args.quiet {
        let total: usize = results.values().map(|subtitles| subtitles.len()).sum();
        println!("{}", "*".repeat(50));
        println!(
            "Downloaded {} subtitle(s) for {} video(s)",
            total,
            results.len()
        );
        for subtitles in results.values() {
            for subtitle in subtitles {
                println!("{} from {}", subtitle.path.display(), subtitle.provider);
            }
        }
        println!("{}", "*".repeat(50));
    }

    Ok(())
}

/// Configure console logging from the verbosity flags.
fn setup_logging(args: &Args) -> Result<()> {
    let log_level = if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        Level::WARN
    };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(args.verbose)
        .with_line_number(args.verbose);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
