use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Subtitles, faster than your thoughts", long_about = None)]
pub struct Args {
    /// Path to a video file or a folder to scan
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Wanted language (ISO 639-1), may be given several times
    #[arg(short, long = "language", value_name = "LG")]
    pub languages: Vec<String>,

    /// Provider service to use, may be given several times
    #[arg(short, long = "service", value_name = "NAME")]
    pub services: Vec<String>,

    /// Download one subtitle for every requested language
    #[arg(short, long)]
    pub multi: bool,

    /// Replace existing subtitle files
    #[arg(short, long)]
    pub force: bool,

    /// Use N concurrent fetch workers
    #[arg(short, long, value_name = "N", default_value_t = 4)]
    pub workers: usize,

    /// Scan only files newer (prefix with +) or older than AGE (e.g. 12h, 1w2d, +3d6h)
    #[arg(short, long, value_name = "AGE")]
    pub age: Option<String>,

    /// Disable output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Cache directory to use
    #[arg(long, value_name = "DIR", conflicts_with = "no_cache_dir")]
    pub cache_dir: Option<PathBuf>,

    /// Do not use a cache directory (some services may not work)
    #[arg(long)]
    pub no_cache_dir: bool,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
