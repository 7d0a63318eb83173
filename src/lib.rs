//! Subfetch - Concurrent Subtitle Downloader
//!
//! Scans filesystem paths for video files, optionally filters them by
//! modification age, and downloads subtitles for them from a pool of
//! subtitle provider services.

pub mod age;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod provider;
pub mod scan;
pub mod video;
