use chrono::{DateTime, Utc};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// One candidate video file, with the metadata providers need to search
/// for it.
#[derive(Debug, Clone)]
pub struct VideoFile {
    path: PathBuf,
    size: u64,
    mtime: DateTime<Utc>,
}

/// Search terms derived from a video filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoQuery {
    pub title: String,
    /// (season, episode) when the filename carries an SxxEyy tag
    pub episode: Option<(u32, u32)>,
    pub year: Option<u32>,
}

impl VideoFile {
    /// Stat the file. Failure here is a job-level infrastructure error, not
    /// a scan error: the path existed when the scanner saw it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        let mtime = metadata.modified().map(DateTime::<Utc>::from)?;

        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            mtime,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mtime(&self) -> DateTime<Utc> {
        self.mtime
    }

    /// Destination for a fetched subtitle: `movie.en.srt` when a language is
    /// requested, plain `movie.srt` for an any-language probe.
    pub fn subtitle_path(&self, language: Option<&str>) -> PathBuf {
        match language {
            Some(language) => self.path.with_extension(format!("{}.srt", language)),
            None => self.path.with_extension("srt"),
        }
    }

    /// Stable identity of this file's current content, used as a cache key
    /// component. Changes whenever the file is rewritten.
    pub fn fingerprint(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.path.to_string_lossy().hash(&mut hasher);
        self.size.hash(&mut hasher);
        self.mtime.timestamp().hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    /// Derive provider search terms from the filename.
    pub fn query(&self) -> VideoQuery {
        let stem = self
            .path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        parse_query(&stem)
    }
}

/// Split a release-style filename into title, episode tag and year.
///
/// Dots and underscores are treated as word separators. The first SxxEyy
/// token ends the title; release-group noise after it is dropped. Without an
/// episode tag, a plausible year token ends the title instead.
fn parse_query(stem: &str) -> VideoQuery {
    let normalized = stem.replace(['.', '_'], " ");
    let mut title_words: Vec<&str> = Vec::new();
    let mut episode = None;
    let mut year = None;

    for word in normalized.split_whitespace() {
        if let Some(tag) = parse_episode_tag(word) {
            episode = Some(tag);
            break;
        }
        // A leading year is part of the title ("2001 A Space Odyssey").
        if !title_words.is_empty() {
            if let Some(value) = parse_year(word) {
                year = Some(value);
                break;
            }
        }
        title_words.push(word);
    }

    VideoQuery {
        title: title_words.join(" "),
        episode,
        year,
    }
}

/// Parse an `SxxEyy` token, case-insensitive.
fn parse_episode_tag(word: &str) -> Option<(u32, u32)> {
    let rest = word.strip_prefix(['s', 'S'])?;
    let split = rest.find(['e', 'E'])?;
    let (season, episode) = rest.split_at(split);
    let season: u32 = season.parse().ok()?;
    let episode: u32 = episode[1..].parse().ok()?;
    Some((season, episode))
}

fn parse_year(word: &str) -> Option<u32> {
    let trimmed = word.trim_matches(['(', ')', '[', ']']);
    if trimmed.len() != 4 {
        return None;
    }
    let value: u32 = trimmed.parse().ok()?;
    (1900..=2100).contains(&value).then_some(value)
}
