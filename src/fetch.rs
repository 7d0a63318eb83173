use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::age::AgeFilter;
use crate::config::Config;
use crate::error::{Result, SubfetchError};
use crate::provider::{SubtitleProvider, SubtitleRecord};
use crate::scan;
use crate::video::VideoFile;

/// Final mapping from video path to the subtitles obtained for it during
/// one run. Videos that ended the run without subtitles are not present.
pub type ResultSet = BTreeMap<PathBuf, Vec<SubtitleRecord>>;

/// Parameters of one orchestrator run.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub paths: Vec<PathBuf>,
    /// Wanted languages in preference order; empty means any language
    pub languages: Vec<String>,
    /// Re-fetch and overwrite subtitles that already exist on disk
    pub force: bool,
    /// Fetch one subtitle per requested language instead of stopping at the
    /// first success
    pub multi: bool,
    pub age_filter: Option<AgeFilter>,
    /// Size of the worker pool, must be positive
    pub workers: usize,
    /// Show a progress bar while jobs run
    pub progress: bool,
}

/// Terminal state of one fetch job. An empty success means no provider had
/// a usable subtitle; failures are infrastructure problems with the video
/// itself.
#[derive(Debug)]
enum JobOutcome {
    Succeeded {
        video: PathBuf,
        subtitles: Vec<SubtitleRecord>,
    },
    SucceededEmpty {
        video: PathBuf,
    },
    Failed {
        video: PathBuf,
        error: SubfetchError,
    },
}

/// Drives one download run: scans for candidate videos, fans fetch jobs out
/// over a bounded worker pool and merges the outcomes.
pub struct FetchOrchestrator {
    providers: Vec<Arc<dyn SubtitleProvider>>,
    video_extensions: Vec<String>,
}

impl FetchOrchestrator {
    pub fn new(config: &Config, providers: Vec<Arc<dyn SubtitleProvider>>) -> Self {
        Self {
            providers,
            video_extensions: config.scan.video_extensions.clone(),
        }
    }

    /// Run the full scan-dispatch-merge cycle.
    ///
    /// Job failures never abort the run; they are logged and their videos
    /// simply do not appear in the returned set. The worker pool lives and
    /// dies inside this call.
    pub async fn run(&self, opts: FetchOptions) -> Result<ResultSet> {
        if opts.workers == 0 {
            return Err(SubfetchError::InvalidConfiguration(
                "Worker count must be positive".to_string(),
            ));
        }

        let candidates = scan::scan(
            &opts.paths,
            &self.video_extensions,
            opts.age_filter.as_ref(),
        )?;
        if candidates.is_empty() {
            info!("No candidate video files found");
            return Ok(ResultSet::new());
        }
        info!(
            "Fetching subtitles for {} video(s) with {} worker(s)",
            candidates.len(),
            opts.workers
        );

        let progress = if opts.progress {
            let bar = ProgressBar::new(candidates.len() as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} videos")
                    .unwrap()
                    .progress_chars("#>-"),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        let semaphore = Arc::new(Semaphore::new(opts.workers));
        let mut tasks = JoinSet::new();
        for path in candidates {
            let semaphore = Arc::clone(&semaphore);
            let providers = self.providers.clone();
            let languages = opts.languages.clone();
            let (force, multi) = (opts.force, opts.multi);
            tasks.spawn(async move {
                let _permit = semaphore.acquire().await;
                match fetch_one(&path, &providers, &languages, force, multi).await {
                    Ok(subtitles) if subtitles.is_empty() => {
                        JobOutcome::SucceededEmpty { video: path }
                    }
                    Ok(subtitles) => JobOutcome::Succeeded {
                        video: path,
                        subtitles,
                    },
                    Err(error) => JobOutcome::Failed { video: path, error },
                }
            });
        }

        // Fan-in barrier: every submitted job reaches a terminal state
        // before any result is reported.
        let mut results = ResultSet::new();
        let (mut with_subtitles, mut without, mut failed) = (0usize, 0usize, 0usize);
        while let Some(joined) = tasks.join_next().await {
            progress.inc(1);
            match joined {
                Ok(JobOutcome::Succeeded { video, subtitles }) => {
                    with_subtitles += 1;
                    results.insert(video, subtitles);
                }
                Ok(JobOutcome::SucceededEmpty { video }) => {
                    without += 1;
                    debug!("No subtitles found for {}", video.display());
                }
                Ok(JobOutcome::Failed { video, error }) => {
                    failed += 1;
                    warn!("Fetch job for {} failed: {}", video.display(), error);
                }
                Err(join_error) => {
                    failed += 1;
                    warn!("Fetch job aborted: {}", join_error);
                }
            }
        }
        progress.finish_and_clear();

        info!(
            "Run complete: {} video(s) with subtitles, {} without, {} failed",
            with_subtitles, without, failed
        );
        Ok(results)
    }
}

/// One fetch job: find and persist subtitles for a single video.
///
/// All languages of a video are handled here, sequentially, so no other
/// task can race on this video's destination files. Provider failures are
/// absorbed per language; only problems with the video itself surface as
/// errors.
async fn fetch_one(
    path: &PathBuf,
    providers: &[Arc<dyn SubtitleProvider>],
    languages: &[String],
    force: bool,
    multi: bool,
) -> Result<Vec<SubtitleRecord>> {
    let video = VideoFile::open(path)?;

    let requested: Vec<Option<&str>> = if languages.is_empty() {
        vec![None]
    } else {
        languages.iter().map(|language| Some(language.as_str())).collect()
    };

    let mut subtitles = Vec::new();
    for language in requested {
        let destination = video.subtitle_path(language);
        if !force && destination.exists() {
            debug!("{} already exists, skipping", destination.display());
            if !multi {
                break;
            }
            continue;
        }

        let fetched = fetch_language(&video, providers, language, &destination).await;
        if let Some(record) = fetched {
            subtitles.push(record);
            if !multi {
                break;
            }
        }
    }
    Ok(subtitles)
}

/// Ask each provider in turn for one (video, language) pair. The first
/// provider that delivers wins; provider errors are logged and the next
/// provider is tried.
async fn fetch_language(
    video: &VideoFile,
    providers: &[Arc<dyn SubtitleProvider>],
    language: Option<&str>,
    destination: &std::path::Path,
) -> Option<SubtitleRecord> {
    for provider in providers {
        match provider.find_and_fetch(video, language, destination).await {
            Ok(Some(record)) => return Some(record),
            Ok(None) => debug!(
                "No match from {} for {}",
                provider.name(),
                video.path().display()
            ),
            Err(e) => warn!(
                "Provider {} failed for {}: {}",
                provider.name(),
                video.path().display(),
                e
            ),
        }
    }
    None
}
