//! End-to-end orchestrator runs against stubbed providers and real
//! temporary directory trees.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use subfetch::config::Config;
use subfetch::error::{Result, SubfetchError};
use subfetch::fetch::{FetchOptions, FetchOrchestrator};
use subfetch::provider::{SubtitleProvider, SubtitleRecord};
use subfetch::video::VideoFile;

/// Test double that "downloads" a canned subtitle for matching videos and
/// keeps counters the assertions can read.
struct StubProvider {
    /// Stems this provider has subtitles for; None matches everything
    matching_stems: Option<Vec<String>>,
    /// Artificial per-call latency
    delay: Option<Duration>,
    /// Fail every call with an infrastructure error
    fail: bool,
    calls: Arc<AtomicUsize>,
    running: Arc<AtomicUsize>,
    max_running: Arc<AtomicUsize>,
}

impl StubProvider {
    fn matching_all() -> Self {
        Self {
            matching_stems: None,
            delay: None,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
            running: Arc::new(AtomicUsize::new(0)),
            max_running: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn matching(stems: &[&str]) -> Self {
        Self {
            matching_stems: Some(stems.iter().map(|s| s.to_string()).collect()),
            ..Self::matching_all()
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::matching_all()
        }
    }

    fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    fn max_running(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.max_running)
    }
}

#[async_trait]
impl SubtitleProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn find_and_fetch(
        &self,
        video: &VideoFile,
        _language: Option<&str>,
        destination: &Path,
    ) -> Result<Option<SubtitleRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            return Err(SubfetchError::Provider("stub outage".to_string()));
        }

        let stem = video
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(stems) = &self.matching_stems {
            if !stems.contains(&stem) {
                return Ok(None);
            }
        }

        tokio::fs::write(destination, b"1\n00:00:01,000 --> 00:00:02,000\nstub\n").await?;
        Ok(Some(SubtitleRecord {
            path: destination.to_path_buf(),
            provider: "stub".to_string(),
        }))
    }
}

fn orchestrator(providers: Vec<Arc<dyn SubtitleProvider>>) -> FetchOrchestrator {
    FetchOrchestrator::new(&Config::default(), providers)
}

fn options(paths: Vec<PathBuf>) -> FetchOptions {
    FetchOptions {
        paths,
        languages: vec!["en".to_string()],
        force: false,
        multi: false,
        age_filter: None,
        workers: 2,
        progress: false,
    }
}

fn make_videos(dir: &Path, stems: &[&str]) -> Vec<PathBuf> {
    stems
        .iter()
        .map(|stem| {
            let path = dir.join(format!("{}.mkv", stem));
            std::fs::write(&path, b"video bytes").unwrap();
            path
        })
        .collect()
}

#[tokio::test]
async fn test_end_to_end_stubbed_run() {
    let dir = tempfile::tempdir().unwrap();
    let videos = make_videos(dir.path(), &["a", "b"]);

    let stub = StubProvider::matching(&["a"]);
    let orchestrator = orchestrator(vec![Arc::new(stub)]);

    let mut opts = options(vec![dir.path().to_path_buf()]);
    opts.force = true;
    let results = orchestrator.run(opts).await.unwrap();

    assert_eq!(results.len(), 1);
    let records = &results[&videos[0]];
    assert_eq!(
        records,
        &vec![SubtitleRecord {
            path: dir.path().join("a.en.srt"),
            provider: "stub".to_string(),
        }]
    );
    assert!(dir.path().join("a.en.srt").is_file());
    assert!(!results.contains_key(&videos[1]));
    assert!(!dir.path().join("b.en.srt").exists());
}

#[tokio::test]
async fn test_twenty_jobs_eight_workers_all_accounted() {
    let dir = tempfile::tempdir().unwrap();
    let stems: Vec<String> = (0..20).map(|i| format!("v{:02}", i)).collect();
    let stem_refs: Vec<&str> = stems.iter().map(|s| s.as_str()).collect();
    let videos = make_videos(dir.path(), &stem_refs);

    let stub = StubProvider::matching_all().with_delay(Duration::from_millis(25));
    let calls = stub.calls();
    let max_running = stub.max_running();
    let orchestrator = orchestrator(vec![Arc::new(stub)]);

    let mut opts = options(vec![dir.path().to_path_buf()]);
    opts.workers = 8;
    let results = orchestrator.run(opts).await.unwrap();

    // Every job reached a terminal state and is in the merged set.
    assert_eq!(results.len(), 20);
    assert_eq!(calls.load(Ordering::SeqCst), 20);
    assert!(max_running.load(Ordering::SeqCst) <= 8);
    for video in &videos {
        assert!(video.with_extension("en.srt").is_file());
    }
}

#[tokio::test]
async fn test_partial_failure_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    make_videos(dir.path(), &["a", "b", "d", "e"]);
    // A candidate whose metadata cannot be read: the job fails, the run
    // must not.
    std::os::unix::fs::symlink("missing-target", dir.path().join("c.mkv")).unwrap();

    let orchestrator = orchestrator(vec![Arc::new(StubProvider::matching_all())]);
    let results = orchestrator
        .run(options(vec![dir.path().to_path_buf()]))
        .await
        .unwrap();

    assert_eq!(results.len(), 4);
    assert!(!results.contains_key(&dir.path().join("c.mkv")));
}

#[tokio::test]
async fn test_rerun_without_force_skips_existing() {
    let dir = tempfile::tempdir().unwrap();
    make_videos(dir.path(), &["a", "b", "c"]);

    let stub = StubProvider::matching_all();
    let calls = stub.calls();
    let orchestrator = orchestrator(vec![Arc::new(stub)]);

    let first = orchestrator
        .run(options(vec![dir.path().to_path_buf()]))
        .await
        .unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // Second run: every (video, language) pair is already satisfied, so no
    // provider is contacted and nothing is re-fetched.
    let second = orchestrator
        .run(options(vec![dir.path().to_path_buf()]))
        .await
        .unwrap();
    assert!(second.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_force_refetches_existing() {
    let dir = tempfile::tempdir().unwrap();
    make_videos(dir.path(), &["a"]);

    let stub = StubProvider::matching_all();
    let calls = stub.calls();
    let orchestrator = orchestrator(vec![Arc::new(stub)]);

    orchestrator
        .run(options(vec![dir.path().to_path_buf()]))
        .await
        .unwrap();

    let mut opts = options(vec![dir.path().to_path_buf()]);
    opts.force = true;
    let results = orchestrator.run(opts).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_multi_fetches_every_language() {
    let dir = tempfile::tempdir().unwrap();
    let videos = make_videos(dir.path(), &["a"]);

    let stub = StubProvider::matching_all();
    let calls = stub.calls();
    let orchestrator = orchestrator(vec![Arc::new(stub)]);

    let mut opts = options(vec![dir.path().to_path_buf()]);
    opts.languages = vec!["en".to_string(), "fr".to_string()];
    opts.multi = true;
    let results = orchestrator.run(opts).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(results[&videos[0]].len(), 2);
    assert!(dir.path().join("a.en.srt").is_file());
    assert!(dir.path().join("a.fr.srt").is_file());
}

#[tokio::test]
async fn test_single_mode_stops_at_first_success() {
    let dir = tempfile::tempdir().unwrap();
    let videos = make_videos(dir.path(), &["a"]);

    let stub = StubProvider::matching_all();
    let calls = stub.calls();
    let orchestrator = orchestrator(vec![Arc::new(stub)]);

    let mut opts = options(vec![dir.path().to_path_buf()]);
    opts.languages = vec!["en".to_string(), "fr".to_string()];
    let results = orchestrator.run(opts).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(results[&videos[0]].len(), 1);
    assert!(dir.path().join("a.en.srt").is_file());
    assert!(!dir.path().join("a.fr.srt").exists());
}

#[tokio::test]
async fn test_empty_language_list_probes_any() {
    let dir = tempfile::tempdir().unwrap();
    let videos = make_videos(dir.path(), &["a"]);

    let orchestrator = orchestrator(vec![Arc::new(StubProvider::matching_all())]);

    let mut opts = options(vec![dir.path().to_path_buf()]);
    opts.languages = Vec::new();
    let results = orchestrator.run(opts).await.unwrap();

    // An any-language probe writes the untagged destination.
    assert_eq!(results[&videos[0]][0].path, dir.path().join("a.srt"));
}

#[tokio::test]
async fn test_provider_outage_never_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    make_videos(dir.path(), &["a", "b"]);

    let orchestrator = orchestrator(vec![Arc::new(StubProvider::failing())]);
    let results = orchestrator
        .run(options(vec![dir.path().to_path_buf()]))
        .await
        .unwrap();

    // Outages degrade to "nothing found", never to a run error.
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_pool_falls_through_to_next_provider() {
    let dir = tempfile::tempdir().unwrap();
    let videos = make_videos(dir.path(), &["a"]);

    let good = StubProvider::matching_all();
    let good_calls = good.calls();
    let orchestrator = orchestrator(vec![
        Arc::new(StubProvider::failing()),
        Arc::new(good),
    ]);

    let results = orchestrator
        .run(options(vec![dir.path().to_path_buf()]))
        .await
        .unwrap();

    assert_eq!(good_calls.load(Ordering::SeqCst), 1);
    assert_eq!(results[&videos[0]][0].provider, "stub");
}
