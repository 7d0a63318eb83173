// Pluggable subtitle providers.
//
// Each provider knows how to search one external subtitle service and
// persist a matching subtitle next to the video. The orchestrator only sees
// the trait; adding a service means implementing SubtitleProvider and
// registering it in the factory.

pub mod gestdown;
pub mod opensubtitles;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::error::{Result, SubfetchError};
use crate::video::VideoFile;

/// One successfully fetched subtitle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleRecord {
    pub path: PathBuf,
    pub provider: String,
}

/// A subtitle service queried by fetch jobs.
#[async_trait]
pub trait SubtitleProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the provider can currently be queried. Disabled providers are
    /// left out of the pool with a warning instead of failing requests.
    fn enabled(&self) -> bool {
        true
    }

    /// Search the service for `video` in `language` and, on a match,
    /// download the subtitle to `destination`.
    ///
    /// `Ok(None)` means the service had no usable match; `Err` is reserved
    /// for infrastructure failures (network, disk) and is absorbed by the
    /// calling job, never propagated out of the run.
    async fn find_and_fetch(
        &self,
        video: &VideoFile,
        language: Option<&str>,
        destination: &Path,
    ) -> Result<Option<SubtitleRecord>>;
}

pub struct ProviderFactory;

impl ProviderFactory {
    /// Build the provider pool for one run: every registered, enabled
    /// provider, or the named subset when `names` is non-empty. Unknown
    /// names are skipped with a warning.
    pub fn create_pool(
        config: &Config,
        cache: Arc<CacheStore>,
        names: &[String],
    ) -> Result<Vec<Arc<dyn SubtitleProvider>>> {
        let registered: Vec<Arc<dyn SubtitleProvider>> = vec![
            Arc::new(opensubtitles::OpenSubtitlesProvider::new(
                config.providers.opensubtitles.clone(),
                Arc::clone(&cache),
            )?),
            Arc::new(gestdown::GestdownProvider::new(
                config.providers.gestdown.clone(),
            )?),
        ];

        for name in names {
            if !registered.iter().any(|p| p.name() == name) {
                warn!("Unknown service {}, skipping", name);
            }
        }

        let pool = registered
            .into_iter()
            .filter(|provider| {
                if !names.is_empty() && !names.iter().any(|n| n == provider.name()) {
                    return false;
                }
                if !provider.enabled() {
                    warn!("Service {} is not available, skipping", provider.name());
                    return false;
                }
                true
            })
            .collect();

        Ok(pool)
    }
}

/// Write subtitle content to its destination via a sibling temporary file,
/// so a crashed download never leaves a truncated subtitle behind.
pub(crate) async fn persist_subtitle(destination: &Path, content: &[u8]) -> Result<()> {
    let dir = destination.parent().ok_or_else(|| {
        SubfetchError::Provider(format!(
            "Subtitle destination {} has no parent directory",
            destination.display()
        ))
    })?;

    let file = tempfile::NamedTempFile::new_in(dir)?;
    tokio::fs::write(file.path(), content).await?;
    file.persist(destination)
        .map_err(|e| SubfetchError::Io(e.error))?;
    Ok(())
}
