use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::config::OpenSubtitlesConfig;
use crate::error::{Result, SubfetchError};
use crate::video::VideoFile;

use super::{persist_subtitle, SubtitleProvider, SubtitleRecord};

const NAME: &str = "opensubtitles";

/// OpenSubtitles REST API v1 client.
///
/// Search results are ordered by download count server-side; the first
/// result with a downloadable file wins. Requires an API key, without one
/// the provider reports itself disabled.
pub struct OpenSubtitlesProvider {
    config: OpenSubtitlesConfig,
    cache: Arc<CacheStore>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    attributes: Attributes,
}

#[derive(Debug, Deserialize)]
struct Attributes {
    #[serde(default)]
    download_count: u64,
    #[serde(default)]
    files: Vec<SubtitleFile>,
}

#[derive(Debug, Deserialize)]
struct SubtitleFile {
    file_id: u64,
}

#[derive(Debug, Serialize)]
struct DownloadRequest {
    file_id: u64,
}

#[derive(Debug, Deserialize)]
struct DownloadResponse {
    link: String,
}

/// Search outcome kept in the cache store, keyed by video fingerprint and
/// language.
#[derive(Debug, Serialize, Deserialize)]
struct CachedMatch {
    file_id: u64,
}

impl OpenSubtitlesProvider {
    pub fn new(config: OpenSubtitlesConfig, cache: Arc<CacheStore>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&config.api_key) {
            headers.insert("Api-Key", value);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            config,
            cache,
            client,
        })
    }

    /// Find the best matching subtitle file id, consulting the cache first.
    async fn lookup(&self, video: &VideoFile, language: Option<&str>) -> Result<Option<u64>> {
        let key = format!(
            "{}:{}:{}",
            NAME,
            video.fingerprint(),
            language.unwrap_or("any")
        );
        if let Some(hit) = self.cache.get::<CachedMatch>(&key) {
            return Ok(Some(hit.file_id));
        }

        let query = video.query();
        let mut params: Vec<(&str, String)> = vec![
            ("query", query.title.clone()),
            ("order_by", "download_count".to_string()),
        ];
        if let Some(language) = language {
            params.push(("languages", language.to_string()));
        }
        if let Some((season, episode)) = query.episode {
            params.push(("season_number", season.to_string()));
            params.push(("episode_number", episode.to_string()));
        }
        if let Some(year) = query.year {
            params.push(("year", year.to_string()));
        }

        debug!("Searching opensubtitles for {:?}", query.title);
        let response = self
            .client
            .get(format!("{}/subtitles", self.config.endpoint))
            .query(&params)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SubfetchError::Provider(format!(
                "OpenSubtitles search failed: HTTP {}",
                response.status()
            )));
        }

        let results: SearchResponse = response.json().await?;
        let best = results
            .data
            .into_iter()
            .filter_map(|item| {
                let Attributes {
                    download_count,
                    files,
                } = item.attributes;
                let file = files.into_iter().next()?;
                Some((download_count, file.file_id))
            })
            .max_by_key(|&(count, _)| count);

        let Some((_, file_id)) = best else {
            return Ok(None);
        };
        if let Err(e) = self.cache.put(&key, &CachedMatch { file_id }) {
            warn!("Cannot cache opensubtitles match: {}", e);
        }
        Ok(Some(file_id))
    }

    async fn request_download_link(&self, file_id: u64) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/download", self.config.endpoint))
            .json(&DownloadRequest { file_id })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SubfetchError::Provider(format!(
                "OpenSubtitles download request failed: HTTP {}",
                response.status()
            )));
        }

        let download: DownloadResponse = response.json().await?;
        Ok(download.link)
    }
}

#[async_trait]
impl SubtitleProvider for OpenSubtitlesProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn enabled(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    async fn find_and_fetch(
        &self,
        video: &VideoFile,
        language: Option<&str>,
        destination: &Path,
    ) -> Result<Option<SubtitleRecord>> {
        let Some(file_id) = self.lookup(video, language).await? else {
            return Ok(None);
        };

        let link = self.request_download_link(file_id).await?;
        let response = self.client.get(&link).send().await?;
        if !response.status().is_success() {
            return Err(SubfetchError::Provider(format!(
                "OpenSubtitles file download failed: HTTP {}",
                response.status()
            )));
        }
        let content = response.bytes().await?;

        persist_subtitle(destination, &content).await?;
        info!(
            "Downloaded {} from {}",
            destination.display(),
            NAME
        );
        Ok(Some(SubtitleRecord {
            path: destination.to_path_buf(),
            provider: NAME.to_string(),
        }))
    }
}
