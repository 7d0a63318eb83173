use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

use crate::config::GestdownConfig;
use crate::error::{Result, SubfetchError};
use crate::video::VideoFile;

use super::{persist_subtitle, SubtitleProvider, SubtitleRecord};

const NAME: &str = "gestdown";

/// Gestdown (Addic7ed proxy) client. Episode subtitles only: videos without
/// an SxxEyy tag in their filename never match here.
pub struct GestdownProvider {
    config: GestdownConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindResponse {
    #[serde(default)]
    matching_subtitles: Vec<MatchingSubtitle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchingSubtitle {
    download_uri: String,
    #[serde(default)]
    download_count: u64,
    #[serde(default)]
    completed: bool,
}

impl GestdownProvider {
    pub fn new(config: GestdownConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("subfetch v", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, client })
    }
}

/// The API takes full language names in its path, not ISO codes.
fn language_name(code: Option<&str>) -> &str {
    match code {
        None | Some("en") => "English",
        Some("fr") => "French",
        Some("de") => "German",
        Some("es") => "Spanish",
        Some("it") => "Italian",
        Some("pt") => "Portuguese",
        Some("nl") => "Dutch",
        Some("pl") => "Polish",
        Some("ru") => "Russian",
        Some("ja") => "Japanese",
        Some("ar") => "Arabic",
        Some(other) => other,
    }
}

#[async_trait]
impl SubtitleProvider for GestdownProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    async fn find_and_fetch(
        &self,
        video: &VideoFile,
        language: Option<&str>,
        destination: &Path,
    ) -> Result<Option<SubtitleRecord>> {
        let query = video.query();
        let Some((season, episode)) = query.episode else {
            debug!("{} has no episode tag, skipping gestdown", video.path().display());
            return Ok(None);
        };

        let show = utf8_percent_encode(&query.title, NON_ALPHANUMERIC);
        let url = format!(
            "{}/subtitles/find/{}/{}/{}/{}",
            self.config.endpoint,
            language_name(language),
            show,
            season,
            episode
        );

        debug!("Searching gestdown for {:?} S{}E{}", query.title, season, episode);
        let response = self.client.get(&url).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            // Unknown show or episode.
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SubfetchError::Provider(format!(
                "Gestdown search failed: HTTP {}",
                response.status()
            )));
        }

        let found: FindResponse = response.json().await?;
        let best = found
            .matching_subtitles
            .into_iter()
            .filter(|subtitle| subtitle.completed)
            .max_by_key(|subtitle| subtitle.download_count);
        let Some(subtitle) = best else {
            return Ok(None);
        };

        let download_url = format!("{}{}", self.config.endpoint, subtitle.download_uri);
        let response = self.client.get(&download_url).send().await?;
        if !response.status().is_success() {
            return Err(SubfetchError::Provider(format!(
                "Gestdown download failed: HTTP {}",
                response.status()
            )));
        }
        let content = response.bytes().await?;

        persist_subtitle(destination, &content).await?;
        info!("Downloaded {} from {}", destination.display(), NAME);
        Ok(Some(SubtitleRecord {
            path: destination.to_path_buf(),
            provider: NAME.to_string(),
        }))
    }
}
