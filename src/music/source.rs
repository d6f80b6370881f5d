use std::path::Path;

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{error, warn};

use super::{DecodeParams, Track, TrackKind};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to run yt-dlp: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("yt-dlp error: {0}")]
    Resolver(String),
    #[error("unreadable yt-dlp output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no playable stream for {0}")]
    NoStream(String),
    #[error("no results for {0}")]
    NoMatch(String),
}

/// What the media resolver reports for one URL or query. Playlists and
/// searches carry `entries`; flat entries come without a direct stream `url`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaInfo {
    #[serde(rename = "_type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub webpage_url: Option<String>,
    pub duration: Option<f64>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub entries: Vec<Option<MediaInfo>>,
}

impl MediaInfo {
    pub fn is_playlist(&self) -> bool {
        self.kind.as_deref() == Some("playlist") && !self.entries.is_empty()
    }

    /// Flat records only point at a page and must be resolved again.
    pub fn is_flat(&self) -> bool {
        self.url.is_none() || self.kind.as_deref() == Some("url")
    }

    fn page_url(&self) -> Option<&str> {
        self.webpage_url.as_deref().or(self.url.as_deref())
    }

    fn into_track(self, fallback_url: &str) -> Result<Track, SourceError> {
        let stream = self
            .url
            .ok_or_else(|| SourceError::NoStream(fallback_url.to_string()))?;
        Ok(Track {
            title: self.title.unwrap_or_else(|| "Unknown title".to_string()),
            source_url: self.webpage_url.unwrap_or_else(|| fallback_url.to_string()),
            playable_locator: stream,
            kind: TrackKind::Remote,
            decode_params: DecodeParams::remote(),
            duration: self.duration.map(|d| d.max(0.0) as u64),
            thumbnail: self.thumbnail,
        })
    }
}

#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<MediaInfo, SourceError>;
}

/// Resolves through the `yt-dlp` executable.
pub struct YtDlp {
    binary: String,
}

impl YtDlp {
    pub fn new() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
        }
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaResolver for YtDlp {
    async fn resolve(&self, query: &str) -> Result<MediaInfo, SourceError> {
        let output = Command::new(&self.binary)
            .args(["-J", "-f", "bestaudio/best", "--no-warnings", query])
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SourceError::Resolver(stderr.trim().to_string()));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

pub fn looks_like_url(text: &str) -> bool {
    let text = text.trim().to_lowercase();
    ["http://", "https://", "www.", "file://"]
        .iter()
        .any(|prefix| text.starts_with(prefix))
}

/// Turns a `file://` locator into a path. `None` for other schemes and for
/// files that do not exist.
pub fn parse_file_url(text: &str) -> Option<String> {
    let raw = text.strip_prefix("file://")?;
    let path = percent_decode_str(raw).decode_utf8_lossy().into_owned();
    if Path::new(&path).is_file() {
        Some(path)
    } else {
        error!("File not found: {path}");
        None
    }
}

/// Resolves free-form input into playable tracks. Failures are logged and
/// come back as an empty list.
pub async fn extract_tracks(
    resolver: &dyn MediaResolver,
    input: &str,
    allow_search: bool,
) -> Vec<Track> {
    let input = input.trim();

    if input.starts_with("file://") {
        return match parse_file_url(input) {
            Some(path) => {
                let title = Path::new(&path)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.clone());
                vec![Track::local(title, input.to_string(), path)]
            }
            None => vec![],
        };
    }

    let searching = !looks_like_url(input);
    if searching && !allow_search {
        return vec![];
    }
    let query = if searching {
        format!("ytsearch1:{input}")
    } else {
        input.to_string()
    };

    match resolve_tracks(resolver, &query, searching).await {
        Ok(tracks) => tracks,
        Err(e) => {
            error!("Error fetching audio for {input:?}: {e}");
            vec![]
        }
    }
}

async fn resolve_tracks(
    resolver: &dyn MediaResolver,
    query: &str,
    searching: bool,
) -> Result<Vec<Track>, SourceError> {
    let info = resolver.resolve(query).await?;

    if info.is_playlist() && !searching {
        let mut tracks = Vec::with_capacity(info.entries.len());
        for entry in info.entries.into_iter().flatten() {
            let entry = if entry.is_flat() {
                let Some(page) = entry.page_url().map(str::to_string) else {
                    warn!("Skipping playlist entry without a URL");
                    continue;
                };
                resolver.resolve(&page).await?
            } else {
                entry
            };
            tracks.push(entry.into_track(query)?);
        }
        return Ok(tracks);
    }

    if !info.entries.is_empty() {
        let first = info
            .entries
            .into_iter()
            .flatten()
            .next()
            .ok_or_else(|| SourceError::NoMatch(query.to_string()))?;
        let page = first
            .page_url()
            .ok_or_else(|| SourceError::NoMatch(query.to_string()))?
            .to_string();
        let full = resolver.resolve(&page).await?;
        return Ok(vec![full.into_track(&page)?]);
    }

    Ok(vec![info.into_track(query)?])
}
