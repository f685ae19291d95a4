pub mod ytdlp;

use anyhow::Result;
use serde::Deserialize;
use serenity::model::id::UserId;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{MusicError, MusicResult};

pub use ytdlp::YtDlp;

/// Title used when the lookup does not report one.
pub const UNKNOWN_TITLE: &str = "Unknown title";

/// Who queued a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    id: UserId,
    display_name: String,
}

impl Requester {
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Discord mention markup for the requester.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// A resolved, playable track. Immutable once built by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    title: String,
    stream_url: String,
    page_url: String,
    requester: Requester,
}

impl Track {
    pub fn new(
        title: Option<String>,
        stream_url: String,
        page_url: String,
        requester: Requester,
    ) -> Self {
        Self {
            title: title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            stream_url,
            page_url,
            requester,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// URI the transport reads audio from.
    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }

    /// Human-navigable page for the track, may be empty.
    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    pub fn requester(&self) -> &Requester {
        &self.requester
    }
}

/// Metadata returned by the media lookup. Only the fields the resolver
/// reads are modelled; everything else in the payload is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaInfo {
    pub title: Option<String>,
    pub url: Option<String>,
    pub webpage_url: Option<String>,
    pub original_url: Option<String>,
    pub entries: Option<Vec<Option<MediaInfo>>>,
}

impl MediaInfo {
    fn page_url(&self) -> String {
        self.webpage_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| self.original_url.as_deref().filter(|u| !u.is_empty()))
            .unwrap_or_default()
            .to_string()
    }

    fn into_track(self, requester: &Requester) -> Option<Track> {
        let page_url = self.page_url();
        let stream_url = self.url.filter(|u| !u.is_empty())?;
        Some(Track::new(self.title, stream_url, page_url, requester.clone()))
    }
}

/// Blocking lookup turning a query or URI into media metadata.
///
/// Implementations are allowed to block for as long as the network takes;
/// [`TrackResolver`] always calls them from the blocking thread pool.
#[cfg_attr(test, mockall::automock)]
pub trait MediaLookup: Send + Sync {
    fn extract_info(&self, query: &str) -> Result<MediaInfo>;
}

/// Flattens lookup output into tracks, preserving result order.
///
/// Null entries and entries without a stream URL are dropped silently.
pub fn tracks_from_info(info: MediaInfo, requester: &Requester) -> Vec<Track> {
    match info.entries {
        Some(entries) => entries
            .into_iter()
            .flatten()
            .filter_map(|entry| entry.into_track(requester))
            .collect(),
        None => info.into_track(requester).into_iter().collect(),
    }
}

/// Resolves user queries into [`Track`]s off the async scheduler.
#[derive(Clone)]
pub struct TrackResolver {
    lookup: Arc<dyn MediaLookup>,
}

impl TrackResolver {
    pub fn new(lookup: Arc<dyn MediaLookup>) -> Self {
        Self { lookup }
    }

    /// Runs the lookup on the blocking pool and converts the result.
    ///
    /// An empty vector means "nothing found" and is not an error. Failures
    /// of the lookup itself come back as [`MusicError::Resolution`].
    pub async fn fetch_tracks(&self, query: &str, requester: &Requester) -> MusicResult<Vec<Track>> {
        info!("🔍 Resolviendo: {}", query);

        let lookup = self.lookup.clone();
        let owned_query = query.to_string();
        let info = tokio::task::spawn_blocking(move || lookup.extract_info(&owned_query))
            .await
            .map_err(|e| MusicError::Resolution(format!("lookup task failed: {e}")))?
            .map_err(|e| MusicError::Resolution(e.to_string()))?;

        let tracks = tracks_from_info(info, requester);
        debug!("{} pista(s) resueltas para: {}", tracks.len(), query);
        Ok(tracks)
    }
}
