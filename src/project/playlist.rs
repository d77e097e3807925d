//! Playlist model and YouTube link parsing

use super::schema::Track;
use serde::{Deserialize, Serialize};

/// Ordered list of tracks, exported front to back
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    #[serde(default)]
    pub tracks: Vec<Track>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tracks(&mut self, tracks: impl IntoIterator<Item = Track>) {
        self.tracks.extend(tracks);
    }

    pub fn add(&mut self, track: Track) {
        self.add_tracks(std::iter::once(track));
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Video and playlist ids pulled out of a YouTube link
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeRef {
    pub video_id: Option<String>,
    pub list_id: Option<String>,
}

/// Parse `youtube.com/watch?v=..&list=..` and `youtu.be/<id>` links
///
/// Anything that is not a YouTube URL yields an empty [`YouTubeRef`].
pub fn parse_youtube_url(url: &str) -> YouTubeRef {
    let Some((_, rest)) = url.trim().split_once("://") else {
        tracing::warn!("Invalid URL: {}", url);
        return YouTubeRef::default();
    };

    let rest = rest.split('#').next().unwrap_or(rest);
    let (host_and_path, query) = match rest.split_once('?') {
        Some((head, query)) => (head, Some(query)),
        None => (rest, None),
    };
    let (host, path) = match host_and_path.find('/') {
        Some(i) => (&host_and_path[..i], &host_and_path[i..]),
        None => (host_and_path, ""),
    };

    let host = host.to_ascii_lowercase();
    if !host.contains("youtube.com") && !host.contains("youtu.be") {
        return YouTubeRef::default();
    }

    let mut result = YouTubeRef::default();
    for pair in query.into_iter().flat_map(|q| q.split('&')) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = urlencoding::decode(value)
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| value.to_string());
        if value.is_empty() {
            continue;
        }
        match key {
            "v" => result.video_id = Some(value),
            "list" => result.list_id = Some(value),
            _ => {}
        }
    }

    if result.video_id.is_none() && path.len() > 1 {
        result.video_id = Some(path[1..].to_string());
    }

    result
}
