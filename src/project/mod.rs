//! Playlist and track management
//!
//! Tracks, their byte sources, the playlist model and playlist files.

pub mod bundle;
pub mod playlist;
pub mod schema;

pub use bundle::{read_playlist, write_playlist, BundleError};
pub use playlist::{parse_youtube_url, Playlist, YouTubeRef};
pub use schema::{SourceHandle, Track, TrackKind};
