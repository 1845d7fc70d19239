//! Data structures shared across the media subsystem
//!
//! Organized by concern:
//! - **Media**: remote media references and their kinds
//! - **Cache**: per-url cache records and resolved sources
//! - **Feed**: identifiers for playable feed items

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// =============================================================================
// Media Models
// =============================================================================

/// Kind of remote media, selects the cache directory and caching policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Name of the flat cache directory for this kind
    pub fn dir_name(&self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Reference to remote media content. Identity is the url.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    pub kind: MediaKind,
}

impl MediaRef {
    pub fn new(url: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self::new(url, MediaKind::Image)
    }

    pub fn video(url: impl Into<String>) -> Self {
        Self::new(url, MediaKind::Video)
    }
}

impl PartialEq for MediaRef {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for MediaRef {}

impl std::hash::Hash for MediaRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.url, self.kind)
    }
}

// =============================================================================
// Cache Models
// =============================================================================

/// Lifecycle state of a cache record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    /// Not yet probed
    Miss,
    /// Disk probe, policy check or download in flight
    Downloading,
    /// Local copy present on disk
    Hit,
    /// Policy rejected or resolution failed; served from the network
    Failed,
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CacheState::Miss => "miss",
            CacheState::Downloading => "downloading",
            CacheState::Hit => "hit",
            CacheState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Snapshot of the in-memory index entry for one url
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub key: String,
    pub remote_url: String,
    pub local_path: Option<PathBuf>,
    pub state: CacheState,
}

/// A playable/displayable source handed to the view layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum MediaSource {
    /// Locally cached copy
    Local { path: PathBuf },
    /// Original remote url (provisional, policy skip, or failure)
    Remote { url: String },
}

impl MediaSource {
    pub fn remote(url: impl Into<String>) -> Self {
        MediaSource::Remote { url: url.into() }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, MediaSource::Local { .. })
    }

    /// Path or url suitable for handing to a player
    pub fn location(&self) -> String {
        match self {
            MediaSource::Local { path } => path.display().to_string(),
            MediaSource::Remote { url } => url.clone(),
        }
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaSource::Local { path } => write!(f, "local:{}", path.display()),
            MediaSource::Remote { url } => write!(f, "remote:{}", url),
        }
    }
}

// =============================================================================
// Feed Models
// =============================================================================

/// Stable id of a playable feed item, the coordinator's registration key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedItemId(String);

impl FeedItemId {
    /// Id of a single-video post or reel
    pub fn post(post_id: impl fmt::Display) -> Self {
        Self(post_id.to_string())
    }

    /// Id of one video inside a multi-video carousel
    pub fn carousel(post_id: impl fmt::Display, index: usize) -> Self {
        Self(format!("{}_video_{}", post_id, index))
    }

    /// Id of the video inside a shared/nested post
    pub fn shared(post_id: impl fmt::Display) -> Self {
        Self(format!("{}_shared", post_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FeedItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FeedItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for FeedItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
