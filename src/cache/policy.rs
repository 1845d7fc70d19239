//! Video caching policy
//!
//! A video is worth persisting only when it is a single-file format (not a
//! segmented/streaming manifest) and its size lies in `[min_bytes, max_bytes]`.
//! Images are always cached and never consult this policy.

use serde::{Deserialize, Serialize};

use super::fetch::MediaFetcher;

/// 1 MiB
pub const DEFAULT_MIN_BYTES: u64 = 1024 * 1024;

/// 20 MiB
pub const DEFAULT_MAX_BYTES: u64 = 20 * 1024 * 1024;

/// Extensions of progressive, single-file video containers
const SINGLE_FILE_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "webm", "mkv", "3gp"];

/// Outcome of a policy evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PolicyDecision {
    /// Download and keep a local copy
    Cache { bytes: u64 },
    /// Extension is not a single-file format
    SkipFormat,
    /// Size is outside the configured interval
    SkipSize { bytes: u64 },
    /// Size probe failed
    SkipUnknownSize,
}

impl PolicyDecision {
    pub fn should_cache(&self) -> bool {
        matches!(self, PolicyDecision::Cache { .. })
    }
}

/// Size/format rule for video caching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoCachePolicy {
    pub min_bytes: u64,
    pub max_bytes: u64,
}

impl Default for VideoCachePolicy {
    fn default() -> Self {
        Self {
            min_bytes: DEFAULT_MIN_BYTES,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl VideoCachePolicy {
    pub fn new(min_bytes: u64, max_bytes: u64) -> Self {
        Self {
            min_bytes,
            max_bytes,
        }
    }

    /// Closed-interval size check
    pub fn accepts_size(&self, bytes: u64) -> bool {
        bytes >= self.min_bytes && bytes <= self.max_bytes
    }

    /// Whether the url's extension names a single-file container
    pub fn accepts_format(&self, url: &str) -> bool {
        url_extension(url)
            .map(|ext| SINGLE_FILE_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }

    /// Evaluate the policy, probing the size only when the format qualifies
    pub async fn evaluate(&self, url: &str, fetcher: &dyn MediaFetcher) -> PolicyDecision {
        if !self.accepts_format(url) {
            return PolicyDecision::SkipFormat;
        }

        match fetcher.content_length(url).await {
            Ok(bytes) if self.accepts_size(bytes) => PolicyDecision::Cache { bytes },
            Ok(bytes) => PolicyDecision::SkipSize { bytes },
            Err(e) => {
                tracing::warn!("policy: size probe failed url='{}': {}", url, e);
                PolicyDecision::SkipUnknownSize
            }
        }
    }
}

/// Lowercased extension of the url path, ignoring query and fragment
pub fn url_extension(url: &str) -> Option<String> {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or(url)
            .to_string(),
    };

    let name = path.rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_extension() {
        assert_eq!(url_extension("https://x/a/b.MP4?sig=1#t=3").as_deref(), Some("mp4"));
        assert_eq!(url_extension("https://x/live/index.m3u8").as_deref(), Some("m3u8"));
        assert_eq!(url_extension("https://x/video").as_deref(), None);
        assert_eq!(url_extension("https://x/.hidden").as_deref(), None);
        assert_eq!(url_extension("clip.webm").as_deref(), Some("webm"));
    }

    #[test]
    fn test_accepts_format() {
        let policy = VideoCachePolicy::default();
        assert!(policy.accepts_format("https://x/a.mp4"));
        assert!(policy.accepts_format("https://x/a.mov?token=abc"));
        assert!(!policy.accepts_format("https://x/a.m3u8"));
        assert!(!policy.accepts_format("https://x/manifest.mpd"));
        assert!(!policy.accepts_format("https://x/stream"));
    }

    #[test]
    fn test_size_interval_is_closed() {
        let policy = VideoCachePolicy::new(100, 200);
        assert!(!policy.accepts_size(99));
        assert!(policy.accepts_size(100));
        assert!(policy.accepts_size(200));
        assert!(!policy.accepts_size(201));
    }

    #[test]
    fn test_default_thresholds() {
        let policy = VideoCachePolicy::default();
        assert_eq!(policy.min_bytes, 1_048_576);
        assert_eq!(policy.max_bytes, 20_971_520);
    }
}
