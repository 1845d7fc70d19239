//! Configuration management for reelplay
//!
//! Config is stored at ~/.config/reelplay/config.toml. Every field is
//! optional; missing values fall back to the built-in defaults.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::VideoCachePolicy;
use crate::playback::preload::{DEFAULT_WARMUP, DEFAULT_WINDOW};
use crate::playback::PlayerType;

/// Environment variable overriding the cache root
pub const CACHE_DIR_ENV: &str = "REELPLAY_CACHE_DIR";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Cache root override (default: platform cache dir)
    pub cache_dir: Option<PathBuf>,
    /// Smallest video worth caching, in bytes
    pub video_min_bytes: Option<u64>,
    /// Largest video worth caching, in bytes
    pub video_max_bytes: Option<u64>,
    /// Number of upcoming videos kept warm
    pub preload_window: Option<usize>,
    /// Warm-up play interval in milliseconds
    pub warmup_ms: Option<u64>,
    /// HTTP request timeout in seconds
    pub http_timeout_secs: Option<u64>,
    /// Local player for `open`
    pub player: Option<PlayerType>,
}

impl Config {
    /// Get config file path (~/.config/reelplay/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("reelplay").join("config.toml"))
    }

    /// Load config from the default path, or return default if not found
    pub fn load() -> Self {
        Self::path()
            .map(|p| Self::load_from(&p))
            .unwrap_or_default()
    }

    /// Load config from `path`, or return default if missing or invalid
    pub fn load_from(path: &Path) -> Self {
        let config = std::fs::read_to_string(path)
            .ok()
            .and_then(|s| match toml::from_str::<Config>(&s) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!("config: ignoring invalid {}: {}", path.display(), e);
                    None
                }
            })
            .unwrap_or_default();
        tracing::debug!("config: loaded from {}", path.display());
        config
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Reject settings the cache cannot work with
    pub fn validate(&self) -> Result<()> {
        let policy = self.policy();
        if policy.min_bytes > policy.max_bytes {
            anyhow::bail!(
                "video_min_bytes ({}) exceeds video_max_bytes ({})",
                policy.min_bytes,
                policy.max_bytes
            );
        }
        if self.preload_window == Some(0) {
            anyhow::bail!("preload_window must be at least 1");
        }
        Ok(())
    }

    /// Cache root with fallback chain:
    /// 1. Environment variable REELPLAY_CACHE_DIR
    /// 2. `cache_dir` from config file
    /// 3. Platform cache dir (~/.cache/reelplay)
    /// 4. System temp dir
    pub fn cache_root(&self) -> PathBuf {
        if let Some(dir) = std::env::var_os(CACHE_DIR_ENV) {
            return PathBuf::from(dir);
        }
        if let Some(dir) = &self.cache_dir {
            return dir.clone();
        }
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("reelplay")
    }

    /// Video caching policy from the configured thresholds
    pub fn policy(&self) -> VideoCachePolicy {
        let defaults = VideoCachePolicy::default();
        VideoCachePolicy::new(
            self.video_min_bytes.unwrap_or(defaults.min_bytes),
            self.video_max_bytes.unwrap_or(defaults.max_bytes),
        )
    }

    pub fn preload_window(&self) -> usize {
        self.preload_window.unwrap_or(DEFAULT_WINDOW)
    }

    pub fn warmup(&self) -> Duration {
        self.warmup_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_WARMUP)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    pub fn player(&self) -> PlayerType {
        self.player.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.cache_dir.is_none());
        assert_eq!(config.policy(), VideoCachePolicy::default());
        assert_eq!(config.preload_window(), 3);
        assert_eq!(config.warmup(), Duration::from_millis(350));
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert_eq!(config.player(), PlayerType::Vlc);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            video_max_bytes = 5000
            player = "mpv"
            "#,
        )
        .unwrap();
        assert_eq!(config.policy().max_bytes, 5000);
        assert_eq!(config.policy().min_bytes, 1024 * 1024);
        assert_eq!(config.player(), PlayerType::Mpv);
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let config = Config {
            video_min_bytes: Some(10),
            video_max_bytes: Some(5),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            cache_dir: Some(PathBuf::from("/var/cache/reels")),
            preload_window: Some(5),
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_load_missing_file_gives_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load_from(&dir.path().join("nope.toml")), Config::default());
    }
}
