//! Media service
//!
//! The single long-lived owner of the image cache, the video cache, the
//! preloaded player registry and the playback coordinator. Constructed once at
//! startup and passed by reference to whatever needs media.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::cache::{CacheError, HttpFetcher, MediaDiskCache, MediaFetcher, Resolution, VideoCachePolicy};
use crate::config::Config;
use crate::models::{MediaKind, MediaRef};
use crate::playback::{
    PlaybackCoordinator, PlayerFactory, PreloadWindow, PreloadedPlayerRegistry, SharedPlayer,
};

/// Owner of all media caching and playback state
#[derive(Debug, Clone)]
pub struct MediaService {
    root: PathBuf,
    images: MediaDiskCache,
    videos: MediaDiskCache,
    registry: PreloadedPlayerRegistry,
    coordinator: PlaybackCoordinator,
}

impl MediaService {
    /// Create a service caching under `root` with the given fetcher
    pub fn new(
        root: impl Into<PathBuf>,
        policy: VideoCachePolicy,
        fetcher: Arc<dyn MediaFetcher>,
    ) -> Self {
        let root = root.into();
        let images = MediaDiskCache::new(
            MediaKind::Image,
            root.join(MediaKind::Image.dir_name()),
            policy,
            Arc::clone(&fetcher),
        );
        let videos = MediaDiskCache::new(
            MediaKind::Video,
            root.join(MediaKind::Video.dir_name()),
            policy,
            fetcher,
        );
        debug!("service: cache root '{}'", root.display());

        Self {
            root,
            images,
            videos,
            registry: PreloadedPlayerRegistry::new(),
            coordinator: PlaybackCoordinator::new(),
        }
    }

    /// Create a service from configuration, fetching over HTTP
    pub fn from_config(config: &Config) -> Self {
        let fetcher = Arc::new(HttpFetcher::new(config.http_timeout()));
        Self::new(config.cache_root(), config.policy(), fetcher)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cache manager for `kind`
    pub fn cache(&self, kind: MediaKind) -> &MediaDiskCache {
        match kind {
            MediaKind::Image => &self.images,
            MediaKind::Video => &self.videos,
        }
    }

    pub fn registry(&self) -> &PreloadedPlayerRegistry {
        &self.registry
    }

    pub fn coordinator(&self) -> &PlaybackCoordinator {
        &self.coordinator
    }

    /// Resolve `media` through the cache for its kind. Never fails.
    pub fn resolve(&self, media: &MediaRef) -> Resolution {
        self.cache(media.kind).resolve(media)
    }

    /// Player for a view about to mount: a preloaded one if available
    /// (ownership moves to the caller), otherwise a fresh one.
    pub fn acquire_player(&self, media: &MediaRef, factory: &dyn PlayerFactory) -> SharedPlayer {
        match self.registry.take(&media.url) {
            Some(handle) => {
                debug!("service: using preloaded player url='{}'", media.url);
                handle
            }
            None => factory.create(media),
        }
    }

    /// Preload window over this service's registry
    pub fn preload_window(
        &self,
        factory: Arc<dyn PlayerFactory>,
        capacity: usize,
        warmup: Duration,
    ) -> PreloadWindow {
        PreloadWindow::new(self.registry.clone(), factory)
            .with_capacity(capacity)
            .with_warmup(warmup)
    }

    /// Release every preloaded player, drop both indexes and delete the
    /// cached files. Both kinds are cleared even if one fails; the first
    /// error is returned.
    pub async fn clear_all(&self) -> Result<(), CacheError> {
        self.registry.clear_all();
        let images = self.images.clear().await;
        let videos = self.videos.clear().await;
        images.and(videos)?;
        info!("service: cleared all media caches under '{}'", self.root.display());
        Ok(())
    }
}
