//! Per-kind media disk cache
//!
//! Resolves a [`MediaRef`] to a local file, downloading on demand.
//!
//! Layout: one flat directory per media kind, file names from
//! [`key::encode`](super::key::encode), no extension, no manifest. File
//! presence is the only source of truth; the in-memory index is rebuilt from
//! disk probes as urls are requested.
//!
//! Resolution never fails. A hit in the index is answered synchronously;
//! anything else returns [`Resolution::Pending`] carrying the remote url for
//! immediate display, and the final source is published once the background
//! task settles. Concurrent requests for a url already in flight join that
//! flight instead of starting another transfer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::fetch::{FetchError, MediaFetcher};
use super::key;
use super::policy::VideoCachePolicy;
use crate::models::{CacheRecord, CacheState, MediaKind, MediaRef, MediaSource};
use crate::sync::lock;

/// Errors inside the cache's error boundary. Never returned from `resolve`.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O on {path} failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl CacheError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError {
        let path = path.to_path_buf();
        move |source| CacheError::Io { path, source }
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Result of [`MediaDiskCache::resolve`]
#[derive(Debug)]
pub enum Resolution {
    /// Final source, available now
    Ready(MediaSource),
    /// Final source still being determined
    Pending(PendingSource),
}

impl Resolution {
    /// Source to display right now
    pub fn current(&self) -> MediaSource {
        match self {
            Resolution::Ready(source) => source.clone(),
            Resolution::Pending(pending) => pending.provisional().clone(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Resolution::Ready(_))
    }

    /// Wait for the final source
    pub async fn settled(self) -> MediaSource {
        match self {
            Resolution::Ready(source) => source,
            Resolution::Pending(pending) => pending.settled().await,
        }
    }
}

/// Subscription to an in-flight resolution
#[derive(Debug)]
pub struct PendingSource {
    provisional: MediaSource,
    rx: watch::Receiver<Option<MediaSource>>,
}

impl PendingSource {
    /// The remote url, usable until the final source arrives
    pub fn provisional(&self) -> &MediaSource {
        &self.provisional
    }

    /// Wait for the final source. Falls back to the provisional source if the
    /// flight is abandoned.
    pub async fn settled(mut self) -> MediaSource {
        let settled = match self.rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        settled.unwrap_or(self.provisional)
    }

    /// Deliver the final source to `apply`, but only if `guard` is still
    /// mounted at that point. The download itself is never cancelled.
    pub fn deliver_to<F>(self, guard: MountGuard, apply: F)
    where
        F: FnOnce(MediaSource) + Send + 'static,
    {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("cache: no runtime to deliver resolution, dropping callback");
            return;
        };
        handle.spawn(async move {
            let source = self.settled().await;
            if guard.is_mounted() {
                apply(source);
            } else {
                debug!("cache: requester unmounted, discarding {}", source);
            }
        });
    }
}

/// "Still mounted" flag shared between a view and its pending resolutions
#[derive(Debug, Clone)]
pub struct MountGuard {
    mounted: Arc<AtomicBool>,
}

impl MountGuard {
    pub fn new() -> Self {
        Self {
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
    }
}

impl Default for MountGuard {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Cache
// =============================================================================

#[derive(Debug)]
enum Entry {
    Downloading {
        flight: u64,
        rx: watch::Receiver<Option<MediaSource>>,
    },
    Hit(PathBuf),
    Failed,
}

struct Inner {
    kind: MediaKind,
    dir: PathBuf,
    policy: VideoCachePolicy,
    fetcher: Arc<dyn MediaFetcher>,
    index: Mutex<HashMap<String, Entry>>,
    next_flight: AtomicU64,
}

/// Cache manager for one media kind. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct MediaDiskCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MediaDiskCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaDiskCache")
            .field("kind", &self.inner.kind)
            .field("dir", &self.inner.dir)
            .field("policy", &self.inner.policy)
            .finish()
    }
}

impl MediaDiskCache {
    /// Create a cache storing `kind` media under `dir`.
    ///
    /// `policy` only applies to videos.
    pub fn new(
        kind: MediaKind,
        dir: impl Into<PathBuf>,
        policy: VideoCachePolicy,
        fetcher: Arc<dyn MediaFetcher>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                kind,
                dir: dir.into(),
                policy,
                fetcher,
                index: Mutex::new(HashMap::new()),
                next_flight: AtomicU64::new(0),
            }),
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.inner.kind
    }

    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Where `url` is (or would be) stored
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.inner.dir.join(key::encode(url))
    }

    /// Resolve `media` to a displayable source without blocking.
    pub fn resolve(&self, media: &MediaRef) -> Resolution {
        let url = media.url.as_str();
        let remote = MediaSource::remote(url);

        let (runtime, flight, rx) = {
            let mut index = lock(&self.inner.index);
            match index.get(url) {
                Some(Entry::Hit(path)) => {
                    debug!("cache[{}]: index hit url='{}'", self.inner.kind, url);
                    return Resolution::Ready(MediaSource::Local { path: path.clone() });
                }
                Some(Entry::Downloading { rx, .. }) => {
                    debug!("cache[{}]: joining flight url='{}'", self.inner.kind, url);
                    return Resolution::Pending(PendingSource {
                        provisional: remote,
                        rx: rx.clone(),
                    });
                }
                Some(Entry::Failed) | None => {}
            }

            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                warn!(
                    "cache[{}]: no async runtime, passing through url='{}'",
                    self.inner.kind, url
                );
                return Resolution::Ready(remote);
            };

            // Marker goes in before the first await so a concurrent request
            // cannot start a second flight.
            let id = self.inner.next_flight.fetch_add(1, Ordering::Relaxed);
            let (tx, rx) = watch::channel(None);
            index.insert(
                url.to_string(),
                Entry::Downloading {
                    flight: id,
                    rx: rx.clone(),
                },
            );

            let flight = Flight {
                inner: Arc::clone(&self.inner),
                url: url.to_string(),
                id,
                tx: Some(tx),
            };
            (runtime, flight, rx)
        };

        // Spawned outside the index lock: a refused spawn drops the flight,
        // which publishes through the same lock.
        runtime.spawn(async move {
            let mut flight = flight;
            let source = flight.inner.resolve_uncached(&flight.url).await;
            flight.publish(source);
        });

        debug!("cache[{}]: miss, resolving url='{}'", self.inner.kind, url);
        Resolution::Pending(PendingSource {
            provisional: remote,
            rx,
        })
    }

    /// Drop the in-memory record for `media`. Files on disk are kept.
    pub fn invalidate(&self, media: &MediaRef) {
        if lock(&self.inner.index).remove(&media.url).is_some() {
            debug!("cache[{}]: invalidated url='{}'", self.inner.kind, media.url);
        }
    }

    /// Snapshot of the index entry for `url`
    pub fn record(&self, url: &str) -> CacheRecord {
        let (local_path, state) = match lock(&self.inner.index).get(url) {
            Some(Entry::Hit(path)) => (Some(path.clone()), CacheState::Hit),
            Some(Entry::Downloading { .. }) => (None, CacheState::Downloading),
            Some(Entry::Failed) => (None, CacheState::Failed),
            None => (None, CacheState::Miss),
        };
        CacheRecord {
            key: key::encode(url),
            remote_url: url.to_string(),
            local_path,
            state,
        }
    }

    /// Number of urls in the in-memory index
    pub fn indexed(&self) -> usize {
        lock(&self.inner.index).len()
    }

    /// Drop the whole index and delete the kind's directory.
    ///
    /// Flights still running finish their transfer but no longer publish into
    /// the index.
    pub async fn clear(&self) -> Result<(), CacheError> {
        lock(&self.inner.index).clear();
        debug!("cache[{}]: cleared index", self.inner.kind);

        match tokio::fs::remove_dir_all(&self.inner.dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(&self.inner.dir)(e)),
        }
    }
}

/// One background resolution. Publishes exactly once: the real outcome, or
/// the remote url when the task panics or is dropped first.
struct Flight {
    inner: Arc<Inner>,
    url: String,
    id: u64,
    tx: Option<watch::Sender<Option<MediaSource>>>,
}

impl Flight {
    fn publish(&mut self, source: MediaSource) {
        if let Some(tx) = self.tx.take() {
            self.inner.complete(&self.url, self.id, &source);
            let _ = tx.send(Some(source));
        }
    }
}

impl Drop for Flight {
    fn drop(&mut self) {
        if self.tx.is_some() {
            warn!(
                "cache[{}]: flight ended without a result, falling back url='{}'",
                self.inner.kind, self.url
            );
            let remote = MediaSource::remote(self.url.clone());
            self.publish(remote);
        }
    }
}

impl Inner {
    /// Error boundary around the whole I/O path
    async fn resolve_uncached(&self, url: &str) -> MediaSource {
        match self.try_cache(url).await {
            Ok(Some(path)) => MediaSource::Local { path },
            Ok(None) => MediaSource::remote(url),
            Err(e) => {
                warn!("cache[{}]: falling back to network url='{}': {}", self.kind, url, e);
                MediaSource::remote(url)
            }
        }
    }

    async fn try_cache(&self, url: &str) -> Result<Option<PathBuf>, CacheError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(CacheError::io(&self.dir))?;

        let path = self.dir.join(key::encode(url));
        if tokio::fs::try_exists(&path)
            .await
            .map_err(CacheError::io(&path))?
        {
            debug!("cache[{}]: disk hit url='{}'", self.kind, url);
            return Ok(Some(path));
        }

        if self.kind == MediaKind::Video {
            let decision = self.policy.evaluate(url, self.fetcher.as_ref()).await;
            if !decision.should_cache() {
                debug!("cache[{}]: policy skip url='{}' {:?}", self.kind, url, decision);
                return Ok(None);
            }
        }

        debug!("cache[{}]: downloading url='{}'", self.kind, url);
        self.fetcher.download(url, &path).await?;
        Ok(Some(path))
    }

    /// Publish a flight's outcome, unless the record was dropped meanwhile
    fn complete(&self, url: &str, flight: u64, source: &MediaSource) {
        let mut index = lock(&self.index);
        let current = matches!(
            index.get(url),
            Some(Entry::Downloading { flight: f, .. }) if *f == flight
        );
        if !current {
            debug!("cache[{}]: stale flight for url='{}', not indexed", self.kind, url);
            return;
        }

        let entry = match source {
            MediaSource::Local { path } => Entry::Hit(path.clone()),
            MediaSource::Remote { .. } => Entry::Failed,
        };
        index.insert(url.to_string(), entry);
    }
}
