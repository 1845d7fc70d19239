//! reelplay - feed media cache and playback coordinator
//!
//! Local caching for remote feed media plus the bookkeeping that keeps at
//! most one feed video playing.
//!
//! # Modules
//!
//! - `models` - Media references, cache records, resolved sources, feed ids
//! - `cache` - Cache key codec, fetcher, video policy and the disk cache
//! - `playback` - Player handles, preload registry and window, coordinator
//! - `config` - TOML configuration
//! - `service` - Long-lived owner of the caches and playback state

pub mod cache;
pub mod config;
pub mod models;
pub mod playback;
pub mod service;

mod sync;

// Re-export commonly used types
pub use models::{CacheRecord, CacheState, FeedItemId, MediaKind, MediaRef, MediaSource};

pub use cache::{
    CacheError, FetchError, HttpFetcher, MediaDiskCache, MediaFetcher, MountGuard, PendingSource,
    PolicyDecision, Resolution, VideoCachePolicy,
};
pub use config::Config;
pub use playback::{
    CoordinatorState, PlaybackCoordinator, PlayerFactory, PlayerHandle, PreloadWindow,
    PreloadedPlayerRegistry, SharedPlayer,
};
pub use service::MediaService;
