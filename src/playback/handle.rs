//! Player handle abstraction
//!
//! The coordinator and the preload registry never see a concrete platform
//! player. They work against [`PlayerHandle`], and players are built through
//! a [`PlayerFactory`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::models::MediaRef;

/// Capability to play/pause one media resource.
///
/// Implementations own their decode/network resources. `release` may be
/// called more than once, by different owners, and must free resources at
/// most once. `play` and `pause` after `release` are no-ops. Handles must not
/// call back into the coordinator from `play` or `pause`.
pub trait PlayerHandle: Send + Sync {
    fn play(&self);

    fn pause(&self);

    /// Whether the decode pipeline is primed and `play` will start output
    fn is_ready(&self) -> bool;

    /// Free decode/network resources
    fn release(&self) {}
}

/// Shared handle as stored by the registry and the coordinator
pub type SharedPlayer = Arc<dyn PlayerHandle>;

/// Constructs player handles for media
pub trait PlayerFactory: Send + Sync {
    fn create(&self, media: &MediaRef) -> SharedPlayer;
}

impl<F> PlayerFactory for F
where
    F: Fn(&MediaRef) -> SharedPlayer + Send + Sync,
{
    fn create(&self, media: &MediaRef) -> SharedPlayer {
        self(media)
    }
}

// =============================================================================
// Logging Player
// =============================================================================

/// Headless handle that records its transitions in the log.
///
/// Used by the `feed` simulation, where no real decoder is attached.
#[derive(Debug)]
pub struct LoggingPlayer {
    url: String,
    ready: AtomicBool,
    playing: AtomicBool,
    released: AtomicBool,
    plays: AtomicUsize,
    pauses: AtomicUsize,
}

impl LoggingPlayer {
    pub fn new(url: impl Into<String>, ready: bool) -> Self {
        Self {
            url: url.into(),
            ready: AtomicBool::new(ready),
            playing: AtomicBool::new(false),
            released: AtomicBool::new(false),
            plays: AtomicUsize::new(0),
            pauses: AtomicUsize::new(0),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Mark the pipeline primed
    pub fn set_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::Relaxed)
    }

    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::Relaxed)
    }
}

impl PlayerHandle for LoggingPlayer {
    fn play(&self) {
        if self.is_released() {
            return;
        }
        self.plays.fetch_add(1, Ordering::Relaxed);
        self.playing.store(true, Ordering::Release);
        debug!("player: play url='{}'", self.url);
    }

    fn pause(&self) {
        if self.is_released() {
            return;
        }
        self.pauses.fetch_add(1, Ordering::Relaxed);
        self.playing.store(false, Ordering::Release);
        debug!("player: pause url='{}'", self.url);
    }

    fn is_ready(&self) -> bool {
        !self.is_released() && self.ready.load(Ordering::Acquire)
    }

    fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.playing.store(false, Ordering::Release);
            debug!("player: released url='{}'", self.url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_is_idempotent() {
        let player = LoggingPlayer::new("https://x/v.mp4", true);
        player.play();
        player.release();
        player.release();
        assert!(player.is_released());
        assert!(!player.is_playing());
        assert!(!player.is_ready());
    }

    #[test]
    fn test_released_player_ignores_play() {
        let player = LoggingPlayer::new("https://x/v.mp4", true);
        player.release();
        player.play();
        assert_eq!(player.plays(), 0);
    }

    #[test]
    fn test_closure_factory() {
        let factory = |media: &MediaRef| -> SharedPlayer {
            Arc::new(LoggingPlayer::new(media.url.clone(), false))
        };
        let handle = factory.create(&MediaRef::video("https://x/v.mp4"));
        assert!(!handle.is_ready());
    }
}
