//! Preload window
//!
//! Producer side of the registry. Given the items about to scroll into view,
//! builds players for the next N videos, primes each one (play, wait the
//! warm-up interval, pause) and registers it. As the window slides, entries
//! that fell out of it are removed oldest first so at most N stay warm.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::handle::{PlayerFactory, SharedPlayer};
use super::registry::PreloadedPlayerRegistry;
use crate::models::{MediaKind, MediaRef};

/// Default number of upcoming videos kept warm
pub const DEFAULT_WINDOW: usize = 3;

/// Default play-then-pause interval while priming
pub const DEFAULT_WARMUP: Duration = Duration::from_millis(350);

/// How long a new player may take to become ready before it is abandoned
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(5);

const READY_POLL: Duration = Duration::from_millis(25);

/// Sliding window of warmed players over a feed
pub struct PreloadWindow {
    registry: PreloadedPlayerRegistry,
    factory: Arc<dyn PlayerFactory>,
    capacity: usize,
    warmup: Duration,
    ready_timeout: Duration,
    /// Urls this window registered, oldest first
    warmed: VecDeque<String>,
}

impl std::fmt::Debug for PreloadWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreloadWindow")
            .field("capacity", &self.capacity)
            .field("warmup", &self.warmup)
            .field("warmed", &self.warmed)
            .finish()
    }
}

impl PreloadWindow {
    pub fn new(registry: PreloadedPlayerRegistry, factory: Arc<dyn PlayerFactory>) -> Self {
        Self {
            registry,
            factory,
            capacity: DEFAULT_WINDOW,
            warmup: DEFAULT_WARMUP,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            warmed: VecDeque::new(),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Urls currently tracked by this window, oldest first
    pub fn warmed(&self) -> Vec<String> {
        self.warmed.iter().cloned().collect()
    }

    /// Warm the first `capacity` videos of `upcoming` and slide the window.
    ///
    /// Returns how many players were newly registered.
    pub async fn advance(&mut self, upcoming: &[MediaRef]) -> usize {
        let window: Vec<&MediaRef> = upcoming
            .iter()
            .filter(|m| m.kind == MediaKind::Video && !m.url.is_empty())
            .take(self.capacity)
            .collect();

        let mut targets: Vec<&MediaRef> = Vec::new();
        for &media in &window {
            if !self.registry.contains(&media.url)
                && !targets.iter().any(|t| t.url == media.url)
            {
                targets.push(media);
            }
        }

        let primed = join_all(targets.iter().map(|m| self.prime(m))).await;

        let mut added = 0;
        for (media, handle) in targets.iter().zip(primed) {
            let Some(handle) = handle else { continue };
            if self.registry.contains(&media.url) {
                // Someone registered it while we were priming
                handle.release();
                continue;
            }
            self.registry.register(&media.url, handle);
            self.warmed.retain(|u| u != &media.url);
            self.warmed.push_back(media.url.clone());
            added += 1;
        }

        self.evict(&window);
        added
    }

    /// Remove every entry this window registered
    pub fn drain(&mut self) {
        for url in self.warmed.drain(..) {
            self.registry.remove(&url);
        }
    }

    /// Drop entries beyond capacity, preferring those outside the window
    fn evict(&mut self, window: &[&MediaRef]) {
        // Entries handed off to a viewer no longer count against the window
        let registry = &self.registry;
        self.warmed.retain(|u| registry.contains(u));

        while self.warmed.len() > self.capacity {
            let victim = self
                .warmed
                .iter()
                .position(|u| !window.iter().any(|m| &m.url == u))
                .unwrap_or(0);
            if let Some(url) = self.warmed.remove(victim) {
                debug!("preload: evicting url='{}'", url);
                self.registry.remove(&url);
            }
        }
    }

    async fn prime(&self, media: &MediaRef) -> Option<SharedPlayer> {
        let handle = self.factory.create(media);

        let deadline = Instant::now() + self.ready_timeout;
        while !handle.is_ready() {
            if Instant::now() >= deadline {
                warn!("preload: player never became ready url='{}'", media.url);
                handle.release();
                return None;
            }
            tokio::time::sleep(READY_POLL).await;
        }

        handle.play();
        tokio::time::sleep(self.warmup).await;
        handle.pause();
        debug!("preload: primed url='{}'", media.url);
        Some(handle)
    }
}
