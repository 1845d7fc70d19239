//! Preloaded player registry
//!
//! url → live, already-primed player handle. Consumers look here before
//! constructing a player of their own. The registry never evicts by itself;
//! whoever warms entries removes them (see [`PreloadWindow`](super::preload::PreloadWindow)).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::handle::SharedPlayer;
use crate::sync::lock;

/// Keyed store of pre-initialized player handles. Clones share the store.
#[derive(Clone, Default)]
pub struct PreloadedPlayerRegistry {
    entries: Arc<Mutex<HashMap<String, SharedPlayer>>>,
}

impl std::fmt::Debug for PreloadedPlayerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreloadedPlayerRegistry")
            .field("len", &self.len())
            .finish()
    }
}

impl PreloadedPlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. An empty url is ignored.
    ///
    /// An overwritten handle is handed back to the caller untouched.
    pub fn register(&self, url: &str, handle: SharedPlayer) -> Option<SharedPlayer> {
        if url.is_empty() {
            return None;
        }
        debug!("registry: register url='{}'", url);
        lock(&self.entries).insert(url.to_string(), handle)
    }

    /// Pure lookup
    pub fn get(&self, url: &str) -> Option<SharedPlayer> {
        lock(&self.entries).get(url).cloned()
    }

    pub fn contains(&self, url: &str) -> bool {
        lock(&self.entries).contains_key(url)
    }

    /// Remove the entry without releasing it; ownership moves to the caller
    pub fn take(&self, url: &str) -> Option<SharedPlayer> {
        let handle = lock(&self.entries).remove(url);
        if handle.is_some() {
            debug!("registry: handed off url='{}'", url);
        }
        handle
    }

    /// Release the handle and delete the entry. Missing urls are a no-op.
    pub fn remove(&self, url: &str) {
        let handle = lock(&self.entries).remove(url);
        if let Some(handle) = handle {
            handle.release();
            debug!("registry: removed url='{}'", url);
        }
    }

    /// Release and drop every entry
    pub fn clear_all(&self) {
        let drained: Vec<(String, SharedPlayer)> = lock(&self.entries).drain().collect();
        let count = drained.len();
        for (_, handle) in drained {
            handle.release();
        }
        debug!("registry: cleared {} handles", count);
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered urls, in no particular order
    pub fn urls(&self) -> Vec<String> {
        lock(&self.entries).keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::handle::{LoggingPlayer, PlayerHandle};

    fn player(url: &str) -> Arc<LoggingPlayer> {
        Arc::new(LoggingPlayer::new(url, true))
    }

    #[test]
    fn test_register_and_get() {
        let registry = PreloadedPlayerRegistry::new();
        let p = player("u1");
        registry.register("u1", p.clone());
        assert!(registry.get("u1").is_some());
        assert!(registry.get("u2").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_ignores_empty_url() {
        let registry = PreloadedPlayerRegistry::new();
        assert!(registry.register("", player("")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_overwrites() {
        let registry = PreloadedPlayerRegistry::new();
        let first = player("u1");
        let second = player("u1");
        registry.register("u1", first.clone());
        let old = registry.register("u1", second.clone());
        assert!(old.is_some());
        assert_eq!(registry.len(), 1);
        // Overwrite does not release the previous handle
        assert!(!first.is_released());
    }

    #[test]
    fn test_remove_releases_once_and_is_idempotent() {
        let registry = PreloadedPlayerRegistry::new();
        let p = player("u1");
        registry.register("u1", p.clone());
        registry.remove("u1");
        registry.remove("u1");
        assert!(p.is_released());
        assert!(registry.get("u1").is_none());
    }

    #[test]
    fn test_remove_tolerates_release_less_handle() {
        struct Bare;
        impl PlayerHandle for Bare {
            fn play(&self) {}
            fn pause(&self) {}
            fn is_ready(&self) -> bool {
                true
            }
        }

        let registry = PreloadedPlayerRegistry::new();
        registry.register("u1", Arc::new(Bare));
        registry.remove("u1");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_take_does_not_release() {
        let registry = PreloadedPlayerRegistry::new();
        let p = player("u1");
        registry.register("u1", p.clone());
        assert!(registry.take("u1").is_some());
        assert!(!p.is_released());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clear_all_releases_everything() {
        let registry = PreloadedPlayerRegistry::new();
        let players: Vec<_> = (0..3).map(|i| player(&format!("u{}", i))).collect();
        for (i, p) in players.iter().enumerate() {
            registry.register(&format!("u{}", i), p.clone());
        }
        registry.clear_all();
        assert!(registry.is_empty());
        assert!(players.iter().all(|p| p.is_released()));
    }
}
