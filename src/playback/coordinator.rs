//! Playback coordinator
//!
//! Single source of truth for which feed item may play. Views register their
//! handle under a [`FeedItemId`] on mount and unregister on unmount; scroll
//! visibility changes call [`PlaybackCoordinator::switch_video`].
//!
//! At most one handle started by the coordinator is playing at any time.
//! Every operation tolerates unknown ids and not-ready handles by doing
//! nothing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::debug;

use super::handle::SharedPlayer;
use crate::models::FeedItemId;
use crate::sync::lock;

/// Coordinator phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "id", rename_all = "lowercase")]
pub enum CoordinatorState {
    Idle,
    Active(FeedItemId),
}

#[derive(Default)]
struct State {
    handles: HashMap<FeedItemId, SharedPlayer>,
    active: Option<FeedItemId>,
    /// Handle last told to play and not paused since. May outlive its
    /// registration.
    playing: Option<SharedPlayer>,
}

fn same_handle(a: &SharedPlayer, b: &SharedPlayer) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl State {
    fn pause_current(&mut self) {
        if let Some(handle) = self.playing.take() {
            handle.pause();
            debug!("coordinator: paused {:?}", self.active);
        }
    }

    fn play(&mut self, id: &FeedItemId) -> bool {
        let Some(handle) = self.handles.get(id).cloned() else {
            debug!("coordinator: play '{}' ignored, not registered", id);
            return false;
        };
        if !handle.is_ready() {
            debug!("coordinator: play '{}' ignored, not ready", id);
            return false;
        }

        let already = self
            .playing
            .as_ref()
            .is_some_and(|p| same_handle(p, &handle));
        if !already {
            self.pause_current();
            handle.play();
            self.playing = Some(handle);
            debug!("coordinator: playing '{}'", id);
        }
        self.active = Some(id.clone());
        true
    }
}

/// Owns per-feed-item player registrations. Clones share state.
#[derive(Clone, Default)]
pub struct PlaybackCoordinator {
    state: Arc<Mutex<State>>,
}

impl std::fmt::Debug for PlaybackCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("PlaybackCoordinator")
            .field("registered", &state.handles.len())
            .field("active", &state.active)
            .field("playing", &state.playing.is_some())
            .finish()
    }
}

impl PlaybackCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `id` with `handle`, replacing any previous handle.
    /// No playback side effect.
    pub fn register(&self, id: impl Into<FeedItemId>, handle: SharedPlayer) {
        let id = id.into();
        debug!("coordinator: register '{}'", id);
        lock(&self.state).handles.insert(id, handle);
    }

    /// Drop the association. `active` is kept even when it names `id`.
    pub fn unregister(&self, id: &FeedItemId) {
        if lock(&self.state).handles.remove(id).is_some() {
            debug!("coordinator: unregister '{}'", id);
        }
    }

    /// Play `id` if registered and ready; otherwise nothing happens.
    /// Whatever was playing before is paused.
    ///
    /// Returns whether `id` is now the playing item.
    pub fn play(&self, id: &FeedItemId) -> bool {
        lock(&self.state).play(id)
    }

    /// Pause the active item, if any. The active id is kept.
    pub fn pause_active(&self) {
        lock(&self.state).pause_current();
    }

    /// Make `next` the active item: pause the current one if it differs,
    /// then play `next`. Repeating a switch to the playing item does nothing.
    pub fn switch_video(&self, next: &FeedItemId) -> bool {
        let mut state = lock(&self.state);
        if matches!(&state.active, Some(current) if current != next) {
            state.pause_current();
        }
        state.play(next)
    }

    pub fn active(&self) -> Option<FeedItemId> {
        lock(&self.state).active.clone()
    }

    pub fn state(&self) -> CoordinatorState {
        match &lock(&self.state).active {
            Some(id) => CoordinatorState::Active(id.clone()),
            None => CoordinatorState::Idle,
        }
    }

    /// Whether the handle registered under the active id is playing
    pub fn is_playing(&self) -> bool {
        let state = lock(&self.state);
        match (&state.active, &state.playing) {
            (Some(id), Some(playing)) => state
                .handles
                .get(id)
                .is_some_and(|h| same_handle(h, playing)),
            _ => false,
        }
    }

    pub fn is_registered(&self, id: &FeedItemId) -> bool {
        lock(&self.state).handles.contains_key(id)
    }

    pub fn registered(&self) -> usize {
        lock(&self.state).handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::handle::LoggingPlayer;

    fn id(s: &str) -> FeedItemId {
        FeedItemId::from(s)
    }

    #[test]
    fn test_starts_idle() {
        let coordinator = PlaybackCoordinator::new();
        assert_eq!(coordinator.state(), CoordinatorState::Idle);
        assert!(!coordinator.is_playing());
    }

    #[test]
    fn test_play_unknown_id_is_noop() {
        let coordinator = PlaybackCoordinator::new();
        assert!(!coordinator.play(&id("ghost")));
        assert_eq!(coordinator.active(), None);
    }

    #[test]
    fn test_play_not_ready_is_noop() {
        let coordinator = PlaybackCoordinator::new();
        let p = Arc::new(LoggingPlayer::new("u", false));
        coordinator.register("p1", p.clone());
        assert!(!coordinator.play(&id("p1")));
        assert_eq!(p.plays(), 0);
        assert_eq!(coordinator.active(), None);
    }

    #[test]
    fn test_register_has_no_side_effect() {
        let coordinator = PlaybackCoordinator::new();
        let p = Arc::new(LoggingPlayer::new("u", true));
        coordinator.register("p1", p.clone());
        assert_eq!(p.plays() + p.pauses(), 0);
        assert!(coordinator.is_registered(&id("p1")));
    }

    #[test]
    fn test_unregister_keeps_active_id() {
        let coordinator = PlaybackCoordinator::new();
        coordinator.register("p1", Arc::new(LoggingPlayer::new("u", true)));
        coordinator.switch_video(&id("p1"));
        coordinator.unregister(&id("p1"));
        assert_eq!(coordinator.active(), Some(id("p1")));
        assert!(!coordinator.is_playing());
    }

    #[test]
    fn test_unmounted_playing_handle_is_paused_on_switch() {
        let coordinator = PlaybackCoordinator::new();
        let a = Arc::new(LoggingPlayer::new("a", true));
        let b = Arc::new(LoggingPlayer::new("b", true));
        coordinator.register("a", a.clone());
        coordinator.register("b", b.clone());
        coordinator.switch_video(&id("a"));
        coordinator.unregister(&id("a"));

        coordinator.switch_video(&id("b"));
        assert_eq!(a.pauses(), 1);
        assert!(b.is_playing());
    }

    #[test]
    fn test_pause_active_keeps_active_id() {
        let coordinator = PlaybackCoordinator::new();
        let p = Arc::new(LoggingPlayer::new("u", true));
        coordinator.register("p1", p.clone());
        coordinator.switch_video(&id("p1"));
        coordinator.pause_active();
        assert_eq!(p.pauses(), 1);
        assert_eq!(coordinator.active(), Some(id("p1")));
        assert!(!coordinator.is_playing());

        // Re-play after pause resumes
        coordinator.switch_video(&id("p1"));
        assert_eq!(p.plays(), 2);
    }

    #[test]
    fn test_direct_play_pauses_previous() {
        let coordinator = PlaybackCoordinator::new();
        let a = Arc::new(LoggingPlayer::new("a", true));
        let b = Arc::new(LoggingPlayer::new("b", true));
        coordinator.register("a", a.clone());
        coordinator.register("b", b.clone());
        coordinator.play(&id("a"));
        coordinator.play(&id("b"));
        assert!(!a.is_playing());
        assert!(b.is_playing());
    }

    #[test]
    fn test_reregistered_active_id_can_play_again() {
        let coordinator = PlaybackCoordinator::new();
        let first = Arc::new(LoggingPlayer::new("u", true));
        coordinator.register("p1", first.clone());
        coordinator.switch_video(&id("p1"));

        let second = Arc::new(LoggingPlayer::new("u", true));
        coordinator.register("p1", second.clone());
        coordinator.switch_video(&id("p1"));
        assert_eq!(second.plays(), 1);
    }

    #[test]
    fn test_remounted_playing_handle_is_paused_on_switch() {
        let coordinator = PlaybackCoordinator::new();
        let a = Arc::new(LoggingPlayer::new("a", true));
        let b = Arc::new(LoggingPlayer::new("b", true));
        coordinator.register("a", a.clone());
        coordinator.register("b", b.clone());
        coordinator.switch_video(&id("a"));

        coordinator.unregister(&id("a"));
        coordinator.register("a", a.clone());
        coordinator.switch_video(&id("b"));

        assert!(!a.is_playing());
        assert!(b.is_playing());
    }
}
