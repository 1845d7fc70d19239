//! Playback coordination
//!
//! - handle: player handle trait and factory
//! - registry: preloaded players keyed by url
//! - preload: sliding warm-up window over the registry
//! - coordinator: at-most-one-playing state machine
//! - local: VLC/mpv process launcher

pub mod coordinator;
pub mod handle;
pub mod local;
pub mod preload;
pub mod registry;

pub use coordinator::{CoordinatorState, PlaybackCoordinator};
pub use handle::{LoggingPlayer, PlayerFactory, PlayerHandle, SharedPlayer};
pub use local::{LocalPlayer, LocalPlayerError, PlayerType};
pub use preload::PreloadWindow;
pub use registry::PreloadedPlayerRegistry;
