//! Integration tests for reelplay
//!
//! Tests are organized by component:
//! - cache_test: Disk cache resolution, policy, dedup, delivery, clear
//! - fetch_test: HTTP fetcher (HEAD size probe, GET download) over mockito
//! - playback_test: Coordinator, preload registry and window, service hand-off

// Note: Each test file is a separate integration test crate
// Tests are run individually by cargo, not via mod.rs
