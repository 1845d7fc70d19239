//! Local media caching
//!
//! - key: url to file name derivation
//! - fetch: network boundary (size probe, download)
//! - policy: which videos are worth persisting
//! - disk: per-kind cache manager

pub mod disk;
pub mod fetch;
pub mod key;
pub mod policy;

pub use disk::{CacheError, MediaDiskCache, MountGuard, PendingSource, Resolution};
pub use fetch::{FetchError, HttpFetcher, MediaFetcher};
pub use policy::{PolicyDecision, VideoCachePolicy};
