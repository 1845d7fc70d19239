//! Cache key derivation
//!
//! Maps a remote url to a filesystem-safe file name. The name is a readable
//! slug of the url (alphanumerics kept, everything else folded to `_`)
//! followed by a SHA-256 digest prefix, so two urls that slug identically
//! still land on different files.
//!
//! Keys are stable across runs and builds: a file downloaded by a previous
//! process is found again from the same url.
//!
//! This module does **not** perform any IO.

use sha2::{Digest, Sha256};
use tracing::trace;

/// Maximum number of slug characters kept before the digest
const SLUG_MAX: usize = 64;

/// Number of digest bytes rendered as hex (32 hex chars)
const DIGEST_BYTES: usize = 16;

/// Derive the cache file name for `url`.
///
/// Output contains only ASCII alphanumerics and `_`. Total for any input.
pub fn encode(url: &str) -> String {
    let slug: String = url
        .chars()
        .take(SLUG_MAX)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    let digest = Sha256::digest(url.as_bytes());
    let hex: String = digest[..DIGEST_BYTES]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();

    let key = format!("{}_{}", slug, hex);
    trace!("cache_key: url='{}' key='{}'", url, key);
    key
}
