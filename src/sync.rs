//! Lock helper shared by the in-memory indexes
//!
//! The indexes hold plain maps that stay consistent between statements, so a
//! panic in another holder never leaves them half-written. Poisoning is
//! recovered instead of propagated.

use std::sync::{Mutex, MutexGuard, PoisonError};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
