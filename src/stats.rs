/*!
 * Watcher Statistics
 * Atomic counters for zero-contention tracking on the dispatch hot path
 */

use crate::types::WatchStats;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Atomic watcher statistics for lock-free updates
///
/// # Performance
/// - Cache-line aligned to prevent false sharing
/// - All operations use relaxed ordering; counters are monitoring data,
///   never synchronization
#[repr(C, align(64))]
pub(crate) struct AtomicWatchStats {
    listeners_registered: AtomicU64,
    listeners_removed: AtomicU64,
    dispatch_rounds: AtomicU64,
    callbacks_invoked: AtomicU64,
    callback_failures: AtomicU64,
    signals_watched: AtomicUsize,
}

impl AtomicWatchStats {
    pub(crate) const fn new() -> Self {
        Self {
            listeners_registered: AtomicU64::new(0),
            listeners_removed: AtomicU64::new(0),
            dispatch_rounds: AtomicU64::new(0),
            callbacks_invoked: AtomicU64::new(0),
            callback_failures: AtomicU64::new(0),
            signals_watched: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub(crate) fn inc_registered(&self) {
        self.listeners_registered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_removed(&self) {
        self.listeners_removed.fetch_add(1, Ordering::Relaxed);
    }

    /// One round = one observed delivery fanned out to a snapshot of
    /// listeners. Hot path.
    #[inline]
    pub(crate) fn inc_rounds(&self) {
        self.dispatch_rounds.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_invoked(&self) {
        self.callbacks_invoked.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_failures(&self) {
        self.callback_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_signals_watched(&self) {
        self.signals_watched.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn dec_signals_watched(&self) {
        self.signals_watched.fetch_sub(1, Ordering::Relaxed);
    }

    /// Snapshot of current counters, no locks required.
    ///
    /// Values may drift against each other under concurrent updates, but
    /// each individual value is accurate. Acceptable for monitoring.
    pub(crate) fn snapshot(&self) -> WatchStats {
        WatchStats {
            listeners_registered: self.listeners_registered.load(Ordering::Relaxed),
            listeners_removed: self.listeners_removed.load(Ordering::Relaxed),
            dispatch_rounds: self.dispatch_rounds.load(Ordering::Relaxed),
            callbacks_invoked: self.callbacks_invoked.load(Ordering::Relaxed),
            callback_failures: self.callback_failures.load(Ordering::Relaxed),
            signals_watched: self.signals_watched.load(Ordering::Relaxed),
        }
    }
}
