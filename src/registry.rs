/*!
 * Handler Registry
 * Process-wide table fanning one OS trap per signal out to an ordered list
 * of listeners
 */

use crate::gate;
use crate::platform::{self, PriorTrap, MAX_SIGNAL};
use crate::stats::AtomicWatchStats;
use crate::types::{Signal, SignalError, SignalResult, WatchHandle};
use ahash::RandomState;
use log::{debug, error, info};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Opaque user payload carried by a listener for its whole lifetime.
pub(crate) type UserData = Arc<dyn Any + Send + Sync>;

/// The two registration shapes: a bare callback, or one that also receives
/// the listener's user data.
pub(crate) enum HandlerKind {
    Plain(Arc<dyn Fn(WatchHandle) + Send + Sync>),
    WithData(Arc<dyn Fn(WatchHandle, &(dyn Any + Send + Sync)) + Send + Sync>),
}

/// One registered listener. Never mutated in place; removal deletes the
/// whole record.
pub(crate) struct ListenerRecord {
    id: u64,
    signal: Signal,
    handler: HandlerKind,
    user_data: Option<UserData>,
}

impl ListenerRecord {
    fn handle(&self) -> WatchHandle {
        WatchHandle::new(self.id, self.signal)
    }

    fn invoke(&self) {
        let handle = self.handle();
        match &self.handler {
            HandlerKind::Plain(callback) => callback(handle),
            HandlerKind::WithData(callback) => {
                if let Some(data) = &self.user_data {
                    callback(handle, &**data);
                }
            }
        }
    }
}

/// Per-signal state: the listeners in registration order, plus the
/// disposition that was in effect before this layer took the signal over.
struct Watched {
    listeners: Vec<Arc<ListenerRecord>>,
    prior: PriorTrap,
}

/// A signal number keys the table iff at least one listener is registered
/// for it iff the demultiplexing notifier currently owns its trap slot.
pub(crate) struct WatchTable {
    watched: Mutex<HashMap<i32, Watched, RandomState>>,
    next_id: AtomicU64,
    stats: AtomicWatchStats,
}

impl WatchTable {
    pub(crate) fn new() -> Self {
        Self {
            watched: Mutex::new(HashMap::with_hasher(RandomState::new())),
            next_id: AtomicU64::new(1),
            stats: AtomicWatchStats::new(),
        }
    }

    pub(crate) fn stats(&self) -> &AtomicWatchStats {
        &self.stats
    }

    pub(crate) fn register(
        &self,
        signal: Signal,
        handler: HandlerKind,
        user_data: Option<UserData>,
    ) -> SignalResult<WatchHandle> {
        let signo = signal.number();
        if signo < 1 || signo >= MAX_SIGNAL as i32 {
            return Err(SignalError::InvalidSignal(signo));
        }

        // The gate must be draining before any trap can fire.
        gate::ensure_running()?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = Arc::new(ListenerRecord {
            id,
            signal,
            handler,
            user_data,
        });

        let mut watched = self.watched.lock();
        if let Some(entry) = watched.get_mut(&signo) {
            entry.listeners.push(record);
        } else {
            // First listener for this signal: take the trap over before the
            // record becomes visible. On failure nothing is stored.
            let prior = platform::install(signo, gate::notifier)?;
            watched.insert(
                signo,
                Watched {
                    listeners: vec![record],
                    prior,
                },
            );
            self.stats.inc_signals_watched();
            info!("took over trap for {}", signal);
        }
        drop(watched);

        self.stats.inc_registered();
        debug!("registered listener {} for {}", id, signal);
        Ok(WatchHandle::new(id, signal))
    }

    /// Delete the record matching `handle`, releasing the trap when the
    /// signal's list empties. Removing a handle that matches nothing is a
    /// defined no-op and returns false.
    pub(crate) fn remove(&self, handle: WatchHandle) -> bool {
        let signo = handle.signal().number();

        let mut watched = self.watched.lock();
        let deleted = match watched.get_mut(&signo) {
            None => false,
            Some(entry) => {
                let before = entry.listeners.len();
                entry.listeners.retain(|record| record.id != handle.id());
                entry.listeners.len() != before
            }
        };
        if !deleted {
            return false;
        }

        let emptied = watched
            .get(&signo)
            .map_or(false, |entry| entry.listeners.is_empty());
        if emptied {
            if let Some(gone) = watched.remove(&signo) {
                platform::restore_prior(signo, &gone.prior);
                self.stats.dec_signals_watched();
                info!("released trap for {}", handle.signal());
            }
        }
        drop(watched);

        self.stats.inc_removed();
        debug!("removed listener {} for {}", handle.id(), handle.signal());
        true
    }

    pub(crate) fn is_watched(&self, signal: Signal) -> bool {
        self.watched.lock().contains_key(&signal.number())
    }

    pub(crate) fn listener_count(&self, signal: Signal) -> usize {
        self.watched
            .lock()
            .get(&signal.number())
            .map_or(0, |entry| entry.listeners.len())
    }

    /// Fan one observed delivery of `signo` out to every listener registered
    /// at this moment. Runs only on the dispatch thread, never in signal
    /// context.
    ///
    /// The listener list is snapshot under the lock and invoked outside it,
    /// so a callback may itself register or remove listeners. A listener
    /// removed mid-round by another thread may still see this one delivery.
    pub(crate) fn dispatch(&self, signo: i32) {
        let snapshot = {
            let watched = self.watched.lock();
            match watched.get(&signo) {
                // Raced a last-listener removal between trap and drain.
                None => return,
                Some(entry) => entry.listeners.clone(),
            }
        };

        self.stats.inc_rounds();
        for record in snapshot {
            let handle = record.handle();
            match panic::catch_unwind(AssertUnwindSafe(|| record.invoke())) {
                Ok(()) => self.stats.inc_invoked(),
                Err(payload) => {
                    // Isolated per listener: the round continues and the
                    // listener stays registered.
                    self.stats.inc_failures();
                    error!(
                        "listener {} for {} panicked during dispatch: {}",
                        handle.id(),
                        handle.signal(),
                        panic_message(&payload)
                    );
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("opaque panic payload")
}
