/*!
 * Signal Watch
 * Public facade: one process-wide watcher multiplexing listeners over the
 * kernel's single handler slot per signal
 */

use crate::registry::{HandlerKind, WatchTable};
use crate::types::{Signal, SignalResult, WatchHandle, WatchStats};
use std::any::Any;
use std::sync::{Arc, OnceLock};

/// Process-wide signal multiplexer.
///
/// A signal number is a single-slot resource: the kernel keeps one handler
/// per number. `SignalWatch` owns that slot for every signal it watches and
/// fans each observed delivery out to all currently registered listeners,
/// in registration order. The first listener on a signal takes the trap
/// over; removing the last one reinstates whatever disposition was in
/// effect before.
///
/// Listeners run on a dedicated dispatch thread, never in signal-handler
/// context. Repeated deliveries of one signal before the thread drains its
/// notification may coalesce into a single dispatch round, exactly as
/// repeated deliveries already coalesce inside the kernel.
pub struct SignalWatch {
    table: WatchTable,
}

impl SignalWatch {
    /// The process-wide instance, created on first access and alive until
    /// process exit.
    pub fn shared() -> &'static SignalWatch {
        static SHARED: OnceLock<SignalWatch> = OnceLock::new();
        SHARED.get_or_init(|| SignalWatch {
            table: WatchTable::new(),
        })
    }

    pub(crate) fn table(&self) -> &WatchTable {
        &self.table
    }

    /// Register `callback` for `signal`.
    ///
    /// Returns immediately; the callback only runs on later deliveries,
    /// receiving the handle of its own registration. Any number of
    /// listeners can coexist on one signal, and each can be removed
    /// independently.
    ///
    /// # Errors
    /// [`SignalError::InvalidSignal`] for numbers outside the watchable
    /// range, [`SignalError::TrapInstall`] when the kernel refuses the
    /// signal (SIGKILL, SIGSTOP). Nothing is registered on error.
    ///
    /// [`SignalError::InvalidSignal`]: crate::SignalError::InvalidSignal
    /// [`SignalError::TrapInstall`]: crate::SignalError::TrapInstall
    ///
    /// # Examples
    /// ```no_run
    /// use sigwatch::{Signal, SignalWatch};
    ///
    /// let handle = SignalWatch::shared()
    ///     .on(Signal::Term, |_| log::info!("shutting down"))?;
    /// # Ok::<(), sigwatch::SignalError>(())
    /// ```
    pub fn on<F>(&self, signal: Signal, callback: F) -> SignalResult<WatchHandle>
    where
        F: Fn(WatchHandle) + Send + Sync + 'static,
    {
        self.table
            .register(signal, HandlerKind::Plain(Arc::new(callback)), None)
    }

    /// Register `callback` together with an opaque payload that is handed
    /// to every invocation alongside the listener's own handle. The payload
    /// lives exactly as long as the registration.
    pub fn on_with<T, F>(&self, signal: Signal, user_data: T, callback: F) -> SignalResult<WatchHandle>
    where
        T: Any + Send + Sync,
        F: Fn(WatchHandle, &T) + Send + Sync + 'static,
    {
        let thunk = move |handle: WatchHandle, data: &(dyn Any + Send + Sync)| {
            // The payload is stored type-erased; it was a T at registration.
            if let Some(data) = data.downcast_ref::<T>() {
                callback(handle, data);
            }
        };
        self.table.register(
            signal,
            HandlerKind::WithData(Arc::new(thunk)),
            Some(Arc::new(user_data)),
        )
    }

    /// Remove the listener identified by `handle`, leaving every other
    /// listener on the same signal untouched.
    ///
    /// Returns `false` when the handle matches nothing; removing twice is a
    /// defined no-op. No dispatch round starting after this call returns
    /// will invoke the listener, though a round already snapshot at the
    /// moment of removal may still complete with it.
    pub fn remove(&self, handle: WatchHandle) -> bool {
        self.table.remove(handle)
    }

    /// Whether any listener is currently registered for `signal`.
    pub fn is_watched(&self, signal: Signal) -> bool {
        self.table.is_watched(signal)
    }

    /// Number of listeners currently registered for `signal`.
    pub fn listener_count(&self, signal: Signal) -> usize {
        self.table.listener_count(signal)
    }

    /// Snapshot of the process-wide counters.
    pub fn stats(&self) -> WatchStats {
        self.table.stats().snapshot()
    }
}
