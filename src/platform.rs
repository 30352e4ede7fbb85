/*!
 * Platform Trap
 * Mechanical per-OS binding around sigaction(2). The kernel keeps exactly
 * one handler slot per signal number; everything above this module exists
 * to multiplex that slot.
 */

use crate::types::{Signal, SignalError, SignalResult};
use std::io;
use std::mem;
use std::ptr;

/// Upper bound (exclusive) on watchable signal numbers. Leaves room for the
/// real-time range on every supported platform.
pub(crate) const MAX_SIGNAL: usize = 128;

/// Disposition of a signal as it was before this layer took the slot over,
/// captured at install time and reinstated when the last listener goes.
pub(crate) struct PriorTrap {
    raw: libc::sigaction,
}

/// Install `notifier` as the OS handler for `signo`, returning the prior
/// disposition. Fails when the kernel refuses the number (SIGKILL, SIGSTOP,
/// out-of-range values).
pub(crate) fn install(signo: i32, notifier: extern "C" fn(libc::c_int)) -> SignalResult<PriorTrap> {
    let mut action: libc::sigaction = unsafe { mem::zeroed() };
    action.sa_sigaction = notifier as libc::sighandler_t;
    action.sa_flags = libc::SA_RESTART;
    let _ = unsafe { libc::sigemptyset(&mut action.sa_mask) };

    let mut prior: libc::sigaction = unsafe { mem::zeroed() };
    if unsafe { libc::sigaction(signo, &action, &mut prior) } != 0 {
        let errno = io::Error::last_os_error().raw_os_error().unwrap_or(0);
        return Err(SignalError::TrapInstall {
            signal: Signal::from_number(signo),
            errno,
        });
    }
    Ok(PriorTrap { raw: prior })
}

/// Reinstate the disposition captured by [`install`].
pub(crate) fn restore_prior(signo: i32, prior: &PriorTrap) {
    let _ = unsafe { libc::sigaction(signo, &prior.raw, ptr::null_mut()) };
}

/// Restore the platform default disposition for `signal`.
pub fn restore_default(signal: Signal) {
    let _ = unsafe { libc::signal(signal.number(), libc::SIG_DFL) };
}

/// Tell the OS to ignore `signal`.
pub fn ignore(signal: Signal) {
    let _ = unsafe { libc::signal(signal.number(), libc::SIG_IGN) };
}

/// Raise `signal` against the current process.
pub fn raise(signal: Signal) {
    let _ = unsafe { libc::raise(signal.number()) };
}
