/*!
 * Dispatch Gate
 * Bridges signal-handler context to safe context: an async-signal-safe
 * notifier plus a dedicated thread that drains a self-pipe and dispatches
 */

use crate::platform::MAX_SIGNAL;
use crate::types::{SignalError, SignalResult};
use crate::watch::SignalWatch;
use log::{info, warn};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::OnceLock;
use std::thread;

#[cfg(any(target_os = "linux", target_os = "android"))]
use libc::__errno_location as errno_location;
#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
use libc::__error as errno_location;
#[cfg(any(target_os = "openbsd", target_os = "netbsd"))]
use libc::__errno as errno_location;

/// One pending flag per signal number, settable from signal context.
static PENDING: [AtomicBool; MAX_SIGNAL] = [const { AtomicBool::new(false) }; MAX_SIGNAL];

/// Write end of the self-pipe; -1 until the gate is running.
static NOTIFY_FD: AtomicI32 = AtomicI32::new(-1);

/// The function installed as the OS trap for every watched signal.
///
/// Runs in signal-handler context, so the only work permitted is the atomic
/// flag store and the one-byte wakeup write: no allocation, no locks, no
/// user callbacks. The interrupted thread's errno is preserved around the
/// write. A full pipe is fine: the lost write still leaves earlier bytes
/// to wake the dispatch thread, and the pending flag survives.
pub(crate) extern "C" fn notifier(signo: libc::c_int) {
    if let Some(flag) = PENDING.get(signo as usize) {
        flag.store(true, Ordering::SeqCst);
    }
    let fd = NOTIFY_FD.load(Ordering::SeqCst);
    if fd >= 0 {
        unsafe {
            let saved_errno = *errno_location();
            let byte = 1u8;
            libc::write(fd, &byte as *const u8 as *const libc::c_void, 1);
            *errno_location() = saved_errno;
        }
    }
}

/// Create the self-pipe and start the dispatch thread, once per process.
/// A failure is sticky: the process keeps the failed state and every later
/// registration reports it.
pub(crate) fn ensure_running() -> SignalResult<()> {
    static GATE: OnceLock<Result<(), String>> = OnceLock::new();
    GATE.get_or_init(start)
        .clone()
        .map_err(SignalError::GateStart)
}

fn start() -> Result<(), String> {
    let mut fds = [0 as libc::c_int; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error().to_string());
    }
    let (read_fd, write_fd) = (fds[0], fds[1]);

    // Children must not inherit the gate; the notifier must never block on
    // a full pipe while interrupting the thread that drains it.
    unsafe {
        libc::fcntl(read_fd, libc::F_SETFD, libc::FD_CLOEXEC);
        libc::fcntl(write_fd, libc::F_SETFD, libc::FD_CLOEXEC);
        libc::fcntl(write_fd, libc::F_SETFL, libc::O_NONBLOCK);
    }

    NOTIFY_FD.store(write_fd, Ordering::SeqCst);

    thread::Builder::new()
        .name("sigwatch-dispatch".into())
        .spawn(move || drain_loop(read_fd))
        .map_err(|e| e.to_string())?;

    info!("dispatch gate running");
    Ok(())
}

/// Block on the pipe, drain whatever accumulated, then hand every pending
/// signal to the registry from this safe context.
///
/// The drained byte count is deliberately not treated as a delivery count:
/// repeated deliveries of one signal before a drain collapse into a single
/// flag and hence a single dispatch round. That coalescing mirrors plain
/// POSIX semantics and is documented behavior, not a defect.
fn drain_loop(read_fd: libc::c_int) {
    let mut buf = [0u8; 64];
    loop {
        let n = unsafe { libc::read(read_fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            warn!("self-pipe read failed, dispatch gate stopping: {}", err);
            return;
        }
        if n == 0 {
            warn!("self-pipe closed, dispatch gate stopping");
            return;
        }

        for signo in 1..MAX_SIGNAL {
            if PENDING[signo].swap(false, Ordering::SeqCst) {
                SignalWatch::shared().table().dispatch(signo as i32);
            }
        }
    }
}
