/*!
 * Signal Types
 * Symbolic signal catalog, listener handles, errors and stats
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Signal operation result
pub type SignalResult<T> = Result<T, SignalError>;

/// Errors surfaced synchronously by registration. Dispatch-time listener
/// failures are isolated and reported, never propagated (see `SignalWatch`).
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SignalError {
    /// Signal number outside the watchable range
    #[error("invalid signal number: {0}")]
    InvalidSignal(i32),

    /// The kernel refused to install a handler (e.g. SIGKILL, SIGSTOP)
    #[error("failed to install trap for {signal}: errno {errno}")]
    TrapInstall { signal: Signal, errno: i32 },

    /// The dispatch thread or its wakeup pipe could not be created
    #[error("dispatch gate failed to start: {0}")]
    GateStart(String),
}

/// Symbolic OS signals: a closed set of named cases plus a numeric escape
/// case for platform-specific and real-time signal numbers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Signal {
    /// Hangup detected on controlling terminal
    Hup,
    /// Interrupt from keyboard (Ctrl+C)
    Int,
    /// Quit from keyboard
    Quit,
    /// Abort signal
    Abrt,
    /// Kill signal (cannot be caught)
    Kill,
    /// Timer signal
    Alrm,
    /// Termination signal
    Term,
    /// Broken pipe
    Pipe,
    /// User-defined signal 1
    Usr1,
    /// User-defined signal 2
    Usr2,
    /// Child process status changed
    Chld,
    /// Terminal window resized
    Winch,
    /// I/O now possible
    Io,
    /// Any other platform signal number, real-time range included
    User(i32),
}

impl Signal {
    /// Platform numeric value of this signal.
    pub fn number(&self) -> i32 {
        match self {
            Signal::Hup => libc::SIGHUP,
            Signal::Int => libc::SIGINT,
            Signal::Quit => libc::SIGQUIT,
            Signal::Abrt => libc::SIGABRT,
            Signal::Kill => libc::SIGKILL,
            Signal::Alrm => libc::SIGALRM,
            Signal::Term => libc::SIGTERM,
            Signal::Pipe => libc::SIGPIPE,
            Signal::Usr1 => libc::SIGUSR1,
            Signal::Usr2 => libc::SIGUSR2,
            Signal::Chld => libc::SIGCHLD,
            Signal::Winch => libc::SIGWINCH,
            Signal::Io => libc::SIGIO,
            Signal::User(n) => *n,
        }
    }

    /// Total mapping back from a numeric value; numbers with no named case
    /// become [`Signal::User`].
    pub fn from_number(n: i32) -> Signal {
        match n {
            libc::SIGHUP => Signal::Hup,
            libc::SIGINT => Signal::Int,
            libc::SIGQUIT => Signal::Quit,
            libc::SIGABRT => Signal::Abrt,
            libc::SIGKILL => Signal::Kill,
            libc::SIGALRM => Signal::Alrm,
            libc::SIGTERM => Signal::Term,
            libc::SIGPIPE => Signal::Pipe,
            libc::SIGUSR1 => Signal::Usr1,
            libc::SIGUSR2 => Signal::Usr2,
            libc::SIGCHLD => Signal::Chld,
            libc::SIGWINCH => Signal::Winch,
            libc::SIGIO => Signal::Io,
            _ => Signal::User(n),
        }
    }

    /// Conventional platform name, when this is a named case.
    pub fn name(&self) -> Option<&'static str> {
        match self {
            Signal::Hup => Some("SIGHUP"),
            Signal::Int => Some("SIGINT"),
            Signal::Quit => Some("SIGQUIT"),
            Signal::Abrt => Some("SIGABRT"),
            Signal::Kill => Some("SIGKILL"),
            Signal::Alrm => Some("SIGALRM"),
            Signal::Term => Some("SIGTERM"),
            Signal::Pipe => Some("SIGPIPE"),
            Signal::Usr1 => Some("SIGUSR1"),
            Signal::Usr2 => Some("SIGUSR2"),
            Signal::Chld => Some("SIGCHLD"),
            Signal::Winch => Some("SIGWINCH"),
            Signal::Io => Some("SIGIO"),
            Signal::User(_) => None,
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Signal::Hup => "Hangup",
            Signal::Int => "Interrupt",
            Signal::Quit => "Quit",
            Signal::Abrt => "Aborted",
            Signal::Kill => "Killed",
            Signal::Alrm => "Alarm clock",
            Signal::Term => "Terminated",
            Signal::Pipe => "Broken pipe",
            Signal::Usr1 => "User defined signal 1",
            Signal::Usr2 => "User defined signal 2",
            Signal::Chld => "Child status changed",
            Signal::Winch => "Window size changed",
            Signal::Io => "I/O possible",
            Signal::User(_) => "User-specified signal",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}({})", name, self.number()),
            None => write!(f, "SIG({})", self.number()),
        }
    }
}

// Identity is the platform number: `User(15)` and `Term` are the same signal.
impl PartialEq for Signal {
    fn eq(&self, other: &Self) -> bool {
        self.number() == other.number()
    }
}

impl Eq for Signal {}

impl Hash for Signal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number().hash(state);
    }
}

/// Identity of one registered listener, returned by registration and later
/// passed back to remove exactly that listener.
#[derive(Debug, Clone, Copy)]
pub struct WatchHandle {
    id: u64,
    signal: Signal,
}

impl WatchHandle {
    pub(crate) fn new(id: u64, signal: Signal) -> Self {
        Self { id, signal }
    }

    /// Process-unique listener id; never reused within a process lifetime.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The signal this listener was registered for.
    pub fn signal(&self) -> Signal {
        self.signal
    }
}

// The id alone is globally unique; the signal is only carried for lookup.
impl PartialEq for WatchHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for WatchHandle {}

impl Hash for WatchHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Watcher statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchStats {
    pub listeners_registered: u64,
    pub listeners_removed: u64,
    pub dispatch_rounds: u64,
    pub callbacks_invoked: u64,
    pub callback_failures: u64,
    pub signals_watched: usize,
}
