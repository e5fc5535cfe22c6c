//! Crate-wide error type.
use std::{error, fmt, io};

/// A specialized [`Result`] for this crate's operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An opaque carrier for server-originated error detail.
///
/// Only [`Session::connect`][crate::Session::connect] populates this, and only
/// on a server-reported handshake failure; every other error path leaves it empty.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    message: String,
}

impl Diagnostics {
    /// An empty diagnostics record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Server-reported error text, if any was captured.
    pub fn server_message(&self) -> &str {
        &self.message
    }

    /// Populate the diagnostics with server-reported text.
    pub fn set_server_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    /// Clear any previously captured detail. Called by the state machine on
    /// every successful setup so diagnostics never leak across borrows.
    pub fn clear(&mut self) {
        self.message.clear();
    }

    /// True if no server detail has been captured.
    pub fn is_empty(&self) -> bool {
        self.message.is_empty()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str("(no server diagnostics)")
        } else {
            f.write_str(&self.message)
        }
    }
}

/// This crate's error type.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self { kind }
    }

    /// The kind of failure this error represents.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Build a [`resolve_error`][ErrorKind::Resolve] from its underlying I/O cause.
    ///
    /// Public so that a [`Session`][crate::Session] implementation outside
    /// this crate (this crate's error type is concrete, not generic over the
    /// session's own error type) can report failures using the same
    /// taxonomy the bundled [`TcpSession`][crate::session::tcp::TcpSession] uses.
    pub fn resolve(source: io::Error) -> Self {
        Self::new(ErrorKind::Resolve(source))
    }

    /// Build a [`connect_error`][ErrorKind::Connect] from its underlying I/O cause.
    pub fn connect(source: io::Error) -> Self {
        Self::new(ErrorKind::Connect(source))
    }

    /// Build a [`ping_error`][ErrorKind::Ping] from its underlying I/O cause.
    pub fn ping(source: io::Error) -> Self {
        Self::new(ErrorKind::Ping(source))
    }

    /// Build a server-reported [`ErrorKind::Server`] error, forwarding
    /// `diagnostics` verbatim. Used by [`Session::connect`][crate::Session::connect]
    /// implementations on a handshake/authentication failure the server
    /// itself reported; the state machine counts it as a single connect
    /// failure like any other.
    pub fn server(diagnostics: Diagnostics) -> Self {
        Self::new(ErrorKind::Server { diagnostics })
    }

    pub(crate) fn retries_exhausted(attempts: u32) -> Self {
        Self::new(ErrorKind::PoolRetriesExhausted { attempts })
    }

    /// Build an [`ErrorKind::OperationAborted`] error. Not produced anywhere
    /// in this crate's own code paths — under Tokio, cancellation is
    /// realized by the caller dropping the `get_connection` future rather
    /// than that future resolving to an error value (see `DESIGN.md`, Q2).
    /// Exposed for a [`Session`][crate::Session] implementation whose own
    /// timer/cancellation primitive can distinguish "aborted" from a plain
    /// transient failure and wants to report it as such.
    pub fn aborted() -> Self {
        Self::new(ErrorKind::OperationAborted)
    }

    /// True if this is the terminal "retry budget exhausted" error.
    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self.kind, ErrorKind::PoolRetriesExhausted { .. })
    }
}

/// All the ways a pool operation can fail.
///
/// Variants map 1:1 onto the error codes named in the core design: transient
/// network errors are retried internally and only surface once the retry
/// budget in [`PoolConfig`][crate::PoolConfig] is exhausted.
#[derive(Debug)]
pub enum ErrorKind {
    /// DNS resolution of the pool's configured host failed.
    Resolve(io::Error),
    /// TCP connect, TLS handshake, or MySQL authentication failed.
    Connect(io::Error),
    /// A health-check `COM_PING` did not receive an OK reply.
    Ping(io::Error),
    /// A server reported a protocol-level or authentication error during `connect`.
    Server {
        /// The diagnostics captured from the server.
        diagnostics: Diagnostics,
    },
    /// The state machine exhausted its configured retry budget.
    PoolRetriesExhausted {
        /// The number of attempts made before giving up.
        attempts: u32,
    },
    /// The caller's future was cancelled, or an internal wait timed out in a
    /// way that the state machine treats as fatal rather than retryable.
    OperationAborted,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Resolve(e) => write!(f, "failed to resolve host: {e}"),
            Self::Connect(e) => write!(f, "failed to connect: {e}"),
            Self::Ping(e) => write!(f, "ping failed: {e}"),
            Self::Server { diagnostics } => write!(f, "server reported an error: {diagnostics}"),
            Self::PoolRetriesExhausted { attempts } => {
                write!(f, "pool exhausted its retry budget after {attempts} attempt(s)")
            }
            Self::OperationAborted => f.write_str("operation aborted"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Resolve(e) | ErrorKind::Connect(e) | ErrorKind::Ping(e) => Some(e),
            ErrorKind::Server { .. }
            | ErrorKind::PoolRetriesExhausted { .. }
            | ErrorKind::OperationAborted => None,
        }
    }
}
