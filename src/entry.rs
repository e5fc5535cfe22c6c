//! Per-slot lifecycle state.
use crate::session::Session;

/// The lifecycle state of a single pool entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No socket, no endpoints resolved; or the underlying session was
    /// discarded and must be rebuilt from scratch.
    NotConnected,
    /// A live, authenticated session with no active user. May be stale if the
    /// peer closed the connection without this pool noticing yet.
    Iddle,
    /// A live session that was just returned by a user; a reset should be
    /// performed before reuse. Currently elided — see the design notes on
    /// `PendingReset`.
    PendingReset,
    /// Currently borrowed by exactly one caller.
    InUse,
}

impl SessionState {
    /// True for every state [`SetupStateMachine`][crate::state_machine::SetupStateMachine]
    /// is willing to start from, i.e. every state except `InUse`.
    pub(crate) fn is_eligible(self) -> bool {
        !matches!(self, SessionState::InUse)
    }
}

/// The mutable fields of a pool slot, owned behind a per-entry cell (see
/// `crate::pool` for why this is per-entry rather than a single whole-pool
/// mutex).
///
/// `session` is `None` exactly while the entry is checked out: ownership of
/// the `Session` moves into the in-flight `Checkout`/`BorrowedConnection`
/// rather than being accessed in place, the same way the teacher crate moves
/// a `Conn<C>` out of its idle queue instead of locking it for the borrow's
/// whole lifetime.
pub(crate) struct EntryState<S: Session> {
    pub(crate) state: SessionState,
    pub(crate) locked: bool,
    pub(crate) session: Option<S>,
}

impl<S: Session> EntryState<S> {
    pub(crate) fn new(session: S) -> Self {
        Self {
            state: SessionState::NotConnected,
            locked: false,
            session: Some(session),
        }
    }
}
