//! Admission control and liveness coordination.
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

use crate::{
    common::verbose,
    config::PoolConfig,
    entry::{EntryState, SessionState},
    error::{Diagnostics, Result},
    session::SessionManager,
    state_machine,
    wait::{wait_for_with_timeout, WaitOutcome},
};

/// The guts of a [`Pool`], shared (via `Arc`) between every clone.
struct Shared<M: SessionManager> {
    manager: M,
    config: PoolConfig,
    entries: Vec<Mutex<EntryState<M::Session>>>,
    notify: Notify,
}

/// A fixed-capacity pool of MySQL protocol sessions.
///
/// Cheaply cloneable; every clone shares the same underlying entries. The
/// vector of entries is built once, in [`Pool::new`], and never resized —
/// indices and the entries' identities are stable for the pool's lifetime.
pub struct Pool<M: SessionManager> {
    inner: Arc<Shared<M>>,
}

impl<M: SessionManager> Clone for Pool<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<M: SessionManager> std::fmt::Debug for Pool<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("capacity", &self.inner.entries.len())
            .finish()
    }
}

impl<M: SessionManager> Pool<M> {
    /// Build a pool of `config.capacity()` entries, each starting
    /// `NotConnected` with a fresh session from `manager`. No connection
    /// attempt is made until the first `get_connection` call.
    pub fn new(manager: M, config: PoolConfig) -> Self {
        let capacity = config.capacity_value();
        let entries = (0..capacity)
            .map(|_| Mutex::new(EntryState::new(manager.new_session())))
            .collect();

        Self {
            inner: Arc::new(Shared {
                manager,
                config,
                entries,
                notify: Notify::new(),
            }),
        }
    }

    /// The fixed number of entries this pool manages.
    pub fn capacity(&self) -> usize {
        self.inner.entries.len()
    }

    /// Acquire a ready-to-use connection, retrying setup internally and
    /// waiting for a free entry when none is eligible.
    ///
    /// `diag` is cleared on success and populated only if a server-reported
    /// error was the last failure observed by the underlying setup attempts.
    pub async fn get_connection(&self, diag: &mut Diagnostics) -> Result<BorrowedConnection<M>> {
        loop {
            if let Some(mut checkout) = self.find_and_checkout().await {
                match state_machine::setup(&mut checkout, &self.inner.manager, &self.inner.config, diag).await {
                    Ok(()) => {
                        let index = checkout.index();
                        let session = checkout.commit();
                        return Ok(BorrowedConnection {
                            pool: self.clone(),
                            index,
                            session: Some(session),
                        });
                    }
                    Err(err) => {
                        // `checkout` is still armed: dropping it here returns
                        // the session and last-good state to the pool and
                        // clears `locked`, satisfying P3. The same `Drop`
                        // path runs if this future is cancelled mid-`setup`
                        // instead of returning normally.
                        return Err(err);
                    }
                }
            }

            verbose!("no eligible entry, waiting for a release");
            match wait_for_with_timeout(&self.inner.notify, self.inner.config.wait_timeout_value()).await {
                WaitOutcome::Notified | WaitOutcome::TimedOut => continue,
            }
        }
    }

    /// Scan `entries` for the first unlocked, non-`InUse` slot and check its
    /// session out.
    ///
    /// Realizes the "acquire pool mtx, scan, mark locked, release mtx"
    /// sequence of the design as a `try_lock()` per entry: each entry's cell
    /// is held only for the instant it takes to read `locked`/`state` and, if
    /// eligible, flip `locked` and take the session out. Nothing here ever
    /// awaits network I/O while holding a cell.
    async fn find_and_checkout(&self) -> Option<Checkout<M>> {
        for (index, cell) in self.inner.entries.iter().enumerate() {
            if let Ok(mut guard) = cell.try_lock() {
                if !guard.locked && guard.state.is_eligible() {
                    guard.locked = true;
                    let state = guard.state;
                    let session = guard
                        .session
                        .take()
                        .expect("an unlocked, eligible entry always holds a session");
                    drop(guard);

                    return Some(Checkout {
                        inner: self.inner.clone(),
                        index,
                        state,
                        session: Some(session),
                        armed: true,
                    });
                }
            }
        }
        None
    }

    /// A connection handed back by its caller was, by construction, `InUse`
    /// and fully live: mark it `Iddle` so the next `find_and_checkout` both
    /// considers it eligible again and sends it through the cheap
    /// ping-only branch of `setup` rather than a full reconnect.
    fn return_entry(&self, index: usize, session: M::Session) {
        release_sync(self.inner.clone(), index, Some(SessionState::Iddle), session);
    }
}

/// A locked entry whose `Session` has been taken out of the pool for the
/// duration of setup.
///
/// This is the Rust realization of the source's "release guard": it owns the
/// `Session` and the last-recorded `state` for as long as it is armed, and on
/// `Drop` (covering both an ordinary setup failure and true future
/// cancellation) returns both to the pool and clears `locked`. `commit`
/// disarms it once the caller has a `BorrowedConnection` ready to take over
/// that responsibility instead.
pub(crate) struct Checkout<M: SessionManager> {
    inner: Arc<Shared<M>>,
    index: usize,
    state: SessionState,
    session: Option<M::Session>,
    armed: bool,
}

impl<M: SessionManager> Checkout<M> {
    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    pub(crate) fn session_mut(&mut self) -> &mut M::Session {
        self.session.as_mut().expect("checkout holds its session until commit or drop")
    }

    pub(crate) fn replace_session(&mut self, session: M::Session) {
        self.session = Some(session);
    }

    /// Disarm the guard and hand its session to the caller, who has taken
    /// over responsibility for eventually returning it (via
    /// [`BorrowedConnection`]'s own `Drop`).
    fn commit(mut self) -> M::Session {
        self.armed = false;
        self.session.take().expect("checkout holds its session until commit or drop")
    }
}

impl<M: SessionManager> Drop for Checkout<M> {
    fn drop(&mut self) {
        if self.armed {
            if let Some(session) = self.session.take() {
                release_sync(self.inner.clone(), self.index, Some(self.state), session);
            }
        }
    }
}

/// Synchronously return a session to its entry and notify one waiter.
///
/// Entries are returned to the pool from two `Drop` impls
/// ([`Checkout`] and [`BorrowedConnection`]), and `Drop` cannot be `async`.
/// Grounded directly on the teacher crate's own `Drop for PooledConnection`,
/// which runs its async `put_back` via `futures::executor::block_on`; the
/// inner future here never performs network I/O (it only locks an
/// uncontended cell and flips two fields), so blocking the calling thread for
/// its duration is effectively instantaneous.
fn release_sync<M: SessionManager>(
    inner: Arc<Shared<M>>,
    index: usize,
    state: Option<SessionState>,
    session: M::Session,
) {
    futures::executor::block_on(async move {
        let mut guard = inner.entries[index].lock().await;
        if let Some(state) = state {
            guard.state = state;
        }
        guard.session = Some(session);
        guard.locked = false;
        drop(guard);
        inner.notify.notify_one();
    });
}

/// A borrowed, ready-to-use [`Session`][crate::Session].
///
/// Exposes the wrapped session for the caller's use; dropping it returns the
/// entry to the pool (state left unchanged, `locked` cleared, one waiter
/// notified), matching the "release contract" of the design exactly.
pub struct BorrowedConnection<M: SessionManager> {
    pool: Pool<M>,
    index: usize,
    session: Option<M::Session>,
}

impl<M: SessionManager> BorrowedConnection<M> {
    /// The pool this connection was borrowed from.
    pub fn pool(&self) -> &Pool<M> {
        &self.pool
    }

    /// The borrowed session, ready for use.
    pub fn session(&mut self) -> &mut M::Session {
        self.session
            .as_mut()
            .expect("session present for the lifetime of the borrow")
    }
}

impl<M: SessionManager> std::fmt::Debug for BorrowedConnection<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("BorrowedConnection").field("index", &self.index).finish()
    }
}

impl<M: SessionManager> Drop for BorrowedConnection<M> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.pool.return_entry(self.index, session);
        }
    }
}
