//! Drives a checked-out entry from any non-`InUse` state to `InUse`.
use crate::{
    common::{notable, verbose},
    config::PoolConfig,
    entry::SessionState,
    error::{Diagnostics, Error, Result},
    pool::Checkout,
    session::SessionManager,
};

/// Bring `checkout` (already holding the entry's `Session` with `locked = true`
/// recorded in the pool) to `InUse`, retrying with backoff per `config`, or
/// fail with [`ErrorKind::PoolRetriesExhausted`][crate::ErrorKind::PoolRetriesExhausted].
///
/// This is the only code that decides `entry.state` transitions during setup.
/// It operates on an owned `Session` plus a local state variable rather than
/// repeatedly re-locking the entry's cell: the `locked` flag already recorded
/// in the pool is what gives this task exclusive ownership (I6), so the
/// strongest available realization of that invariant is for the `Session` to
/// simply live here, outside any shared cell, for the whole attempt loop.
///
/// On success, `checkout`'s state is left at `InUse` and diagnostics are
/// cleared. On failure, `checkout` is left holding its `Session` and whatever
/// state the last successful transition produced; the caller (via
/// `Checkout`'s `Drop`) is responsible for returning both to the pool and
/// clearing `locked`, which also covers the cancellation case where this
/// future is dropped mid-attempt rather than returning normally.
pub(crate) async fn setup<M>(
    checkout: &mut Checkout<M>,
    manager: &M,
    config: &PoolConfig,
    diag: &mut Diagnostics,
) -> Result<()>
where
    M: SessionManager,
{
    let max_num_tries = config.max_num_tries_value();
    let between_tries = config.between_tries_value();
    let entry_index = checkout.index();

    for attempt in 1..=max_num_tries {
        match checkout.state() {
            SessionState::NotConnected => {
                let endpoints = checkout
                    .session_mut()
                    .resolve(manager.hostname(), manager.port())
                    .await;

                let endpoints = match endpoints {
                    Ok(endpoints) => endpoints,
                    Err(err) => {
                        verbose!(entry_index, attempt, %err, "resolve failed, retrying");
                        tokio::time::sleep(between_tries).await;
                        continue;
                    }
                };

                let connected = checkout
                    .session_mut()
                    .connect(endpoints[0], manager.hparams(), diag)
                    .await;

                match connected {
                    Ok(()) => {
                        checkout.set_state(SessionState::InUse);
                        diag.clear();
                        return Ok(());
                    }
                    Err(err) => {
                        verbose!(entry_index, attempt, %err, "connect failed, retrying");
                        tokio::time::sleep(between_tries).await;
                        continue;
                    }
                }
            }

            SessionState::PendingReset => {
                // Reset is elided in this revision: a pending-reset entry is
                // assumed clean enough to hand back out as-is.
                checkout.set_state(SessionState::InUse);
                diag.clear();
                return Ok(());
            }

            SessionState::Iddle => {
                let ping_result = checkout.session_mut().ping().await;

                match ping_result {
                    Ok(()) => {
                        checkout.set_state(SessionState::InUse);
                        diag.clear();
                        return Ok(());
                    }
                    Err(err) => {
                        verbose!(entry_index, attempt, %err, "ping failed, reconnecting");

                        checkout.session_mut().close().await;
                        checkout.replace_session(manager.new_session());
                        checkout.set_state(SessionState::NotConnected);

                        tokio::time::sleep(between_tries).await;
                        continue;
                    }
                }
            }

            SessionState::InUse => {
                // The pool never hands `setup` an entry in this state: it is
                // the terminal state `setup` itself produces.
                unreachable!("setup invoked on an entry already InUse")
            }
        }
    }

    notable!(entry_index, max_num_tries, "retry budget exhausted");
    Err(Error::retries_exhausted(max_num_tries))
}
