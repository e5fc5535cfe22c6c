//! Composes a condition-variable notification with a bounded timeout.
use std::time::Duration;

use tokio::sync::Notify;

use crate::common::verbose;

/// Which of the two waits completed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitOutcome {
    /// `cv` was notified.
    Notified,
    /// The bounded timeout elapsed first. Not an error: the pool treats this
    /// as a fairness measure and simply loops to rescan.
    TimedOut,
}

/// Await whichever of `notify.notified()` or `timeout` occurs first.
///
/// Grounded on the teacher crate's `SharedPool::or_timeout`, which wraps a
/// single future in `tokio::time::timeout` rather than hand-rolling a
/// select; here the "first-to-complete" pair is a condition-variable
/// notification instead of a oneshot receiver.
pub(crate) async fn wait_for_with_timeout(notify: &Notify, timeout: Duration) -> WaitOutcome {
    match tokio::time::timeout(timeout, notify.notified()).await {
        Ok(()) => WaitOutcome::Notified,
        Err(_) => {
            verbose!("pool wait timed out after {timeout:?}, rescanning");
            WaitOutcome::TimedOut
        }
    }
}
