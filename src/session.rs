//! The pool's only boundary with the MySQL wire protocol.
//!
//! Everything in this module is deliberately thin: packet framing, capability
//! negotiation, authentication, and resultset decoding belong to the
//! surrounding library's protocol layer, not to the pool core. The pool only
//! ever calls the five primitives on [`Session`]; it never inspects a
//! session's internals.
use std::net::SocketAddr;

use async_trait::async_trait;

use crate::error::{Diagnostics, Result};

pub mod tcp;

/// Per-connection protocol session.
///
/// A `Session` is not required to be reusable across a failed `connect`: in
/// particular, a TLS-wrapped stream is consumed by a single connection
/// attempt. [`SessionManager::new_session`] is how the state machine obtains
/// a fresh one when an old session can no longer be trusted.
#[async_trait]
pub trait Session: Send + 'static {
    /// Handshake parameters, opaque to the pool.
    type Hparams: Send + Sync;

    /// Resolve `host`/`port` to a set of candidate endpoints.
    ///
    /// Only the first endpoint returned is ever used by the state machine;
    /// multi-address failover is out of scope for this design.
    async fn resolve(&mut self, host: &str, port: &str) -> Result<Vec<SocketAddr>>;

    /// Dial `endpoint`, perform the MySQL handshake, and establish TLS if the
    /// manager's context calls for it. On a server-reported error, `diag` is
    /// populated with the server's detail before the error is returned.
    async fn connect(
        &mut self,
        endpoint: SocketAddr,
        hparams: &Self::Hparams,
        diag: &mut Diagnostics,
    ) -> Result<()>;

    /// Send a `COM_PING` and await the server's OK reply.
    async fn ping(&mut self) -> Result<()>;

    /// Best-effort graceful close. Errors are intentionally not surfaced;
    /// callers ignore the result, matching the source's `close()` contract.
    async fn close(&mut self);

    /// Logical session reset. Not invoked by the state machine in this
    /// revision (see the `PendingReset` design note); kept on the trait for
    /// forward compatibility.
    async fn reset(&mut self) -> Result<()>;
}

/// Manufactures fresh [`Session`]s and carries the connection parameters
/// a pool was built with.
///
/// This is the pool's only generic parameter, playing the same role the
/// teacher crate's `ManageConnection` plays for a generic connection manager,
/// specialized here to the MySQL session lifecycle of §4 of the design.
pub trait SessionManager: Send + Sync + 'static {
    /// The concrete session type this manager creates.
    type Session: Session;

    /// The hostname sessions should resolve.
    fn hostname(&self) -> &str;

    /// The port or service name sessions should resolve.
    fn port(&self) -> &str;

    /// The handshake parameters passed to every `Session::connect` call.
    fn hparams(&self) -> &<Self::Session as Session>::Hparams;

    /// Build a brand-new, `NotConnected` session bound to this manager's
    /// executor and TLS context.
    ///
    /// Called once per pool entry at construction, and again whenever the
    /// `Iddle` branch of the state machine discovers a dead peer and must
    /// replace the underlying session in place.
    fn new_session(&self) -> Self::Session;
}

/// The seam between a raw transport and the MySQL wire protocol.
///
/// Capability negotiation, authentication, and (optionally) the TLS upgrade
/// itself are layer (a)/(b) concerns the core design explicitly keeps out of
/// scope. A real deployment supplies a `Handshake` implementation backed by
/// the library's protocol crate; [`NoopHandshake`] is provided only so this
/// crate's own tests and trivial deployments have something to plug in.
#[async_trait]
pub trait Handshake<T, H>: Send + Sync + 'static
where
    T: Send,
    H: Send + Sync,
{
    /// Perform the handshake over `transport`, using `hparams`. On a
    /// server-reported failure, populate `diag` before returning an error.
    async fn handshake(&self, transport: &mut T, hparams: &H, diag: &mut Diagnostics) -> Result<()>;
}

/// A [`Handshake`] that performs no negotiation and always succeeds.
///
/// Stands in for the real MySQL authentication handshake, which this crate
/// does not implement (see the crate's scope notes). Only useful against a
/// server that requires no authentication, or in tests that exercise the
/// pool's own bookkeeping rather than protocol correctness.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandshake;

#[async_trait]
impl<T, H> Handshake<T, H> for NoopHandshake
where
    T: Send,
    H: Send + Sync,
{
    async fn handshake(&self, _transport: &mut T, _hparams: &H, _diag: &mut Diagnostics) -> Result<()> {
        Ok(())
    }
}
