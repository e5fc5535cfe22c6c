//! A concrete [`Session`] backed by a real TCP socket.
//!
//! The DNS resolution, dialing, ping, and close primitives here are real I/O
//! against `tokio::net`. The MySQL handshake itself is delegated to an
//! injected [`Handshake`] implementation, keeping packet framing and
//! authentication out of this crate per its stated scope.
use std::{net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time,
};

use crate::{
    config::ConnectParams,
    error::{Diagnostics, Error, Result},
    session::{Handshake, Session, SessionManager},
};

/// A single `COM_PING`-shaped probe byte. The real value is defined by the
/// wire protocol layer; this crate only needs something the peer will ack.
const PING_PROBE: &[u8] = &[0x00];

/// Default bound on how long a `ping` may take before it is treated as a
/// failure, in the absence of the session's own configured timer duration.
const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// A [`Session`] whose transport is a plain (or TLS-wrapped, via `T`) TCP
/// stream, with the handshake delegated to `H`.
pub struct TcpSession<P, H>
where
    H: Handshake<TcpStream, P>,
    P: Send + Sync,
{
    stream: Option<TcpStream>,
    handshake: Arc<H>,
    _hparams: std::marker::PhantomData<fn() -> P>,
}

impl<P, H> TcpSession<P, H>
where
    H: Handshake<TcpStream, P>,
    P: Send + Sync,
{
    /// A fresh, not-yet-connected session using `handshake` to perform
    /// authentication once a transport is dialed.
    pub fn new(handshake: Arc<H>) -> Self {
        Self {
            stream: None,
            handshake,
            _hparams: std::marker::PhantomData,
        }
    }
}

impl<P, H> std::fmt::Debug for TcpSession<P, H>
where
    H: Handshake<TcpStream, P>,
    P: Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("TcpSession")
            .field("connected", &self.stream.is_some())
            .finish()
    }
}

#[async_trait]
impl<P, H> Session for TcpSession<P, H>
where
    H: Handshake<TcpStream, P>,
    P: Send + Sync + 'static,
{
    type Hparams = P;

    async fn resolve(&mut self, host: &str, port: &str) -> Result<Vec<SocketAddr>> {
        let query = format!("{host}:{port}");
        let endpoints: Vec<SocketAddr> = tokio::net::lookup_host(&query)
            .await
            .map_err(Error::resolve)?
            .collect();
        if endpoints.is_empty() {
            return Err(Error::resolve(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no addresses found for {query}"),
            )));
        }
        Ok(endpoints)
    }

    async fn connect(
        &mut self,
        endpoint: SocketAddr,
        hparams: &Self::Hparams,
        diag: &mut Diagnostics,
    ) -> Result<()> {
        let mut stream = TcpStream::connect(endpoint).await.map_err(Error::connect)?;
        self.handshake
            .handshake(&mut stream, hparams, diag)
            .await
            .map_err(|_| {
                // `handshake` has already populated `diag` on a server-origin
                // failure; forward it verbatim (the state machine still
                // counts this as a single connect failure either way).
                if diag.is_empty() {
                    Error::connect(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "handshake failed",
                    ))
                } else {
                    Error::server(diag.clone())
                }
            })?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn ping(&mut self) -> Result<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| Error::ping(std::io::Error::new(std::io::ErrorKind::NotConnected, "no stream")))?;

        time::timeout(PING_TIMEOUT, async {
            stream.write_all(PING_PROBE).await?;
            let mut reply = [0u8; 1];
            stream.read_exact(&mut reply).await?;
            Ok::<(), std::io::Error>(())
        })
        .await
        .map_err(|_| Error::ping(std::io::Error::new(std::io::ErrorKind::TimedOut, "ping timed out")))?
        .map_err(Error::ping)
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
    }

    async fn reset(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A [`SessionManager`] that manufactures [`TcpSession`]s for a fixed set of
/// [`ConnectParams`].
pub struct TcpSessionManager<P, H>
where
    H: Handshake<TcpStream, P>,
    P: Send + Sync,
{
    params: ConnectParams<P>,
    handshake: Arc<H>,
}

impl<P, H> TcpSessionManager<P, H>
where
    H: Handshake<TcpStream, P>,
    P: Send + Sync,
{
    /// Build a manager for `hostname:port`, using `handshake` to authenticate
    /// every connection and `hparams` as the opaque parameters passed to it.
    pub fn new(hostname: impl Into<String>, port: impl Into<String>, hparams: P, handshake: H) -> Self {
        Self {
            params: ConnectParams::new(hostname, port, hparams),
            handshake: Arc::new(handshake),
        }
    }

    /// Build a manager from an already-assembled [`ConnectParams`].
    pub fn with_params(params: ConnectParams<P>, handshake: H) -> Self {
        Self {
            params,
            handshake: Arc::new(handshake),
        }
    }
}

impl<P, H> std::fmt::Debug for TcpSessionManager<P, H>
where
    H: Handshake<TcpStream, P>,
    P: Send + Sync + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("TcpSessionManager")
            .field("params", &self.params)
            .finish()
    }
}

impl<P, H> SessionManager for TcpSessionManager<P, H>
where
    H: Handshake<TcpStream, P>,
    P: Send + Sync + 'static,
{
    type Session = TcpSession<P, H>;

    fn hostname(&self) -> &str {
        self.params.hostname()
    }

    fn port(&self) -> &str {
        self.params.port()
    }

    fn hparams(&self) -> &P {
        self.params.hparams()
    }

    fn new_session(&self) -> Self::Session {
        TcpSession::new(self.handshake.clone())
    }
}
