//! An asynchronous connection pool, designed around MySQL-protocol sessions.
//!
//! Opening a new database connection every time one is needed is both
//! inefficient and can lead to resource exhaustion under high traffic
//! conditions. A connection pool maintains a bounded set of live sessions,
//! handing them out for repeated use and healing them — through a reconnect
//! or a reconnect-after-stale-ping — before handing them back out.
//!
//! This crate is the core of such a pool: it knows nothing about MySQL
//! packet framing, capability negotiation, or authentication. It only drives
//! a small state machine (`NotConnected` → `InUse` → back to idle) over
//! whatever implements [`Session`], retrying with backoff and replacing
//! sessions that can no longer be trusted.
//!
//! # Example
//!
//! Using the bundled [`TcpSession`] against a server that needs no
//! authentication (a real deployment plugs in its own [`Handshake`]):
//!
//! ```no_run
//! use myskel_pool::{Diagnostics, Pool, PoolConfig};
//! use myskel_pool::session::tcp::TcpSessionManager;
//! use myskel_pool::session::NoopHandshake;
//!
//! # async fn run() -> myskel_pool::Result<()> {
//! let manager = TcpSessionManager::new("127.0.0.1", "3306", (), NoopHandshake);
//! let pool = Pool::new(manager, PoolConfig::new().capacity(10));
//!
//! let mut diag = Diagnostics::new();
//! let mut conn = pool.get_connection(&mut diag).await?;
//! conn.session().ping().await?;
//! // Dropped connection is returned to the pool.
//! # Ok(())
//! # }
//! ```
#![deny(missing_debug_implementations)]

mod common;
mod config;
mod entry;
mod error;
mod pool;
pub mod session;
mod state_machine;
mod wait;

pub use config::{ConnectParams, PoolConfig};
pub use error::{Diagnostics, Error, ErrorKind, Result};
pub use pool::{BorrowedConnection, Pool};
pub use session::{Handshake, NoopHandshake, Session, SessionManager};
