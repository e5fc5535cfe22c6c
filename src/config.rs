//! Pool configuration.
use std::time::Duration;

/// The hard-coded values from the original setup state machine, kept as
/// defaults so a pool built with [`PoolConfig::new`] behaves identically to
/// one with no tuning at all.
const DEFAULT_MAX_NUM_TRIES: u32 = 10;
const DEFAULT_BETWEEN_TRIES: Duration = Duration::from_millis(1000);
const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection parameters shared by every entry in a pool.
///
/// Immutable once a [`Pool`][crate::Pool] is built; `hparams` is treated as an
/// opaque record handed verbatim to [`Session::connect`][crate::Session::connect].
#[derive(Debug, Clone)]
pub struct ConnectParams<H> {
    hostname: String,
    port: String,
    hparams: H,
}

impl<H> ConnectParams<H> {
    /// Build a new connection parameter record.
    pub fn new(hostname: impl Into<String>, port: impl Into<String>, hparams: H) -> Self {
        Self {
            hostname: hostname.into(),
            port: port.into(),
            hparams,
        }
    }

    /// The configured hostname, passed to [`Session::resolve`][crate::Session::resolve].
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The configured port or service name.
    pub fn port(&self) -> &str {
        &self.port
    }

    /// The opaque handshake parameters passed to [`Session::connect`][crate::Session::connect].
    pub fn hparams(&self) -> &H {
        &self.hparams
    }
}

/// A builder for a [`Pool`][crate::Pool].
///
/// Mirrors the teacher crate's `Builder<M>`: every knob defaults to the
/// behavior the design originally hard-coded, and nothing here changes any
/// contract of the setup state machine — it only exposes the constants that
/// were previously baked in (max retry count, backoff, and the pool-wait
/// timeout).
#[derive(Debug, Clone)]
pub struct PoolConfig {
    capacity: usize,
    max_num_tries: u32,
    between_tries: Duration,
    wait_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            max_num_tries: DEFAULT_MAX_NUM_TRIES,
            between_tries: DEFAULT_BETWEEN_TRIES,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }
}

impl PoolConfig {
    /// Construct a new configuration with every default in place.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fixed number of entries the pool will ever hold.
    ///
    /// Defaults to 10. The vector of entries is never resized after the pool
    /// is built.
    pub fn capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than zero!");
        self.capacity = capacity;
        self
    }

    /// Sets the number of setup attempts the state machine makes before
    /// failing with [`ErrorKind::PoolRetriesExhausted`][crate::ErrorKind::PoolRetriesExhausted].
    ///
    /// Defaults to 10.
    pub fn max_num_tries(mut self, max_num_tries: u32) -> Self {
        assert!(max_num_tries > 0, "max_num_tries must be greater than zero!");
        self.max_num_tries = max_num_tries;
        self
    }

    /// Sets the backoff slept between setup attempts.
    ///
    /// Defaults to 1 second.
    pub fn between_tries(mut self, between_tries: Duration) -> Self {
        self.between_tries = between_tries;
        self
    }

    /// Sets the bounded timeout a caller waits on the pool's condition
    /// variable before looping to rescan for an eligible entry.
    ///
    /// Defaults to 10 seconds. This is a fairness measure, not a caller-visible
    /// error: a timeout here is transparent and simply causes another scan.
    pub fn wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    pub(crate) fn capacity_value(&self) -> usize {
        self.capacity
    }

    pub(crate) fn max_num_tries_value(&self) -> u32 {
        self.max_num_tries
    }

    pub(crate) fn between_tries_value(&self) -> Duration {
        self.between_tries
    }

    pub(crate) fn wait_timeout_value(&self) -> Duration {
        self.wait_timeout
    }
}
