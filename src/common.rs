//! Supporting utilities, not part of the public API.

/// Trace when the `tracing` feature is enabled; compiles to nothing otherwise.
macro_rules! verbose {
    ($($tt:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::trace!($($tt)*)
    };
}

/// Warn when the `tracing` feature is enabled; compiles to nothing otherwise.
macro_rules! notable {
    ($($tt:tt)*) => {
        #[cfg(feature = "tracing")]
        tracing::warn!($($tt)*)
    };
}

pub(crate) use notable;
pub(crate) use verbose;
