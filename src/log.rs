//! Logging façade.
//!
//! On the hosted backend this forwards to the `log` crate, so a consumer
//! can plug in `env_logger`, `tracing-log`, or any other `log` backend. On
//! the RTOS backend it forwards to `defmt`, unchanged from the donor
//! kernel, since that is what the embedded ecosystem already reaches for.

#[cfg(feature = "backend-posix")]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}
#[cfg(feature = "backend-posix")]
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { log::info!($($arg)*) };
}
#[cfg(feature = "backend-posix")]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}
#[cfg(feature = "backend-posix")]
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { log::error!($($arg)*) };
}
#[cfg(feature = "backend-posix")]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { log::trace!($($arg)*) };
}

/// Debug message
#[cfg(all(feature = "backend-rtos", feature = "defmt"))]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { defmt::debug!($($arg)*) };
}

/// Info message
#[cfg(all(feature = "backend-rtos", feature = "defmt"))]
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { defmt::info!($($arg)*) };
}

/// Error message
#[cfg(all(feature = "backend-rtos", feature = "defmt"))]
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { defmt::error!($($arg)*) };
}

/// Trace message
#[cfg(all(feature = "backend-rtos", feature = "defmt"))]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { defmt::trace!($($arg)*) };
}

/// Warning message
#[cfg(all(feature = "backend-rtos", feature = "defmt"))]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { defmt::warn!($($arg)*) };
}

// No-op versions on the RTOS backend when defmt is disabled.
#[cfg(all(feature = "backend-rtos", not(feature = "defmt")))]
#[macro_export]
macro_rules! debug { ($($arg:tt)*) => {}; }
#[cfg(all(feature = "backend-rtos", not(feature = "defmt")))]
#[macro_export]
macro_rules! info { ($($arg:tt)*) => {}; }
#[cfg(all(feature = "backend-rtos", not(feature = "defmt")))]
#[macro_export]
macro_rules! error { ($($arg:tt)*) => {}; }
#[cfg(all(feature = "backend-rtos", not(feature = "defmt")))]
#[macro_export]
macro_rules! trace { ($($arg:tt)*) => {}; }
#[cfg(all(feature = "backend-rtos", not(feature = "defmt")))]
#[macro_export]
macro_rules! warn { ($($arg:tt)*) => {}; }

pub use crate::debug;
pub use crate::error;
pub use crate::info;
pub use crate::trace;
pub use crate::warn;
