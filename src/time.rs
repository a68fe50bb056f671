//! Millisecond time and timeout model shared by every backend.
//!
//! Time is unsigned 32-bit milliseconds since an unspecified epoch (process
//! start on the hosted backend, kernel tick count on the RTOS backend). It
//! wraps after about 49.7 days; elapsed-time arithmetic must use
//! [`u32::wrapping_sub`] rather than plain subtraction.

/// A duration or deadline expressed in milliseconds.
pub type TimeoutMs = u32;

/// Sentinel meaning "block with no timeout".
pub const MAX_DELAY: TimeoutMs = 0xFFFF_FFFF;

/// Sentinel meaning "do not block; try once and report the outcome".
pub const NO_WAIT: TimeoutMs = 0;

/// The three timeout regimes every blocking OSAL operation recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// `timeout == 0`: try once, return immediately either way.
    Poll,
    /// `timeout == MAX_DELAY`: block until the condition holds.
    Forever,
    /// Any other value: block up to that many milliseconds.
    Bounded(TimeoutMs),
}

impl WaitMode {
    pub const fn from_timeout(timeout: TimeoutMs) -> WaitMode {
        match timeout {
            NO_WAIT => WaitMode::Poll,
            MAX_DELAY => WaitMode::Forever,
            ms => WaitMode::Bounded(ms),
        }
    }
}

/// Returns the elapsed milliseconds between two `now_ms()` samples, correct
/// across a single wraparound.
#[inline]
pub const fn elapsed_ms(earlier: TimeoutMs, later: TimeoutMs) -> TimeoutMs {
    later.wrapping_sub(earlier)
}

#[cfg(feature = "backend-posix")]
mod hosted {
    use std::sync::OnceLock;
    use std::time::Instant;

    static EPOCH: OnceLock<Instant> = OnceLock::new();

    fn epoch() -> Instant {
        *EPOCH.get_or_init(Instant::now)
    }

    /// Monotonic milliseconds since the first call to any OSAL time
    /// function in this process.
    pub fn now_ms() -> u32 {
        epoch().elapsed().as_millis() as u32
    }

    pub fn deadline(timeout: super::TimeoutMs) -> Instant {
        Instant::now() + std::time::Duration::from_millis(timeout as u64)
    }
}

#[cfg(feature = "backend-posix")]
pub use hosted::now_ms;
#[cfg(feature = "backend-posix")]
pub(crate) use hosted::deadline;

#[cfg(feature = "backend-rtos")]
pub fn now_ms() -> u32 {
    crate::rtos::core::kernel::KERNEL.tick_get()
        .wrapping_mul(1000 / crate::config::CFG_TICK_RATE_HZ)
}

#[cfg(all(test, feature = "backend-posix"))]
mod tests {
    use super::*;

    #[test]
    fn wait_mode_classifies_sentinels() {
        assert_eq!(WaitMode::from_timeout(0), WaitMode::Poll);
        assert_eq!(WaitMode::from_timeout(MAX_DELAY), WaitMode::Forever);
        assert_eq!(WaitMode::from_timeout(50), WaitMode::Bounded(50));
    }

    #[test]
    fn elapsed_handles_wraparound() {
        assert_eq!(elapsed_ms(u32::MAX - 4, 5), 9);
        assert_eq!(elapsed_ms(10, 15), 5);
    }

    #[test]
    fn now_ms_is_monotonic_and_roughly_accurate() {
        let start = now_ms();
        std::thread::sleep(std::time::Duration::from_millis(60));
        let elapsed = elapsed_ms(start, now_ms());
        assert!(elapsed >= 50, "elapsed {elapsed} too small");
        assert!(elapsed < 500, "elapsed {elapsed} too large");
    }
}
