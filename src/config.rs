//! Compile-time tunables shared by every backend.

/// Maximum length, in bytes, of a name passed to any `create` call,
/// including the implicit terminator. A name whose UTF-8 length is
/// `>= MAX_NAME_LEN` is rejected with [`crate::Status::NameTooLong`].
pub const MAX_NAME_LEN: usize = 32;

/// Default stack size, in bytes, used when a task is created without an
/// explicit size on the hosted backend.
#[cfg(feature = "backend-posix")]
pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

/// Default queue item-count hint used only by demo code, never enforced by
/// the library.
pub const DEFAULT_QUEUE_CAPACITY_HINT: usize = 16;

#[cfg(feature = "backend-rtos")]
pub use crate::rtos::core::config::*;
