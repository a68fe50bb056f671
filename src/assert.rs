//! Argument guards and the assertion hook.
//!
//! Mirrors the donor C implementation's `OSAL_CHECK_POINTER` / `ARGCHECK`
//! / `LENGTHCHECK` family: a guard both returns the appropriate [`Status`]
//! and, for programmer-error classes, reports through the assertion hook
//! so a caller can be told *where* the contract was violated without the
//! process being torn down (unlike `panic!`, which a hosted test process
//! should not rely on for ordinary misuse).

use crate::config::MAX_NAME_LEN;
use crate::status::Status;

/// Describes a single contract violation.
#[derive(Debug, Clone, Copy)]
pub struct AssertInfo {
    pub file: &'static str,
    pub line: u32,
    pub message: &'static str,
}

type AssertHook = fn(&AssertInfo);

fn default_hook(info: &AssertInfo) {
    crate::log::error!("osal contract violation at {}:{}: {}", info.file, info.line, info.message);
}

// The hook is swapped behind a safe mutex on both backends — no transmute,
// no raw pointer. The hosted backend reaches for `std::sync::Mutex`; the
// no_std RTOS backend reaches for the `critical_section` crate's `Mutex`,
// the same safe-global pattern the rest of the embedded ecosystem (and
// this crate's own `cs_impl` in `lib.rs`) already uses for shared statics.

#[cfg(feature = "backend-posix")]
mod hook_cell {
    use super::{default_hook, AssertHook};
    use std::sync::Mutex;

    static HOOK: Mutex<AssertHook> = Mutex::new(default_hook);

    pub fn set(hook: AssertHook) {
        *HOOK.lock().unwrap() = hook;
    }

    pub fn reset() {
        *HOOK.lock().unwrap() = default_hook;
    }

    pub fn get() -> AssertHook {
        *HOOK.lock().unwrap()
    }
}

#[cfg(all(feature = "backend-rtos", not(feature = "backend-posix")))]
mod hook_cell {
    use super::{default_hook, AssertHook};
    use core::cell::RefCell;
    use critical_section::Mutex;

    static HOOK: Mutex<RefCell<AssertHook>> = Mutex::new(RefCell::new(default_hook));

    pub fn set(hook: AssertHook) {
        critical_section::with(|cs| *HOOK.borrow(cs).borrow_mut() = hook);
    }

    pub fn reset() {
        critical_section::with(|cs| *HOOK.borrow(cs).borrow_mut() = default_hook);
    }

    pub fn get() -> AssertHook {
        critical_section::with(|cs| *HOOK.borrow(cs).borrow())
    }
}

/// Installs a custom assertion hook, replacing the default (which logs at
/// error level). Intended for tests that want to assert a guard fired.
pub fn set_hook(hook: AssertHook) {
    hook_cell::set(hook);
}

/// Restores the default logging hook.
pub fn reset_hook() {
    hook_cell::reset();
}

#[doc(hidden)]
pub fn trigger(file: &'static str, line: u32, message: &'static str) {
    let hook = hook_cell::get();
    hook(&AssertInfo { file, line, message });
}

/// Fires the assertion hook with the caller's location, for use at the
/// point a guard rejects an argument.
#[macro_export]
macro_rules! assert_violation {
    ($msg:expr) => {
        $crate::assert::trigger(file!(), line!(), $msg)
    };
}

/// Rejects a name that is empty or whose UTF-8 byte length would not fit
/// in [`MAX_NAME_LEN`] including the implicit terminator.
pub fn check_name(name: &str) -> Result<(), Status> {
    if name.len() >= MAX_NAME_LEN {
        assert_violation!("name exceeds MAX_NAME_LEN");
        return Err(Status::NameTooLong);
    }
    Ok(())
}

/// Rejects a zero size where the operation requires a positive one.
pub fn check_nonzero_usize(value: usize, status: Status) -> Result<(), Status> {
    if value == 0 {
        assert_violation!("expected a non-zero size");
        return Err(status);
    }
    Ok(())
}

/// Rejects a caller-provided slice whose length does not exactly match the
/// object's fixed item size.
pub fn check_slice_len(slice_len: usize, expected: usize) -> Result<(), Status> {
    if slice_len != expected {
        assert_violation!("slice length does not match item size");
        return Err(Status::InvalidSize);
    }
    Ok(())
}

/// Rejects `capacity * item_size` combinations that would overflow a
/// `usize`, used by queue creation.
pub fn check_no_overflow(capacity: usize, item_size: usize) -> Result<usize, Status> {
    capacity.checked_mul(item_size).ok_or_else(|| {
        assert_violation!("capacity * item_size overflows usize");
        Status::QueueInvalidSize
    })
}

#[cfg(all(test, feature = "backend-posix"))]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as O};

    static HITS: AtomicUsize = AtomicUsize::new(0);

    fn counting_hook(_info: &AssertInfo) {
        HITS.fetch_add(1, O::SeqCst);
    }

    #[test]
    fn name_guard_rejects_oversized_names() {
        let long = "x".repeat(MAX_NAME_LEN);
        assert_eq!(check_name(&long), Err(Status::NameTooLong));
        assert_eq!(check_name("ok"), Ok(()));
    }

    #[test]
    fn hook_fires_on_violation() {
        set_hook(counting_hook);
        let before = HITS.load(O::SeqCst);
        let _ = check_nonzero_usize(0, Status::InvalidSize);
        assert_eq!(HITS.load(O::SeqCst), before + 1);
        reset_hook();
    }

    #[test]
    fn overflow_guard_catches_huge_products() {
        assert_eq!(check_no_overflow(usize::MAX, 2), Err(Status::QueueInvalidSize));
        assert_eq!(check_no_overflow(4, 8), Ok(32));
    }
}
