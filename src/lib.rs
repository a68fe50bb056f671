//! A portable Operating System Abstraction Layer (OSAL).
//!
//! Five primitives — tasks, mutexes, binary and counting semaphores,
//! message queues, and software timers — exposed with identical
//! semantics over two execution substrates:
//!
//! - `backend-posix` (default): a hosted backend built on `std::thread`
//!   and `std::sync`, the primary, fully-tested target of this crate.
//! - `backend-rtos`: the bare-metal Cortex-M kernel this crate grew out
//!   of (ready lists, priority bitmap, tick wheel, PendSV context
//!   switch), carried as a conformance target behind its own feature and
//!   its own task/mutex/semaphore primitives. See `DESIGN.md` for the
//!   scope split between the two.
//!
//! Every fallible operation returns [`status::OsalResult<T>`]; see
//! [`status::Status`] for the closed taxonomy both backends share.

#![cfg_attr(not(feature = "backend-posix"), no_std)]
#![cfg_attr(feature = "backend-rtos", deny(unsafe_op_in_unsafe_fn))]

// ============ Critical Section (RTOS backend, Cortex-M target) ============

#[cfg(all(feature = "backend-rtos", target_arch = "arm"))]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{set_impl, Impl, RawRestoreState};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Ambient stack shared by every backend ============

pub mod assert;
pub mod config;
pub mod log;
pub mod status;
pub mod time;

pub use status::{OsalResult, Status};

// ============ Hosted backend ============

#[cfg(feature = "backend-posix")]
pub mod posix;

// ============ RTOS conformance backend ============

#[cfg(feature = "backend-rtos")]
pub mod rtos;

// Flat re-exports so the RTOS kernel's own modules (which predate this
// crate's OSAL surface and address each other as `crate::kernel`,
// `crate::error`, etc.) keep resolving, and so `backend-rtos` callers and
// `demos/` can reach the kernel without spelling out the full
// `rtos::core::*` path.
#[cfg(feature = "backend-rtos")]
pub use rtos::core;
#[cfg(feature = "backend-rtos")]
pub use core::critical;
#[cfg(feature = "backend-rtos")]
pub use core::error;
#[cfg(feature = "backend-rtos")]
pub use core::error::OsError;
#[cfg(feature = "backend-rtos")]
pub use core::kernel;
#[cfg(feature = "backend-rtos")]
pub use core::kernel::{os_init, os_start};
#[cfg(feature = "backend-rtos")]
pub use core::prio;
#[cfg(feature = "backend-rtos")]
pub use core::sched;
#[cfg(feature = "backend-rtos")]
pub use core::task;
#[cfg(feature = "backend-rtos")]
pub use core::task::os_task_create;
#[cfg(feature = "backend-rtos")]
pub use core::types;
#[cfg(feature = "backend-rtos")]
pub use core::types::*;
#[cfg(feature = "backend-rtos")]
pub use rtos::port;

#[cfg(all(feature = "backend-rtos", feature = "sem"))]
pub use rtos::sync::sem;
#[cfg(all(feature = "backend-rtos", feature = "mutex"))]
pub use rtos::sync::mutex;

#[cfg(feature = "pac")]
pub use stm32_metapac as pac;
