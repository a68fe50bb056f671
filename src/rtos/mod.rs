//! RTOS backend: the bare-metal Cortex-M kernel this crate was built
//! around, generalized to speak the portable `Status`/timeout vocabulary
//! (see `crate::status`) instead of its own native [`core::error::OsError`].
//!
//! This module tree is carried behind the `backend-rtos` Cargo feature as
//! a conformance target, not a second production-grade implementation:
//! its job is to show that the portability contract is satisfiable on a
//! real preemptive kernel (ready lists, priority bitmap, tick wheel,
//! PendSV context switch), not to duplicate every primitive the hosted
//! backend offers. It has no message queue or software timer of its
//! own — those stayed POSIX-only; see `DESIGN.md`.

pub mod core;
pub mod sync;
pub mod port;
mod lang_items;
