//! Hosted task subsystem: a thin, checked wrapper over `std::thread`.
//!
//! Grounded on `examples/original_source/src/osal/posix/osal_task_impl.c`
//! for the attribute-validation rules (core affinity range, scheduling
//! policy best-effort) and on the donor kernel's `core/task/mod.rs` for
//! the create/delete call shape this crate's other backend exposes.

use crate::assert::check_name;
use crate::config::MAX_NAME_LEN;
use crate::status::{OsalResult, Status};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// No explicit CPU affinity requested.
pub const NO_AFFINITY: i32 = -1;

/// Backend-supported priority range. Values above [`PRIORITY_MAX`] are
/// rejected with `Status::InvalidPriority` at `create` time, independent of
/// whether the process is privileged enough to actually apply them — the
/// privilege check happens later, best-effort, when the thread starts.
pub const PRIORITY_MIN: u32 = 0;
pub const PRIORITY_MAX: u32 = 99;

/// Construction-time task attributes. Built exclusively through
/// [`TaskAttrBuilder`] so there is no ABI-compatibility "reserved" field to
/// validate — unlike the C reference, the Rust surface makes an invalid
/// reserved value unrepresentable rather than a runtime check.
#[derive(Debug, Clone)]
pub struct TaskAttr {
    core_affinity: i32,
    priority: Option<u32>,
}

impl Default for TaskAttr {
    fn default() -> Self {
        TaskAttr { core_affinity: NO_AFFINITY, priority: None }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskAttrBuilder {
    attr: TaskAttr,
}

impl TaskAttrBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn core_affinity(mut self, core: i32) -> Self {
        self.attr.core_affinity = core;
        self
    }

    pub fn priority(mut self, priority: u32) -> Self {
        self.attr.priority = Some(priority);
        self
    }

    pub fn build(self) -> TaskAttr {
        self.attr
    }
}

/// A cooperative cancellation flag handed to the task body and checked by
/// well-behaved task code at safe points (loop tops, after `delay_ms`).
///
/// Rust's standard library intentionally provides no `pthread_cancel`
/// equivalent, so hard preemptive termination of a running hosted thread
/// is not offered; this is a deliberate, documented deviation from the C
/// reference (see `DESIGN.md`).
#[derive(Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Handle to a created task. Not `Clone`; owns the join handle.
pub struct TaskHandle {
    join: Option<JoinHandle<()>>,
    cancel: Arc<AtomicBool>,
    thread_id: thread::ThreadId,
}

fn validate_attr(attr: &TaskAttr) -> OsalResult<()> {
    if attr.core_affinity != NO_AFFINITY {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get() as i32)
            .unwrap_or(1);
        if attr.core_affinity < 0 || attr.core_affinity >= cpus {
            return Err(Status::InvalidArgument);
        }
    }
    if let Some(priority) = attr.priority {
        if priority > PRIORITY_MAX {
            return Err(Status::InvalidPriority);
        }
    }
    Ok(())
}

/// Best-effort `SCHED_RR` priority application, run from inside the newly
/// spawned thread (a `pthread_t` only reliably names the calling thread
/// without reaching for `JoinHandleExt`, which would consume the handle
/// this module still needs for `delete`'s join). Clamped into whatever
/// range the host reports for `SCHED_RR`; any failure — most commonly
/// `EPERM` for an unprivileged process — is swallowed, matching the
/// contract's "advisory: clamped or ignored without affecting correctness."
fn apply_priority(priority: u32) {
    unsafe {
        let min = libc::sched_get_priority_min(libc::SCHED_RR);
        let max = libc::sched_get_priority_max(libc::SCHED_RR);
        if min < 0 || max < 0 {
            return;
        }
        let clamped = (priority as i32).clamp(min, max);
        let param = libc::sched_param { sched_priority: clamped };
        let _ = libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_RR, &param);
    }
}

/// Creates a new task running `entry(arg)` on its own OS thread.
///
/// `name` must be shorter than [`MAX_NAME_LEN`]. `stack_size` is advisory
/// (forwarded to [`thread::Builder::stack_size`]); `0` is rejected before
/// it ever reaches the OS. A `priority` outside
/// [`PRIORITY_MIN`]..=[`PRIORITY_MAX`] is rejected with
/// `Status::InvalidPriority`; a priority within range is clamped into the
/// host's `SCHED_RR` range and applied via `pthread_setschedparam` when the
/// process has permission to set it, and silently ignored at the OS level
/// otherwise, matching the "advisory" contract.
pub fn create<F>(
    name: &str,
    stack_size: usize,
    attr: &TaskAttr,
    entry: F,
) -> OsalResult<(TaskHandle, CancelToken)>
where
    F: FnOnce(CancelToken) + Send + 'static,
{
    check_name(name)?;
    if stack_size == 0 {
        return Err(Status::InvalidSize);
    }
    validate_attr(attr)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_for_task = CancelToken(cancel.clone());
    let name_owned = name.to_string();
    let priority = attr.priority;

    let builder = thread::Builder::new().name(name_owned).stack_size(stack_size);
    let join = builder
        .spawn(move || {
            if let Some(priority) = priority {
                apply_priority(priority);
            }
            entry(cancel_for_task)
        })
        .map_err(|_| Status::Error)?;
    let thread_id = join.thread().id();

    Ok((TaskHandle { join: Some(join), cancel: cancel.clone(), thread_id }, CancelToken(cancel)))
}

impl TaskHandle {
    /// Requests cooperative cancellation and joins the task's thread.
    ///
    /// Returns `Status::InvalidArgument` if called from within the task's
    /// own thread (a thread cannot join itself, unlike the RTOS backend's
    /// kernel, which can discard its own current TCB without a join).
    pub fn delete(mut self) -> OsalResult<()> {
        if thread::current().id() == self.thread_id {
            return Err(Status::InvalidArgument);
        }
        self.cancel.store(true, Ordering::Release);
        if let Some(join) = self.join.take() {
            join.join().map_err(|_| Status::Error)?;
        }
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map(|j| j.is_finished()).unwrap_or(true)
    }
}

/// Blocks the calling thread for approximately `ms` milliseconds.
pub fn delay_ms(ms: u32) {
    thread::sleep(std::time::Duration::from_millis(ms as u64));
}

/// Monotonic milliseconds, identical to [`crate::time::now_ms`]; exposed
/// here too for parity with the donor's `osal_task_get_time_ms`.
pub fn current_time_ms() -> u32 {
    crate::time::now_ms()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn create_delivers_argument_and_runs() {
        let flag = Arc::new(AtomicBool::new(false));
        let flag2 = flag.clone();
        let (handle, _cancel) = create("t1", 64 * 1024, &TaskAttr::default(), move |_| {
            flag2.store(true, Ordering::SeqCst);
        })
        .unwrap();
        handle.delete().unwrap();
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn many_tasks_each_set_a_unique_flag() {
        const N: usize = 8;
        let counter = Arc::new(AtomicU32::new(0));
        let mut handles = Vec::new();
        for i in 0..N {
            let counter = counter.clone();
            let (h, _c) = create(&format!("t{i}"), 64 * 1024, &TaskAttr::default(), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
            handles.push(h);
        }
        for h in handles {
            h.delete().unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), N as u32);
    }

    #[test]
    fn rejects_oversized_name() {
        let long = "x".repeat(MAX_NAME_LEN);
        let result = create(&long, 64 * 1024, &TaskAttr::default(), |_| {});
        assert_eq!(result.err(), Some(Status::NameTooLong));
    }

    #[test]
    fn rejects_zero_stack_size() {
        let result = create("t", 0, &TaskAttr::default(), |_| {});
        assert_eq!(result.err(), Some(Status::InvalidSize));
    }

    #[test]
    fn rejects_priority_above_backend_range() {
        let attr = TaskAttrBuilder::new().priority(PRIORITY_MAX + 1).build();
        let result = create("t", 64 * 1024, &attr, |_| {});
        assert_eq!(result.err(), Some(Status::InvalidPriority));
    }

    #[test]
    fn accepts_priority_within_backend_range_and_runs() {
        let attr = TaskAttrBuilder::new().priority(PRIORITY_MAX / 2).build();
        let flag = Arc::new(AtomicBool::new(false));
        let flag2 = flag.clone();
        let (handle, _cancel) = create("t", 64 * 1024, &attr, move |_| {
            flag2.store(true, Ordering::SeqCst);
        })
        .unwrap();
        handle.delete().unwrap();
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn cooperative_cancellation_is_observed() {
        let (handle, cancel) = create("t", 64 * 1024, &TaskAttr::default(), move |token| {
            while !token.is_cancelled() {
                thread::sleep(std::time::Duration::from_millis(5));
            }
        })
        .unwrap();
        thread::sleep(std::time::Duration::from_millis(20));
        assert!(!cancel.is_cancelled());
        handle.delete().unwrap();
    }
}
