//! Hosted counting semaphore: a bounded counter over
//! `std::sync::{Mutex, Condvar}`.
//!
//! Grounded on
//! `examples/original_source/src/osal/posix/osal_count_sem_impl.c`, which
//! wraps a raw POSIX `sem_t*` and implements the three timeout regimes via
//! `sem_trywait` / `sem_wait` / `sem_timedwait`. The hosted backend
//! reimplements the same three regimes with `Condvar::wait_timeout`
//! instead of FFI, per the "idiomatic Rust, not hand-rolled pthread
//! bindings" rule — the observable contract is identical.

use crate::assert::check_name;
use crate::status::{OsalResult, Status};
use crate::time::{deadline, WaitMode};
use std::sync::{Condvar, Mutex};

pub struct CountSem {
    state: Mutex<u32>,
    cond: Condvar,
    max: u32,
}

/// `max == 0` means unbounded (treated as `u32::MAX` internally, matching
/// the donor's "advisory ceiling" since a raw `sem_t` enforces no
/// user-configurable maximum either).
pub fn create(name: &str, initial: u32, max: u32) -> OsalResult<CountSem> {
    check_name(name)?;
    let max = if max == 0 { u32::MAX } else { max };
    if initial > max {
        return Err(Status::InvalidSemValue);
    }
    Ok(CountSem { state: Mutex::new(initial), cond: Condvar::new(), max })
}

impl CountSem {
    /// Increments the count. Returns `Status::SemFailure` if already at a
    /// finite maximum.
    pub fn give(&self) -> OsalResult<()> {
        let mut guard = self.state.lock().map_err(|_| Status::SemFailure)?;
        if *guard >= self.max {
            return Err(Status::SemFailure);
        }
        *guard += 1;
        drop(guard);
        self.cond.notify_one();
        Ok(())
    }

    /// Blocks, per `timeout_ms`, until the count is non-zero, then
    /// decrements it.
    pub fn take(&self, timeout_ms: u32) -> OsalResult<()> {
        let mut guard = self.state.lock().map_err(|_| Status::SemFailure)?;
        match WaitMode::from_timeout(timeout_ms) {
            WaitMode::Poll => {
                if *guard == 0 {
                    return Err(Status::SemTimeout);
                }
            }
            WaitMode::Forever => {
                while *guard == 0 {
                    guard = self.cond.wait(guard).map_err(|_| Status::SemFailure)?;
                }
            }
            WaitMode::Bounded(ms) => {
                let until = deadline(ms);
                while *guard == 0 {
                    let now = std::time::Instant::now();
                    if now >= until {
                        return Err(Status::SemTimeout);
                    }
                    let (next, result) =
                        self.cond.wait_timeout(guard, until - now).map_err(|_| Status::SemFailure)?;
                    guard = next;
                    if result.timed_out() && *guard == 0 {
                        return Err(Status::SemTimeout);
                    }
                }
            }
        }
        *guard -= 1;
        Ok(())
    }

    /// Current count. On a destroyed handle this call is unreachable in
    /// the Rust surface at all: `delete` consumes the handle by value.
    pub fn count(&self) -> u32 {
        self.state.lock().map(|g| *g).unwrap_or(0)
    }

    pub fn give_from_isr(&self) -> OsalResult<()> {
        Err(Status::NotImplemented)
    }

    pub fn take_from_isr(&self) -> OsalResult<()> {
        Err(Status::NotImplemented)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn rejects_initial_above_max() {
        assert_eq!(create("s", 4, 3).err(), Some(Status::InvalidSemValue));
    }

    #[test]
    fn producer_consumer_round_trip() {
        let sem = create("s", 0, 3).unwrap();
        sem.give().unwrap();
        sem.give().unwrap();
        sem.give().unwrap();
        assert_eq!(sem.give(), Err(Status::SemFailure));
        sem.take(0).unwrap();
        sem.take(0).unwrap();
        sem.take(0).unwrap();
        assert_eq!(sem.count(), 0);
        assert_eq!(sem.take(0), Err(Status::SemTimeout));
    }

    #[test]
    fn producer_and_consumer_threads_stay_in_sync() {
        let sem = Arc::new(create("s", 0, 3).unwrap());
        let producer_sem = sem.clone();
        let producer = thread::spawn(move || {
            for _ in 0..3 {
                thread::sleep(std::time::Duration::from_millis(50));
                producer_sem.give().unwrap();
            }
        });
        for _ in 0..3 {
            sem.take(1000).unwrap();
        }
        producer.join().unwrap();
        assert_eq!(sem.count(), 0);
    }

    #[test]
    fn unbounded_when_max_is_zero() {
        let sem = create("s", 0, 0).unwrap();
        for _ in 0..1000 {
            sem.give().unwrap();
        }
    }
}
