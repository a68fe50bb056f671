//! Hosted binary semaphore: an `Empty`/`Full` state machine over
//! `std::sync::{Mutex, Condvar}`.
//!
//! The original source has no dedicated POSIX binary-semaphore
//! implementation — `osal_impl_sem.h` aliases `osal_bin_sem_id_t` to the
//! same `sem_t*` as the counting semaphore — while the ESP/FreeRTOS
//! backend (`osal_bin_sem_impl.c`) uses `xSemaphoreCreateBinary`, whose
//! `give` is naturally idempotent. A raw POSIX `sem_t` is not: giving it
//! twice leaves a count of 2, violating the idempotent-give contract this
//! crate's binary semaphore must uphold. So the hosted backend gets its
//! own small state machine rather than wrapping a raw counting
//! semaphore — a gap in the original source resolved here (see
//! `DESIGN.md`).

use crate::assert::check_name;
use crate::status::{OsalResult, Status};
use crate::time::{deadline, WaitMode};
use std::sync::{Condvar, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Empty,
    Full,
}

pub struct BinSem {
    state: Mutex<State>,
    cond: Condvar,
}

pub fn create(name: &str, initially_full: bool) -> OsalResult<BinSem> {
    check_name(name)?;
    let state = if initially_full { State::Full } else { State::Empty };
    Ok(BinSem { state: Mutex::new(state), cond: Condvar::new() })
}

impl BinSem {
    /// Sets the semaphore to `Full`. A no-op, not an error, if it is
    /// already `Full`.
    pub fn give(&self) -> OsalResult<()> {
        let mut guard = self.state.lock().map_err(|_| Status::SemFailure)?;
        *guard = State::Full;
        drop(guard);
        self.cond.notify_one();
        Ok(())
    }

    /// Blocks, per `timeout_ms`, until the semaphore is `Full`, then
    /// consumes it back to `Empty`.
    pub fn take(&self, timeout_ms: u32) -> OsalResult<()> {
        let mut guard = self.state.lock().map_err(|_| Status::SemFailure)?;
        match WaitMode::from_timeout(timeout_ms) {
            WaitMode::Poll => {
                if *guard != State::Full {
                    return Err(Status::SemTimeout);
                }
            }
            WaitMode::Forever => {
                while *guard != State::Full {
                    guard = self.cond.wait(guard).map_err(|_| Status::SemFailure)?;
                }
            }
            WaitMode::Bounded(ms) => {
                let until = deadline(ms);
                while *guard != State::Full {
                    let now = std::time::Instant::now();
                    if now >= until {
                        return Err(Status::SemTimeout);
                    }
                    let (next, result) =
                        self.cond.wait_timeout(guard, until - now).map_err(|_| Status::SemFailure)?;
                    guard = next;
                    if result.timed_out() && *guard != State::Full {
                        return Err(Status::SemTimeout);
                    }
                }
            }
        }
        *guard = State::Empty;
        Ok(())
    }

    /// ISR-suffixed give; unsupported on the hosted backend.
    pub fn give_from_isr(&self) -> OsalResult<()> {
        Err(Status::NotImplemented)
    }

    /// ISR-suffixed take; unsupported on the hosted backend. Matches the
    /// donor's documented quirk of returning `SemTimeout` (not
    /// `SemFailure`) when unavailable — preserved for naming parity even
    /// though this path always returns `NotImplemented` here.
    pub fn take_from_isr(&self) -> OsalResult<()> {
        Err(Status::NotImplemented)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn give_is_idempotent() {
        let sem = create("b", false).unwrap();
        sem.give().unwrap();
        sem.give().unwrap();
        sem.take(0).unwrap();
        assert_eq!(sem.take(0), Err(Status::SemTimeout));
    }

    #[test]
    fn poll_on_empty_times_out_immediately() {
        let sem = create("b", false).unwrap();
        assert_eq!(sem.take(0), Err(Status::SemTimeout));
    }

    #[test]
    fn signal_unblocks_a_waiter_within_window() {
        let sem = Arc::new(create("b", false).unwrap());
        let sem2 = sem.clone();
        let signaler = thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(100));
            sem2.give().unwrap();
        });
        let start = Instant::now();
        sem.take(1000).unwrap();
        let elapsed = start.elapsed().as_millis() as i64;
        signaler.join().unwrap();
        assert!((elapsed - 100).abs() <= 60, "elapsed={elapsed}");
    }
}
