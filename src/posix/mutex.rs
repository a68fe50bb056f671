//! Hosted mutex: owner-checked exclusion over `std::sync::{Mutex, Condvar}`.
//!
//! Grounded on `examples/original_source/src/osal/posix/osal_mutex_impl.c`
//! for the create/lock/unlock contract, and on the donor kernel's
//! `sync/mutex.rs` for the "safe wrapper around a raw inner type" shape —
//! though the inner type here is `std::sync::Mutex`, not a hand-rolled
//! pend list, and this backend does not perform priority inheritance:
//! `std::sync::Mutex` offers none, and the contract only promises
//! whatever fairness the host mutex provides.
//!
//! A plain `std::sync::Mutex<()>` cannot express this API because `take`
//! and `give` must be independent calls rather than a single RAII scope,
//! and the contract requires detecting a `give` from a non-owner. So the
//! state lives in `Mutex<State>` plus a `Condvar`, with the owning
//! `ThreadId` tracked alongside the `held` flag.

use crate::assert::check_name;
use crate::status::{OsalResult, Status};
use std::sync::{Condvar, Mutex as StdMutex};
use std::thread::ThreadId;

struct State {
    held: bool,
    owner: Option<ThreadId>,
}

pub struct Mutex {
    state: StdMutex<State>,
    available: Condvar,
}

pub fn create(name: &str) -> OsalResult<Mutex> {
    check_name(name)?;
    Ok(Mutex { state: StdMutex::new(State { held: false, owner: None }), available: Condvar::new() })
}

impl Mutex {
    /// Blocks until the mutex is free, then takes ownership.
    pub fn take(&self) -> OsalResult<()> {
        let mut guard = self.state.lock().map_err(|_| Status::Error)?;
        while guard.held {
            guard = self.available.wait(guard).map_err(|_| Status::Error)?;
        }
        guard.held = true;
        guard.owner = Some(std::thread::current().id());
        Ok(())
    }

    /// Releases the mutex. Returns `Status::IncorrectObjState` if the
    /// calling thread is not the current owner, or if the mutex is not
    /// held at all — a misuse the C reference cannot detect at all, since
    /// unlocking a `pthread_mutex_t` from a non-owner is undefined
    /// behavior there.
    pub fn give(&self) -> OsalResult<()> {
        let mut guard = self.state.lock().map_err(|_| Status::Error)?;
        if !guard.held || guard.owner != Some(std::thread::current().id()) {
            return Err(Status::IncorrectObjState);
        }
        guard.held = false;
        guard.owner = None;
        drop(guard);
        self.available.notify_one();
        Ok(())
    }

    pub fn is_held(&self) -> bool {
        self.state.lock().map(|g| g.held).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn mutual_exclusion_across_two_tasks() {
        let mutex = Arc::new(create("m").unwrap());
        let shared = Arc::new(StdMutex::new(0u32));

        let mut handles = Vec::new();
        for _ in 0..2 {
            let mutex = mutex.clone();
            let shared = shared.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    mutex.take().unwrap();
                    *shared.lock().unwrap() += 1;
                    mutex.give().unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*shared.lock().unwrap(), 200);
    }

    #[test]
    fn give_from_non_owner_is_rejected() {
        let mutex = Arc::new(create("m").unwrap());
        mutex.take().unwrap();
        let mutex2 = mutex.clone();
        let result = thread::spawn(move || mutex2.give()).join().unwrap();
        assert_eq!(result, Err(Status::IncorrectObjState));
        mutex.give().unwrap();
    }

    #[test]
    fn give_without_take_is_rejected() {
        let mutex = create("m").unwrap();
        assert_eq!(mutex.give(), Err(Status::IncorrectObjState));
    }
}
