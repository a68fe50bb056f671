//! Hosted message queue: a fixed-capacity ring buffer of fixed-size items
//! behind a mutex and two condition variables.
//!
//! Grounded on
//! `examples/original_source/src/osal/posix/osal_queue_impl.c`: the ring
//! buffer layout, the `not_empty` / `not_full` condition split, and the
//! three-regime timeout handling are ported directly; the C struct's
//! separately-managed buffer pointer and lock become a single
//! `Mutex<Ring>` here, and `delete` is a plain `Drop` rather than the
//! three-step `free`/`pthread_mutex_destroy`/`pthread_cond_destroy` the C
//! code performs by hand.

use crate::assert::{check_name, check_no_overflow, check_slice_len};
use crate::status::{OsalResult, Status};
use crate::time::{deadline, WaitMode};
use std::sync::{Arc, Condvar, Mutex};

struct Ring {
    buffer: Box<[u8]>,
    item_size: usize,
    capacity: usize,
    head: usize,
    tail: usize,
    count: usize,
    closed: bool,
}

impl Ring {
    fn slot(&self, index: usize) -> std::ops::Range<usize> {
        let start = index * self.item_size;
        start..start + self.item_size
    }
}

struct Inner {
    state: Mutex<Ring>,
    not_empty: Condvar,
    not_full: Condvar,
}

/// Handle to a created queue. Cloning the handle is intentionally not
/// exposed on the public surface; the crate hands out a single owning
/// `Queue` per `create` call.
pub struct Queue {
    inner: Arc<Inner>,
}

pub fn create(name: &str, capacity: usize, item_size: usize) -> OsalResult<Queue> {
    check_name(name)?;
    if capacity == 0 {
        return Err(Status::QueueInvalidSize);
    }
    if item_size == 0 {
        return Err(Status::QueueInvalidSize);
    }
    let total = check_no_overflow(capacity, item_size)?;

    let ring = Ring {
        buffer: vec![0u8; total].into_boxed_slice(),
        item_size,
        capacity,
        head: 0,
        tail: 0,
        count: 0,
        closed: false,
    };
    Ok(Queue {
        inner: Arc::new(Inner { state: Mutex::new(ring), not_empty: Condvar::new(), not_full: Condvar::new() }),
    })
}

impl Queue {
    /// Copies `item` (exactly `item_size` bytes) into the queue, blocking
    /// per `timeout_ms` while full.
    pub fn send(&self, item: &[u8], timeout_ms: u32) -> OsalResult<()> {
        let mut guard = self.inner.state.lock().map_err(|_| Status::Error)?;
        check_slice_len(item.len(), guard.item_size)?;

        match WaitMode::from_timeout(timeout_ms) {
            WaitMode::Poll => {
                if guard.count == guard.capacity {
                    return Err(Status::QueueFull);
                }
            }
            WaitMode::Forever => {
                while guard.count == guard.capacity && !guard.closed {
                    guard = self.inner.not_full.wait(guard).map_err(|_| Status::Error)?;
                }
            }
            WaitMode::Bounded(ms) => {
                let until = deadline(ms);
                while guard.count == guard.capacity && !guard.closed {
                    let now = std::time::Instant::now();
                    if now >= until {
                        return Err(Status::QueueTimeout);
                    }
                    let (next, result) = self
                        .inner
                        .not_full
                        .wait_timeout(guard, until - now)
                        .map_err(|_| Status::Error)?;
                    guard = next;
                    if result.timed_out() && guard.count == guard.capacity && !guard.closed {
                        return Err(Status::QueueTimeout);
                    }
                }
            }
        }

        if guard.closed {
            return Err(Status::StreamDisconnected);
        }

        let slot = guard.slot(guard.tail);
        guard.buffer[slot].copy_from_slice(item);
        guard.tail = (guard.tail + 1) % guard.capacity;
        guard.count += 1;
        drop(guard);
        self.inner.not_empty.notify_one();
        Ok(())
    }

    /// Copies the oldest item into `out` (exactly `item_size` bytes),
    /// blocking per `timeout_ms` while empty.
    pub fn receive(&self, out: &mut [u8], timeout_ms: u32) -> OsalResult<()> {
        let mut guard = self.inner.state.lock().map_err(|_| Status::Error)?;
        check_slice_len(out.len(), guard.item_size)?;

        match WaitMode::from_timeout(timeout_ms) {
            WaitMode::Poll => {
                if guard.count == 0 {
                    return Err(Status::QueueEmpty);
                }
            }
            WaitMode::Forever => {
                while guard.count == 0 && !guard.closed {
                    guard = self.inner.not_empty.wait(guard).map_err(|_| Status::Error)?;
                }
            }
            WaitMode::Bounded(ms) => {
                let until = deadline(ms);
                while guard.count == 0 && !guard.closed {
                    let now = std::time::Instant::now();
                    if now >= until {
                        return Err(Status::QueueTimeout);
                    }
                    let (next, result) = self
                        .inner
                        .not_empty
                        .wait_timeout(guard, until - now)
                        .map_err(|_| Status::Error)?;
                    guard = next;
                    if result.timed_out() && guard.count == 0 && !guard.closed {
                        return Err(Status::QueueTimeout);
                    }
                }
            }
        }

        if guard.count == 0 && guard.closed {
            return Err(Status::StreamDisconnected);
        }

        let slot = guard.slot(guard.head);
        out.copy_from_slice(&guard.buffer[slot]);
        guard.head = (guard.head + 1) % guard.capacity;
        guard.count -= 1;
        drop(guard);
        self.inner.not_full.notify_one();
        Ok(())
    }

    pub fn get_count(&self) -> OsalResult<usize> {
        Ok(self.inner.state.lock().map_err(|_| Status::Error)?.count)
    }

    /// ISR-suffixed variants are unsupported on the hosted backend.
    pub fn send_from_isr(&self, _item: &[u8]) -> OsalResult<()> {
        Err(Status::NotImplemented)
    }

    pub fn receive_from_isr(&self, _out: &mut [u8]) -> OsalResult<()> {
        Err(Status::NotImplemented)
    }
}

impl Drop for Queue {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.inner.state.lock() {
            guard.closed = true;
        }
        self.inner.not_empty.notify_all();
        self.inner.not_full.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn fifo_order_is_preserved() {
        let q = create("q", 3, 4).unwrap();
        for i in 0u32..3 {
            q.send(&i.to_le_bytes(), 0).unwrap();
        }
        let mut out = [0u8; 4];
        for i in 0u32..3 {
            q.receive(&mut out, 0).unwrap();
            assert_eq!(u32::from_le_bytes(out), i);
        }
    }

    #[test]
    fn overflow_then_timeout_then_retry_succeeds() {
        let q = Arc::new(create("q", 3, 4).unwrap());
        for i in 0u32..3 {
            q.send(&i.to_le_bytes(), 0).unwrap();
        }
        assert_eq!(q.send(&3u32.to_le_bytes(), 0), Err(Status::QueueFull));

        let q2 = q.clone();
        let receiver = thread::spawn(move || {
            thread::sleep(std::time::Duration::from_millis(50));
            let mut buf = [0u8; 4];
            q2.receive(&mut buf, 0).unwrap();
        });
        q.send(&3u32.to_le_bytes(), 500).unwrap();
        receiver.join().unwrap();

        let mut out = [0u8; 4];
        let mut received = Vec::new();
        while q.get_count().unwrap() > 0 {
            q.receive(&mut out, 0).unwrap();
            received.push(u32::from_le_bytes(out));
        }
        assert_eq!(received, vec![1, 2, 3]);
        assert_eq!(q.get_count().unwrap(), 0);
    }

    #[test]
    fn receive_on_empty_queue_times_out_around_50ms() {
        let q = create("q", 2, 4).unwrap();
        let start = std::time::Instant::now();
        let mut buf = [0u8; 4];
        let result = q.receive(&mut buf, 50);
        let elapsed = start.elapsed().as_millis() as i64;
        assert_eq!(result, Err(Status::QueueTimeout));
        assert!((elapsed - 50).abs() <= 40, "elapsed={elapsed}");
    }

    #[test]
    fn mismatched_item_size_is_rejected() {
        let q = create("q", 2, 4).unwrap();
        assert_eq!(q.send(&[0u8; 3], 0), Err(Status::InvalidSize));
    }

    #[test]
    fn zero_capacity_or_item_size_is_rejected() {
        assert_eq!(create("q", 0, 4).err(), Some(Status::QueueInvalidSize));
        assert_eq!(create("q", 4, 0).err(), Some(Status::QueueInvalidSize));
    }
}
