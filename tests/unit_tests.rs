//! End-to-end scenarios for the hosted OSAL backend. Primitive-level
//! contracts (FIFO ordering, idempotent binary-semaphore give, bounded
//! counting semaphore, timer state machine, ...) already have focused
//! unit tests next to each implementation; this file exercises
//! cross-thread scenarios with concrete inputs and tolerances.

use osal::posix::{bin_sem, count_sem, queue, task, timer};
use osal::status::{OsalResult, Status};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::thread;
use std::time::{Duration, Instant};

fn assert_elapsed_within(elapsed_ms: i64, expected_ms: i64, tolerance_ms: i64) {
    assert!(
        (elapsed_ms - expected_ms).abs() <= tolerance_ms,
        "elapsed {elapsed_ms}ms not within {tolerance_ms}ms of {expected_ms}ms"
    );
}

/// 1. Queue(cap=3, item_size=4): send {1,2,3,4,5}; the queue fills after
/// three sends, a try-once send observes exactly one `QueueFull`, and a
/// retry with a timeout succeeds once a receiver drains the first item.
/// All five items arrive in sent order; the queue ends empty.
#[test]
fn scenario_1_queue_fifo_with_one_overflow() {
    let q = queue::create("e2e-q", 3, 4).unwrap();
    for i in 1u32..=3 {
        q.send(&i.to_le_bytes(), 0).unwrap();
    }
    assert_eq!(q.send(&4u32.to_le_bytes(), 0), Err(Status::QueueFull));

    let q = Arc::new(q);
    let reader = q.clone();
    let receiver = thread::spawn(move || {
        let mut out = [0u8; 4];
        let mut received = Vec::new();
        for _ in 0..5 {
            reader.receive(&mut out, 1000).unwrap();
            received.push(u32::from_le_bytes(out));
        }
        received
    });

    q.send(&4u32.to_le_bytes(), 500).unwrap();
    q.send(&5u32.to_le_bytes(), 500).unwrap();

    let received = receiver.join().unwrap();
    assert_eq!(received, vec![1, 2, 3, 4, 5]);
    assert_eq!(q.get_count().unwrap(), 0);
}

/// 2. Binary semaphore created `Empty`; task A waits with a 1000 ms
/// timeout, task B sleeps 100 ms then gives. A observes success with a
/// measured wait of roughly 100 ms.
#[test]
fn scenario_2_binary_semaphore_signal_wakes_waiter() {
    let sem = Arc::new(bin_sem::create("e2e-bsem", false).unwrap());
    let wait_result: Arc<StdMutex<Option<(OsalResult<()>, i64)>>> = Arc::new(StdMutex::new(None));

    let sem_a = sem.clone();
    let result_a = wait_result.clone();
    let (task_a, _cancel_a) = task::create("A", 64 * 1024, &task::TaskAttr::default(), move |_| {
        let start = Instant::now();
        let result = sem_a.take(1000);
        *result_a.lock().unwrap() = Some((result, start.elapsed().as_millis() as i64));
    })
    .unwrap();

    let sem_b = sem.clone();
    let (task_b, _cancel_b) = task::create("B", 64 * 1024, &task::TaskAttr::default(), move |_| {
        thread::sleep(Duration::from_millis(100));
        sem_b.give().unwrap();
    })
    .unwrap();

    task_a.delete().unwrap();
    task_b.delete().unwrap();

    let (result, elapsed) = wait_result.lock().unwrap().take().unwrap();
    assert_eq!(result, Ok(()));
    assert_elapsed_within(elapsed, 100, 50);
}

/// 3. Counting semaphore created (initial=0, max=3); a producer gives
/// three times 50 ms apart, a consumer takes three times with a 1000 ms
/// timeout each. All succeed and the semaphore ends at count 0.
#[test]
fn scenario_3_counting_semaphore_producer_consumer() {
    let sem = Arc::new(count_sem::create("e2e-csem", 0, 3).unwrap());

    let producer_sem = sem.clone();
    let producer = thread::spawn(move || {
        for _ in 0..3 {
            thread::sleep(Duration::from_millis(50));
            producer_sem.give().unwrap();
        }
    });

    for _ in 0..3 {
        sem.take(1000).unwrap();
    }
    producer.join().unwrap();
    assert_eq!(sem.count(), 0);
}

/// 4. A one-shot timer (period 200 ms) with a user context set fires
/// exactly once within 200 ± 60 ms; the callback observes the context and
/// `is_active` is false afterward.
#[test]
fn scenario_4_one_shot_timer_fires_once_with_context() {
    struct Ctx {
        fired: bool,
    }
    let mut ctx = Ctx { fired: false };
    let start = Instant::now();
    let fired_at = Arc::new(StdMutex::new(None::<Instant>));
    let fired_at2 = fired_at.clone();

    let timer = timer::create(
        "e2e-oneshot",
        200,
        false,
        Box::new(move |t| {
            let ctx_ptr = t.get_context().unwrap() as *mut Ctx;
            unsafe { (*ctx_ptr).fired = true };
            *fired_at2.lock().unwrap() = Some(Instant::now());
        }),
        None,
    )
    .unwrap();
    timer.set_context(&mut ctx as *mut Ctx as *mut ()).unwrap();
    timer.start(0).unwrap();

    thread::sleep(Duration::from_millis(400));

    assert!(ctx.fired);
    let elapsed = fired_at.lock().unwrap().unwrap().duration_since(start).as_millis() as i64;
    assert_elapsed_within(elapsed, 200, 60);
    assert!(!timer.is_active().unwrap());
    timer.delete(0).unwrap();
}

/// 5. An auto-reload timer (period 100 ms) fires with ~100 ms gaps; after
/// `change_period(200)` the next gap is ~200 ms; after `reset` the next
/// expiry lands ~200 ms after the reset call.
#[test]
fn scenario_5_auto_reload_change_period_and_reset() {
    let timestamps = Arc::new(StdMutex::new(Vec::<Instant>::new()));
    let timestamps2 = timestamps.clone();
    let timer = timer::create(
        "e2e-reload",
        100,
        true,
        Box::new(move |_t| {
            timestamps2.lock().unwrap().push(Instant::now());
        }),
        None,
    )
    .unwrap();
    timer.start(0).unwrap();
    thread::sleep(Duration::from_millis(320));

    {
        let ts = timestamps.lock().unwrap();
        assert!(ts.len() >= 2, "only {} fires before change_period", ts.len());
        for pair in ts.windows(2) {
            let gap = pair[1].duration_since(pair[0]).as_millis() as i64;
            assert_elapsed_within(gap, 100, 60);
        }
    }

    timer.change_period(200, 0).unwrap();
    timestamps.lock().unwrap().clear();
    thread::sleep(Duration::from_millis(450));
    {
        let ts = timestamps.lock().unwrap();
        assert!(!ts.is_empty(), "no fires after change_period");
        for pair in ts.windows(2) {
            let gap = pair[1].duration_since(pair[0]).as_millis() as i64;
            assert_elapsed_within(gap, 200, 60);
        }
    }

    timestamps.lock().unwrap().clear();
    let reset_at = Instant::now();
    timer.reset(0).unwrap();
    thread::sleep(Duration::from_millis(260));
    timer.stop(0).unwrap();
    let ts = timestamps.lock().unwrap();
    assert!(!ts.is_empty(), "no expiry observed after reset");
    let first_gap = ts[0].duration_since(reset_at).as_millis() as i64;
    assert_elapsed_within(first_gap, 200, 60);
    drop(ts);
    timer.delete(0).unwrap();
}

/// 6. Two tasks each increment a shared counter 100 times under the same
/// mutex; after both are joined the counter reads exactly 200.
#[test]
fn scenario_6_mutex_mutual_exclusion_across_two_tasks() {
    use osal::posix::mutex;

    let mtx = Arc::new(mutex::create("e2e-mutex").unwrap());
    let shared = Arc::new(AtomicU32::new(0));

    let mut handles = Vec::new();
    for _ in 0..2 {
        let mtx = mtx.clone();
        let shared = shared.clone();
        let (h, _cancel) = task::create("counter", 64 * 1024, &task::TaskAttr::default(), move |_| {
            for _ in 0..100 {
                mtx.take().unwrap();
                shared.fetch_add(1, Ordering::SeqCst);
                mtx.give().unwrap();
            }
        })
        .unwrap();
        handles.push(h);
    }
    for h in handles {
        h.delete().unwrap();
    }
    assert_eq!(shared.load(Ordering::SeqCst), 200);
}

/// Every `*_from_isr` operation is `Status::NotImplemented` on the hosted
/// backend, across every primitive that defines one.
#[test]
fn isr_variants_are_unsupported_on_hosted_backend() {
    let q = queue::create("isr-q", 2, 4).unwrap();
    assert_eq!(q.send_from_isr(&[0u8; 4]), Err(Status::NotImplemented));
    assert_eq!(q.receive_from_isr(&mut [0u8; 4]), Err(Status::NotImplemented));

    let bs = bin_sem::create("isr-bs", false).unwrap();
    assert_eq!(bs.give_from_isr(), Err(Status::NotImplemented));
    assert_eq!(bs.take_from_isr(), Err(Status::NotImplemented));

    let cs = count_sem::create("isr-cs", 0, 1).unwrap();
    assert_eq!(cs.give_from_isr(), Err(Status::NotImplemented));
    assert_eq!(cs.take_from_isr(), Err(Status::NotImplemented));

    let timer = timer::create("isr-t", 100, false, Box::new(|_t| {}), None).unwrap();
    assert_eq!(timer.start_from_isr(), Err(Status::NotImplemented));
    assert_eq!(timer.stop_from_isr(), Err(Status::NotImplemented));
    assert_eq!(timer.reset_from_isr(), Err(Status::NotImplemented));
    timer.delete(0).unwrap();
}

/// Status name round-trip: every variant's name is stable, non-empty, and
/// distinct.
#[test]
fn status_names_are_stable_and_non_empty() {
    const ALL: &[Status] = &[
        Status::Success,
        Status::Error,
        Status::InvalidPointer,
        Status::AddressMisaligned,
        Status::Timeout,
        Status::InvalidIntNum,
        Status::SemFailure,
        Status::SemTimeout,
        Status::QueueEmpty,
        Status::QueueFull,
        Status::QueueTimeout,
        Status::QueueInvalidSize,
        Status::QueueIdError,
        Status::NameTooLong,
        Status::NoFreeIds,
        Status::NameTaken,
        Status::InvalidId,
        Status::NameNotFound,
        Status::SemNotFull,
        Status::InvalidPriority,
        Status::InvalidSemValue,
        Status::FileErr,
        Status::NotImplemented,
        Status::TimerInvalidArgs,
        Status::TimerIdErr,
        Status::TimerUnavailable,
        Status::TimerInternal,
        Status::ObjectInUse,
        Status::BadAddress,
        Status::IncorrectObjState,
        Status::IncorrectObjType,
        Status::StreamDisconnected,
        Status::OperationNotSupported,
        Status::InvalidSize,
        Status::OutputTooLarge,
        Status::InvalidArgument,
        Status::TryAgain,
        Status::EmptySet,
        Status::ReservedError,
    ];
    let mut seen = std::collections::HashSet::new();
    for status in ALL {
        let name = status.name();
        assert!(!name.is_empty());
        assert!(seen.insert(name), "duplicate status name {name}");
    }
}

/// Time monotonicity: a 60 ms sleep is observed within tolerance via the
/// task subsystem's clock query.
#[test]
fn task_current_time_ms_is_monotonic_and_accurate() {
    let start = task::current_time_ms();
    thread::sleep(Duration::from_millis(60));
    let elapsed = osal::time::elapsed_ms(start, task::current_time_ms());
    assert!(elapsed >= 50, "elapsed {elapsed} too small");
    assert!(elapsed < 500, "elapsed {elapsed} too large");
}

/// Task creation: N tasks each set a unique flag via their delivered
/// argument, and `delete` of each completed task succeeds.
#[test]
fn many_tasks_each_set_a_unique_flag_via_argument() {
    const N: usize = 8;
    let flags: Arc<Vec<AtomicBool>> = Arc::new((0..N).map(|_| AtomicBool::new(false)).collect());
    let mut handles = Vec::new();
    for i in 0..N {
        let flags = flags.clone();
        let (h, _cancel) =
            task::create(&format!("flag{i}"), 64 * 1024, &task::TaskAttr::default(), move |_| {
                flags[i].store(true, Ordering::SeqCst);
            })
            .unwrap();
        handles.push(h);
    }
    for h in handles {
        h.delete().unwrap();
    }
    assert!(flags.iter().all(|f| f.load(Ordering::SeqCst)));
}
