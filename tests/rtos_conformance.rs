//! Host-side conformance checks for the RTOS backend's kernel primitives
//! (`backend-rtos`). These exercise the scheduler's internal data
//! structures directly — the priority bitmap, the native error type, and
//! the OSAL `Status` bridge — rather than running the full scheduler,
//! which requires a real PendSV context switch unavailable on a hosted
//! test binary. Full task/mutex/semaphore behavior is the hosted
//! backend's job; see `DESIGN.md` for the scope split.

#![cfg(feature = "backend-rtos")]

use osal::config::CFG_PRIO_MAX;
use osal::error::OsError;
use osal::prio::PrioTable;
use osal::status::Status;

#[test]
fn prio_table_tracks_the_highest_priority() {
    let mut table = PrioTable::new();
    assert!(table.is_empty());
    assert_eq!(table.get_highest(), (CFG_PRIO_MAX - 1) as u8);

    table.insert(20);
    table.insert(5);
    table.insert(10);
    table.insert(0);
    assert_eq!(table.get_highest(), 0);

    table.remove(0);
    assert_eq!(table.get_highest(), 5);
    table.remove(5);
    assert_eq!(table.get_highest(), 10);
    table.remove(10);
    assert_eq!(table.get_highest(), 20);
    table.remove(20);
    assert!(table.is_empty());
}

#[test]
fn prio_table_handles_word_boundaries() {
    let mut table = PrioTable::new();
    table.insert(31);
    assert_eq!(table.get_highest(), 31);
    table.insert(32);
    assert_eq!(table.get_highest(), 31);
    table.remove(31);
    assert_eq!(table.get_highest(), 32);
}

#[test]
fn prio_table_covers_every_configured_priority() {
    let mut table = PrioTable::new();
    for i in 0..CFG_PRIO_MAX {
        table.insert(i as u8);
    }
    for i in 0..CFG_PRIO_MAX {
        assert_eq!(table.get_highest(), i as u8);
        table.remove(i as u8);
    }
    assert!(table.is_empty());
}

#[test]
fn os_error_ok_err_classification() {
    assert!(OsError::None.is_ok());
    assert!(!OsError::None.is_err());
    assert!(!OsError::Timeout.is_ok());
    assert!(OsError::Timeout.is_err());
}

/// The RTOS backend speaks its own native `OsError`; the OSAL `Status`
/// bridge (`From<OsError> for Status`) is what lets conformance tests and
/// higher layers compare its outcomes against the hosted backend's.
#[test]
fn os_error_maps_onto_the_portable_status_taxonomy() {
    assert_eq!(Status::from(OsError::None), Status::Success);
    assert_eq!(Status::from(OsError::Timeout), Status::Timeout);
    assert_eq!(Status::from(OsError::QFull), Status::QueueFull);
    assert_eq!(Status::from(OsError::QEmpty), Status::QueueEmpty);
    assert_eq!(Status::from(OsError::PrioInvalid), Status::InvalidPriority);
    assert_eq!(Status::from(OsError::TaskNoMoreTcb), Status::NoFreeIds);
    assert_eq!(Status::from(OsError::PendIsr), Status::NotImplemented);
    assert_eq!(Status::from(OsError::MutexNotOwner), Status::IncorrectObjState);
}

#[test]
fn kernel_config_is_internally_consistent() {
    use osal::config::{CFG_PRIO_IDLE, CFG_STK_SIZE_MIN, CFG_TICK_RATE_HZ};
    assert!(CFG_PRIO_MAX >= 8);
    assert!(CFG_PRIO_MAX <= 256);
    assert!(CFG_STK_SIZE_MIN >= 32);
    assert!((10..=10_000).contains(&CFG_TICK_RATE_HZ));
    assert_eq!(CFG_PRIO_IDLE, (CFG_PRIO_MAX - 1) as u8);
}
