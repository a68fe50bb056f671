//! Closed status taxonomy shared by every backend.
//!
//! Every fallible OSAL operation returns [`OsalResult<T>`], never a raw
//! backend error code. `Status::Success` is never used to carry a payload;
//! an operation's output, if any, is the `Ok` value itself.

#[cfg(feature = "backend-rtos")]
use crate::rtos::core::error::OsError;

/// The full, closed set of outcomes an OSAL operation can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    Error,
    InvalidPointer,
    AddressMisaligned,
    Timeout,
    InvalidIntNum,
    SemFailure,
    SemTimeout,
    QueueEmpty,
    QueueFull,
    QueueTimeout,
    QueueInvalidSize,
    QueueIdError,
    NameTooLong,
    NoFreeIds,
    NameTaken,
    InvalidId,
    NameNotFound,
    SemNotFull,
    InvalidPriority,
    InvalidSemValue,
    FileErr,
    NotImplemented,
    TimerInvalidArgs,
    TimerIdErr,
    TimerUnavailable,
    TimerInternal,
    ObjectInUse,
    BadAddress,
    IncorrectObjState,
    IncorrectObjType,
    StreamDisconnected,
    OperationNotSupported,
    InvalidSize,
    OutputTooLarge,
    InvalidArgument,
    TryAgain,
    EmptySet,
    ReservedError,
}

/// Result alias used throughout the crate; `Ok` carries the operation's
/// output, `Err` carries the [`Status`] describing why it did not succeed.
pub type OsalResult<T> = Result<T, Status>;

impl Status {
    /// Stable, human readable name for the status. Used by logging and by
    /// the status round-trip test; never changes once assigned.
    pub const fn name(self) -> &'static str {
        match self {
            Status::Success => "OSAL_SUCCESS",
            Status::Error => "OSAL_ERROR",
            Status::InvalidPointer => "OSAL_INVALID_POINTER",
            Status::AddressMisaligned => "OSAL_ADDRESS_MISALIGNED",
            Status::Timeout => "OSAL_TIMEOUT",
            Status::InvalidIntNum => "OSAL_INVALID_INT_NUM",
            Status::SemFailure => "OSAL_SEM_FAILURE",
            Status::SemTimeout => "OSAL_SEM_TIMEOUT",
            Status::QueueEmpty => "OSAL_QUEUE_EMPTY",
            Status::QueueFull => "OSAL_QUEUE_FULL",
            Status::QueueTimeout => "OSAL_QUEUE_TIMEOUT",
            Status::QueueInvalidSize => "OSAL_QUEUE_INVALID_SIZE",
            Status::QueueIdError => "OSAL_QUEUE_ID_ERROR",
            Status::NameTooLong => "OSAL_ERR_NAME_TOO_LONG",
            Status::NoFreeIds => "OSAL_ERR_NO_FREE_IDS",
            Status::NameTaken => "OSAL_ERR_NAME_TAKEN",
            Status::InvalidId => "OSAL_ERR_INVALID_ID",
            Status::NameNotFound => "OSAL_ERR_NAME_NOT_FOUND",
            Status::SemNotFull => "OSAL_SEM_NOT_FULL",
            Status::InvalidPriority => "OSAL_ERR_INVALID_PRIORITY",
            Status::InvalidSemValue => "OSAL_INVALID_SEM_VALUE",
            Status::FileErr => "OSAL_FILE_ERR",
            Status::NotImplemented => "OSAL_ERR_NOT_IMPLEMENTED",
            Status::TimerInvalidArgs => "OSAL_TIMER_ERR_INVALID_ARGS",
            Status::TimerIdErr => "OSAL_TIMER_ERR_ID_ERROR",
            Status::TimerUnavailable => "OSAL_TIMER_ERR_UNAVAILABLE",
            Status::TimerInternal => "OSAL_TIMER_ERR_INTERNAL",
            Status::ObjectInUse => "OSAL_ERR_OBJECT_IN_USE",
            Status::BadAddress => "OSAL_ERR_BAD_ADDRESS",
            Status::IncorrectObjState => "OSAL_ERR_INCORRECT_OBJ_STATE",
            Status::IncorrectObjType => "OSAL_ERR_INCORRECT_OBJ_TYPE",
            Status::StreamDisconnected => "OSAL_ERR_STREAM_DISCONNECTED",
            Status::OperationNotSupported => "OSAL_ERR_OPERATION_NOT_SUPPORTED",
            Status::InvalidSize => "OSAL_INVALID_SIZE",
            Status::OutputTooLarge => "OSAL_ERR_OUTPUT_TOO_LARGE",
            Status::InvalidArgument => "OSAL_ERR_INVALID_ARGUMENT",
            Status::TryAgain => "OSAL_ERR_TRY_AGAIN",
            Status::EmptySet => "OSAL_ERR_EMPTY_SET",
            Status::ReservedError => "OSAL_ERR_RESERVED",
        }
    }

    #[inline]
    pub const fn is_success(self) -> bool {
        matches!(self, Status::Success)
    }

    #[inline]
    pub const fn is_err(self) -> bool {
        !self.is_success()
    }
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(feature = "backend-posix")]
impl std::error::Error for Status {}

/// Maps the RTOS backend's native kernel error onto the portable taxonomy,
/// so the RTOS conformance layer can speak the same vocabulary as the
/// hosted backend without discarding the kernel's own error type.
#[cfg(feature = "backend-rtos")]
impl From<OsError> for Status {
    fn from(err: OsError) -> Status {
        use OsError::*;
        match err {
            None => Status::Success,
            Timeout => Status::Timeout,
            PendWouldBlock => Status::SemTimeout,
            SemOvf => Status::SemFailure,
            MutexNotOwner | MutexOwner | MutexNesting | MutexOvf => Status::IncorrectObjState,
            ObjType => Status::IncorrectObjType,
            ObjDel | ObjPtrNull => Status::InvalidId,
            ObjCreated => Status::NameTaken,
            TaskNoMoreTcb => Status::NoFreeIds,
            PrioInvalid => Status::InvalidPriority,
            StkSizeInvalid | StkInvalid => Status::InvalidSize,
            QFull => Status::QueueFull,
            QEmpty => Status::QueueEmpty,
            TmrInvalidDly | TmrInvalidPeriod => Status::TimerInvalidArgs,
            TmrInvalidState | TmrInactive | TmrStopped => Status::IncorrectObjState,
            TmrIsr | TmrNoCallback => Status::TimerInternal,
            AcceptIsr | CreateIsr | DelIsr | FlushIsr | PendIsr | PendAbortIsr
            | TaskCreateIsr | TaskDelIsr | TaskSuspendIsr | TaskResumeIsr
            | TaskChangePrioIsr | SchedLockIsr | SchedUnlockIsr | TimeDlyIsr | YieldIsr => {
                Status::NotImplemented
            }
            _ => Status::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_stable_and_non_empty() {
        let all = [
            Status::Success,
            Status::Error,
            Status::InvalidPointer,
            Status::Timeout,
            Status::SemTimeout,
            Status::QueueFull,
            Status::TimerInvalidArgs,
            Status::ReservedError,
        ];
        for status in all {
            assert!(!status.name().is_empty());
        }
    }

    #[test]
    fn display_matches_name() {
        assert_eq!(format!("{}", Status::QueueTimeout), Status::QueueTimeout.name());
    }

    #[test]
    fn success_is_the_only_ok_variant() {
        assert!(Status::Success.is_success());
        assert!(!Status::Success.is_err());
        assert!(Status::Error.is_err());
    }
}
