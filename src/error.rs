use thiserror::Error;

use crate::model::leave_type::LeaveType;

/// Failures raised by a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Deadlock or lock wait timeout; the unit of work was rolled back and may be retried.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("leave request {0} was not locked by this unit of work")]
    NotLocked(u64),

    #[error("unit of work already finished")]
    Finished,
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Class of a [`LedgerError`], used to pick a response and decide on retries.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input, never retried.
    Validation,
    /// The request was well-formed but breaks a leave rule.
    BusinessRule,
    /// Nothing was applied; the caller may retry.
    Consistency,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cannot request leave in the past")]
    PastDate,

    #[error("end date cannot be before start date")]
    InvertedRange,

    #[error("no working days in selected range")]
    NoWorkingDays,

    #[error("insufficient balance")]
    InsufficientBalance {
        remaining: u32,
        requested: u32,
        leave_type: LeaveType,
    },

    #[error("managers cannot approve or reject their own leave; HR must handle it")]
    SelfApprovalForbidden,

    #[error("only pending leaves can be withdrawn")]
    OnlyPendingWithdrawable,

    #[error("leave not found or not pending")]
    NotFoundOrNotPending(u64),

    #[error("leave not found")]
    NotFound(u64),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::PastDate | LedgerError::InvertedRange | LedgerError::NoWorkingDays => {
                ErrorKind::Validation
            }
            LedgerError::Store(_) => ErrorKind::Consistency,
            _ => ErrorKind::BusinessRule,
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        LedgerError::Forbidden(message.into())
    }

    pub(crate) fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::Store(e) if e.is_conflict())
    }
}
