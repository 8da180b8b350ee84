//! Storage seams for the leave ledger.
//!
//! A [`LeaveStore`] opens units of work ([`LeaveTransaction`]). Everything
//! written through a unit of work becomes visible together on
//! [`LeaveTransaction::commit`]; dropping it without committing discards the
//! writes and releases its locks.
//!
//! Locks are taken in one order everywhere: the request row first, then the
//! allocation key.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;

use crate::error::{LedgerError, StoreError};
use crate::model::allocation::{Allocation, AllocationKey};
use crate::model::leave_request::{
    LeavePage, LeaveQuery, LeaveRequest, LeaveStatus, NewLeaveRequest,
};

pub use memory::InMemoryLeaveStore;
pub use mysql::MySqlLeaveStore;

#[async_trait]
pub trait AllocationStore: Send {
    /// Returns the allocation for `key`, creating it from the policy defaults
    /// when absent. The key stays locked until the unit of work ends.
    async fn get_or_create(&mut self, key: &AllocationKey) -> Result<Allocation, StoreError>;

    /// Overwrites `used` for an allocation previously returned by
    /// [`AllocationStore::get_or_create`] in this unit of work.
    async fn write_used(&mut self, key: &AllocationKey, used: u32) -> Result<(), StoreError>;

    /// Applies `delta` days to `used`.
    ///
    /// A debit that would exceed `total` fails with
    /// [`LedgerError::InsufficientBalance`]; a credit that would take `used`
    /// below zero is clamped to zero.
    async fn adjust(&mut self, key: &AllocationKey, delta: i64) -> Result<Allocation, LedgerError> {
        let mut allocation = self.get_or_create(key).await?;
        let target = i64::from(allocation.used) + delta;

        if delta > 0 && target > i64::from(allocation.total) {
            return Err(LedgerError::InsufficientBalance {
                remaining: allocation.remaining(),
                requested: u32::try_from(delta).unwrap_or(u32::MAX),
                leave_type: key.leave_type.clone(),
            });
        }

        if target < 0 {
            tracing::warn!(
                employee_id = key.employee_id,
                year = key.year,
                leave_type = %key.leave_type,
                credit = -delta,
                applied = allocation.used,
                "Allocation credit clamped at zero"
            );
        }

        let used = u32::try_from(target.max(0)).unwrap_or(u32::MAX);
        self.write_used(key, used).await?;
        allocation.used = used;
        Ok(allocation)
    }
}

#[async_trait]
pub trait LeaveRequestStore: Send {
    /// Stores a new pending request and returns it with its id.
    async fn insert_request(&mut self, new: NewLeaveRequest) -> Result<LeaveRequest, StoreError>;

    /// Loads a request and holds its row lock until the unit of work ends.
    async fn lock_request(&mut self, id: u64) -> Result<Option<LeaveRequest>, StoreError>;

    /// Rewrites status and approver of a request locked in this unit of work.
    async fn write_status(
        &mut self,
        id: u64,
        status: LeaveStatus,
        approved_by: Option<u64>,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait LeaveTransaction: AllocationStore + LeaveRequestStore {
    async fn commit(&mut self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait LeaveStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LeaveTransaction>, StoreError>;

    /// Stored allocations of one employee for one year. Never creates records.
    async fn find_allocations(&self, employee_id: u64, year: i32) -> Result<Vec<Allocation>, StoreError>;

    async fn find_request(&self, id: u64) -> Result<Option<LeaveRequest>, StoreError>;

    /// Requests matching `query`, newest first.
    async fn list_requests(&self, query: &LeaveQuery) -> Result<LeavePage, StoreError>;
}
