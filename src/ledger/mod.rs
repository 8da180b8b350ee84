//! Leave request state machine.
//!
//! ```text
//! apply ──► pending ──approve──► approved
//!              │
//!              ├──reject────► rejected   (pool credited)
//!              └──withdraw──► withdrawn  (pool credited, owner only)
//! ```
//!
//! The pool is debited when a request is created, so a pending request is a
//! binding hold. Every write happens inside one unit of work of the injected
//! [`LeaveStore`].

pub mod calendar;
pub mod policy;

use std::future::Future;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use tracing::{info, instrument, warn};

use crate::error::LedgerError;
use crate::model::allocation::{AllocationKey, AllocationPolicy, Balance};
use crate::model::leave_request::{LeavePage, LeaveQuery, LeaveRequest, LeaveStatus, NewLeaveRequest};
use crate::model::leave_type::LeaveType;
use crate::model::role::Role;
use crate::store::{LeaveStore, LeaveTransaction};

use calendar::business_days_between;
use policy::{AccessPolicy, AllowReviewers, Decision};

/// Source of "today" for past-date validation.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Input of [`LeaveLedger::apply`].
#[derive(Debug, Clone)]
pub struct ApplyLeave {
    pub employee_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leave_type: LeaveType,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Review {
    Approve,
    Reject,
}

#[derive(Clone)]
pub struct LeaveLedger {
    store: Arc<dyn LeaveStore>,
    access: Arc<dyn AccessPolicy>,
    clock: Arc<dyn Clock>,
    allocations: AllocationPolicy,
    max_attempts: u32,
}

impl LeaveLedger {
    pub fn new(store: Arc<dyn LeaveStore>, allocations: AllocationPolicy) -> Self {
        Self {
            store,
            access: Arc::new(AllowReviewers),
            clock: Arc::new(SystemClock),
            allocations,
            max_attempts: 3,
        }
    }

    pub fn with_access_policy(mut self, access: Arc<dyn AccessPolicy>) -> Self {
        self.access = access;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Files a pending request and debits its business days from the pool.
    #[instrument(skip(self, cmd), fields(employee_id = cmd.employee_id, leave_type = %cmd.leave_type))]
    pub async fn apply(&self, cmd: ApplyLeave) -> Result<LeaveRequest, LedgerError> {
        let today = self.clock.today();
        if cmd.start_date < today || cmd.end_date < today {
            return Err(LedgerError::PastDate);
        }
        if cmd.end_date < cmd.start_date {
            return Err(LedgerError::InvertedRange);
        }

        let days = business_days_between(cmd.start_date, cmd.end_date);
        if days == 0 {
            return Err(LedgerError::NoWorkingDays);
        }

        let request = self.with_retry("apply", || self.try_apply(&cmd, days)).await?;
        info!(leave_id = request.id, days, "Leave request submitted");
        Ok(request)
    }

    async fn try_apply(&self, cmd: &ApplyLeave, days: u32) -> Result<LeaveRequest, LedgerError> {
        let key = AllocationKey::new(cmd.employee_id, cmd.start_date.year(), cmd.leave_type.clone());
        let mut tx = self.store.begin().await?;

        let allocation = tx.get_or_create(&key).await?;
        if allocation.remaining() < days {
            return Err(LedgerError::InsufficientBalance {
                remaining: allocation.remaining(),
                requested: days,
                leave_type: cmd.leave_type.clone(),
            });
        }

        tx.adjust(&key, i64::from(days)).await?;
        let request = tx
            .insert_request(NewLeaveRequest {
                employee_id: cmd.employee_id,
                start_date: cmd.start_date,
                end_date: cmd.end_date,
                leave_type: cmd.leave_type.clone(),
                reason: cmd.reason.clone(),
            })
            .await?;

        tx.commit().await?;
        Ok(request)
    }

    /// Approves a pending request. The debit taken at apply time stands.
    #[instrument(skip(self))]
    pub async fn approve(&self, request_id: u64, approver_id: u64, approver_role: Role) -> Result<LeaveRequest, LedgerError> {
        let request = self
            .with_retry("approve", || self.try_review(request_id, approver_id, approver_role, Review::Approve))
            .await?;
        info!(leave_id = request_id, approver_id, "Leave approved");
        Ok(request)
    }

    /// Rejects a pending request and credits its days back to the pool.
    #[instrument(skip(self))]
    pub async fn reject(&self, request_id: u64, approver_id: u64, approver_role: Role) -> Result<LeaveRequest, LedgerError> {
        let request = self
            .with_retry("reject", || self.try_review(request_id, approver_id, approver_role, Review::Reject))
            .await?;
        info!(leave_id = request_id, approver_id, "Leave rejected");
        Ok(request)
    }

    async fn try_review(
        &self,
        request_id: u64,
        approver_id: u64,
        approver_role: Role,
        review: Review,
    ) -> Result<LeaveRequest, LedgerError> {
        if !approver_role.can_review_leave() {
            return Err(LedgerError::forbidden("only managers or HR can approve or reject leave"));
        }

        let mut tx = self.store.begin().await?;
        let mut request = match tx.lock_request(request_id).await? {
            Some(request) if !request.status.is_terminal() => request,
            _ => return Err(LedgerError::NotFoundOrNotPending(request_id)),
        };

        if approver_role == Role::Manager && request.employee_id == approver_id {
            return Err(LedgerError::SelfApprovalForbidden);
        }
        if let Decision::Deny(reason) = self.access.can_act_on_leave(approver_role, approver_id, request.employee_id) {
            return Err(LedgerError::Forbidden(reason));
        }

        let status = match review {
            Review::Approve => LeaveStatus::Approved,
            Review::Reject => {
                restore_pool(tx.as_mut(), &request).await?;
                LeaveStatus::Rejected
            }
        };

        tx.write_status(request_id, status, Some(approver_id)).await?;
        tx.commit().await?;

        request.status = status;
        request.approved_by = Some(approver_id);
        Ok(request)
    }

    /// Lets the owner take back a pending request; its days return to the pool.
    #[instrument(skip(self))]
    pub async fn withdraw(&self, request_id: u64, employee_id: u64) -> Result<LeaveRequest, LedgerError> {
        let request = self
            .with_retry("withdraw", || self.try_withdraw(request_id, employee_id))
            .await?;
        info!(leave_id = request_id, "Leave withdrawn");
        Ok(request)
    }

    async fn try_withdraw(&self, request_id: u64, employee_id: u64) -> Result<LeaveRequest, LedgerError> {
        let mut tx = self.store.begin().await?;
        let mut request = tx
            .lock_request(request_id)
            .await?
            .ok_or(LedgerError::NotFound(request_id))?;

        if request.employee_id != employee_id {
            return Err(LedgerError::forbidden("only the owner can withdraw a leave request"));
        }
        if request.status.is_terminal() {
            return Err(LedgerError::OnlyPendingWithdrawable);
        }

        restore_pool(tx.as_mut(), &request).await?;
        tx.write_status(request_id, LeaveStatus::Withdrawn, None).await?;
        tx.commit().await?;

        request.status = LeaveStatus::Withdrawn;
        request.approved_by = None;
        Ok(request)
    }

    /// Balance per known leave type (plus any other type already booked) for `year`.
    ///
    /// Types without a stored allocation report the policy defaults; nothing is created.
    pub async fn balance(&self, employee_id: u64, year: i32) -> Result<Vec<Balance>, LedgerError> {
        let stored = self.store.find_allocations(employee_id, year).await?;

        let mut balances: Vec<Balance> = LeaveType::KNOWN
            .iter()
            .map(|leave_type| match stored.iter().find(|a| &a.key.leave_type == leave_type) {
                Some(allocation) => Balance::from(allocation),
                None => {
                    let total = self.allocations.default_for(leave_type);
                    Balance {
                        leave_type: leave_type.clone(),
                        total,
                        used: 0,
                        remaining: total,
                    }
                }
            })
            .collect();

        let mut extra: Vec<Balance> = stored
            .iter()
            .filter(|a| !LeaveType::KNOWN.contains(&a.key.leave_type))
            .map(Balance::from)
            .collect();
        extra.sort_by(|a, b| a.leave_type.as_str().cmp(b.leave_type.as_str()));
        balances.extend(extra);

        Ok(balances)
    }

    pub async fn get(&self, request_id: u64) -> Result<LeaveRequest, LedgerError> {
        self.store
            .find_request(request_id)
            .await?
            .ok_or(LedgerError::NotFound(request_id))
    }

    /// Every request of one employee, newest first.
    pub async fn my_requests(&self, employee_id: u64) -> Result<Vec<LeaveRequest>, LedgerError> {
        let mut data = Vec::new();
        let mut page = 1;
        loop {
            let query = LeaveQuery::new(Some(employee_id), None, Some(page), Some(LeaveQuery::MAX_PER_PAGE));
            let batch = self.store.list_requests(&query).await?;
            let fetched = batch.data.len() as u64;
            data.extend(batch.data);
            if fetched < query.per_page || data.len() as u64 >= batch.total {
                return Ok(data);
            }
            page += 1;
        }
    }

    /// Single request as seen by `viewer_id`: owners always, reviewers as the access policy allows.
    pub async fn view(&self, request_id: u64, viewer_id: u64, viewer_role: Role) -> Result<LeaveRequest, LedgerError> {
        let request = self.get(request_id).await?;
        if request.employee_id == viewer_id {
            return Ok(request);
        }
        if !viewer_role.can_review_leave() {
            return Err(LedgerError::forbidden("only managers or HR can view other employees' leave"));
        }
        match self.access.can_act_on_leave(viewer_role, viewer_id, request.employee_id) {
            Decision::Allow => Ok(request),
            Decision::Deny(reason) => Err(LedgerError::Forbidden(reason)),
        }
    }

    pub async fn list(&self, query: &LeaveQuery) -> Result<LeavePage, LedgerError> {
        Ok(self.store.list_requests(query).await?)
    }

    /// [`list`](Self::list) limited to the employees the access policy shows this reviewer.
    pub async fn list_visible(&self, query: LeaveQuery, viewer_id: u64, viewer_role: Role) -> Result<LeavePage, LedgerError> {
        if !viewer_role.can_review_leave() {
            return Err(LedgerError::forbidden("only managers or HR can list leave"));
        }
        let scope = self.access.visible_employees(viewer_role, viewer_id);
        self.list(&query.within(scope)).await
    }

    async fn with_retry<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let mut tries = 1;
        loop {
            match attempt().await {
                Err(e) if e.is_conflict() && tries < self.max_attempts => {
                    warn!(operation, attempt = tries, error = %e, "Unit of work conflicted, retrying");
                    tries += 1;
                }
                result => return result,
            }
        }
    }
}

/// Credits a request's business days back to its pool (reject and withdraw).
async fn restore_pool(tx: &mut dyn LeaveTransaction, request: &LeaveRequest) -> Result<(), LedgerError> {
    let days = business_days_between(request.start_date, request.end_date);
    let key = AllocationKey::new(request.employee_id, request.start_date.year(), request.leave_type.clone());
    tx.adjust(&key, -i64::from(days)).await?;
    Ok(())
}
