use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::leave_type::LeaveType;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema, strum_macros::Display, strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Withdrawn,
}

impl LeaveStatus {
    /// Approved, rejected and withdrawn requests never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LeaveStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "start_date": "2026-01-05",
    "end_date": "2026-01-09",
    "leave_type": "casual",
    "reason": "family trip",
    "status": "pending",
    "approved_by": null,
    "created_at": "2026-01-01T00:00:00Z"
}))]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(value_type = String)]
    pub leave_type: LeaveType,
    pub reason: String,
    pub status: LeaveStatus,
    /// Manager or HR who approved/rejected the request
    pub approved_by: Option<u64>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

/// Fields of a request before the store assigns an id and timestamp.
#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub employee_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leave_type: LeaveType,
    pub reason: String,
}

impl NewLeaveRequest {
    pub fn into_request(self, id: u64, created_at: DateTime<Utc>) -> LeaveRequest {
        LeaveRequest {
            id,
            employee_id: self.employee_id,
            start_date: self.start_date,
            end_date: self.end_date,
            leave_type: self.leave_type,
            reason: self.reason,
            status: LeaveStatus::Pending,
            approved_by: None,
            created_at,
        }
    }
}

/// Filters for the leave list, mirroring the query string of `GET /leave`.
#[derive(Debug, Clone, Default)]
pub struct LeaveQuery {
    pub employee_id: Option<u64>,
    pub status: Option<LeaveStatus>,
    /// Restricts results to these employees when set (reviewer scoping).
    pub visible_to: Option<Vec<u64>>,
    /// 1-based
    pub page: u64,
    pub per_page: u64,
}

impl LeaveQuery {
    pub const DEFAULT_PER_PAGE: u64 = 10;
    pub const MAX_PER_PAGE: u64 = 100;

    pub fn new(
        employee_id: Option<u64>,
        status: Option<LeaveStatus>,
        page: Option<u64>,
        per_page: Option<u64>,
    ) -> Self {
        Self {
            employee_id,
            status,
            visible_to: None,
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(Self::DEFAULT_PER_PAGE)
                .clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn within(mut self, employees: Option<Vec<u64>>) -> Self {
        self.visible_to = employees;
        self
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.per_page
    }

    pub fn matches(&self, request: &LeaveRequest) -> bool {
        self.employee_id.is_none_or(|id| id == request.employee_id)
            && self.status.is_none_or(|status| status == request.status)
            && self
                .visible_to
                .as_ref()
                .is_none_or(|employees| employees.contains(&request.employee_id))
    }
}

#[derive(Debug, Clone)]
pub struct LeavePage {
    pub data: Vec<LeaveRequest>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
}
