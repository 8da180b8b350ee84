use crate::auth::auth::AuthUser;
use crate::ledger::{ApplyLeave, LeaveLedger};
use crate::model::allocation::Balance;
use crate::model::leave_request::{LeaveQuery, LeaveRequest, LeaveStatus};
use crate::model::leave_type::LeaveType;
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-09", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    /// sick, casual, vacation (other types get no default allocation)
    #[serde(rename = "type", alias = "leave_type")]
    #[schema(example = "casual")]
    pub leave_type: String,
    #[serde(default)]
    #[schema(example = "family trip")]
    pub reason: String,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: u64,
}

#[derive(Serialize, ToSchema)]
pub struct BalanceResponse {
    pub data: Vec<Balance>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 123)]
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    #[schema(example = "pending")]
    /// Filter by leave status
    pub status: Option<String>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>, // 1-based
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>, // items per page
}

/* =========================
Apply for leave
========================= */
/// Swagger doc for create_leave endpoint
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted, balance debited", body = Object, example = json!({
            "data": {
                "id": 1,
                "employee_id": 1000,
                "start_date": "2026-01-05",
                "end_date": "2026-01-09",
                "leave_type": "casual",
                "reason": "family trip",
                "status": "pending",
                "approved_by": null,
                "created_at": "2026-01-01T00:00:00Z"
            }
        })),
        (status = 400, description = "Invalid dates or insufficient balance", body = Object, example = json!({
            "error": "insufficient balance",
            "remaining": 0,
            "requested": 5,
            "leave_type": "casual"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    ledger: web::Data<LeaveLedger>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;
    let payload = payload.into_inner();

    let request = ledger
        .apply(ApplyLeave {
            employee_id,
            start_date: payload.start_date,
            end_date: payload.end_date,
            leave_type: LeaveType::normalize(&payload.leave_type),
            reason: payload.reason,
        })
        .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({ "data": request })))
}

/// Caller's balance per leave type for the current year
#[utoipa::path(
    get,
    path = "/api/leave/balance",
    responses(
        (status = 200, description = "Balance per leave type", body = BalanceResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_balance(
    auth: AuthUser,
    ledger: web::Data<LeaveLedger>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;
    let year = ledger.today().year();

    let data = ledger.balance(employee_id, year).await?;
    Ok(HttpResponse::Ok().json(BalanceResponse { data }))
}

/// Caller's own leave requests, newest first
#[utoipa::path(
    get,
    path = "/api/leave/my",
    responses(
        (status = 200, description = "Caller's leave requests", body = Object),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn my_leaves(
    auth: AuthUser,
    ledger: web::Data<LeaveLedger>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;
    let data = ledger.my_requests(employee_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "data": data })))
}

/* =========================
Approve leave (Manager/HR)
========================= */
/// Swagger doc for approve_leave endpoint
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved successfully", body = Object, example = json!({
            "message": "approved"
        })),
        (status = 400, description = "Leave request not found or already processed", body = Object, example = json!({
            "error": "leave not found or not pending"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden, including managers acting on their own leave")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    ledger: web::Data<LeaveLedger>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let approver_id = auth.employee_id()?;
    let leave_id = path.into_inner();

    let request = ledger.approve(leave_id, approver_id, auth.role).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "approved",
        "data": request
    })))
}

/* =========================
Reject leave (Manager/HR)
========================= */
/// Swagger doc for reject_leave endpoint
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    responses(
        (status = 200, description = "Leave rejected, balance restored", body = Object, example = json!({
            "message": "rejected"
        })),
        (status = 400, description = "Leave request not found or already processed", body = Object, example = json!({
            "error": "leave not found or not pending"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden, including managers acting on their own leave")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    ledger: web::Data<LeaveLedger>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let approver_id = auth.employee_id()?;
    let leave_id = path.into_inner();

    let request = ledger.reject(leave_id, approver_id, auth.role).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "rejected",
        "data": request
    })))
}

/// Owner withdraws a pending leave request
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/withdraw",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to withdraw")
    ),
    responses(
        (status = 200, description = "Leave withdrawn, balance restored", body = Object, example = json!({
            "message": "withdrawn"
        })),
        (status = 400, description = "Only pending leaves can be withdrawn", body = Object, example = json!({
            "error": "only pending leaves can be withdrawn"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the owner of the request"),
        (status = 404, description = "Leave request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn withdraw_leave(
    auth: AuthUser,
    ledger: web::Data<LeaveLedger>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.employee_id()?;
    let leave_id = path.into_inner();

    let request = ledger.withdraw(leave_id, employee_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "withdrawn",
        "data": request
    })))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "error": "leave not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    ledger: web::Data<LeaveLedger>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let viewer_id = auth.employee_id()?;
    let leave = ledger.view(path.into_inner(), viewer_id, auth.role).await?;

    Ok(HttpResponse::Ok().json(leave))
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    ledger: web::Data<LeaveLedger>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    let viewer_id = auth.employee_id()?;

    let status = match query.status.as_deref() {
        Some(raw) => match raw.parse::<LeaveStatus>() {
            Ok(status) => Some(status),
            Err(_) => {
                return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                    "error": "Invalid status. Allowed: pending, approved, rejected, withdrawn"
                })));
            }
        },
        None => None,
    };

    let page = ledger
        .list_visible(
            LeaveQuery::new(query.employee_id, status, query.page, query.per_page),
            viewer_id,
            auth.role,
        )
        .await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: page.data,
        page: page.page,
        per_page: page.per_page,
        total: page.total,
    }))
}
