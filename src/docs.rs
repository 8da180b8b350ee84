use crate::api::leave_request::{BalanceResponse, CreateLeave, LeaveFilter, LeaveListResponse};
use crate::model::allocation::Balance;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Ledger API",
        version = "1.0.0",
        description = r#"
## Leave Ledger

Tracks leave allocations per employee, leave type and year, and the lifecycle
of leave requests against them.

### 🔹 Lifecycle
- **Apply** debits the business days (Mon–Fri) of the request immediately; the request starts `pending`
- **Approve** keeps the debit
- **Reject** and **Withdraw** give the days back
- Approved, rejected and withdrawn requests are final

### 🔐 Security
All endpoints require a JWT Bearer token carrying `employee_id` and `role`.
Only **Manager** or **HR** may approve or reject, and a manager may never act on their own leave.

### 📦 Response Format
- JSON responses, errors as `{"error": "..."}`
- Pagination supported for the leave list
"#,
    ),
    paths(
        crate::api::leave_request::create_leave,
        crate::api::leave_request::my_balance,
        crate::api::leave_request::my_leaves,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::withdraw_leave,
    ),
    components(
        schemas(
            CreateLeave,
            LeaveFilter,
            LeaveRequest,
            LeaveStatus,
            LeaveListResponse,
            Balance,
            BalanceResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave management APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
