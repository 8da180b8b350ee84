use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;

use crate::error::LedgerError;

impl ResponseError for LedgerError {
    fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::PastDate
            | LedgerError::InvertedRange
            | LedgerError::NoWorkingDays
            | LedgerError::InsufficientBalance { .. }
            | LedgerError::OnlyPendingWithdrawable
            | LedgerError::NotFoundOrNotPending(_) => StatusCode::BAD_REQUEST,
            LedgerError::SelfApprovalForbidden | LedgerError::Forbidden(_) => StatusCode::FORBIDDEN,
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            LedgerError::InsufficientBalance {
                remaining,
                requested,
                leave_type,
            } => json!({
                "error": self.to_string(),
                "remaining": remaining,
                "requested": requested,
                "leave_type": leave_type,
            }),
            LedgerError::Store(e) => {
                tracing::error!(error = %e, "Leave ledger storage failure");
                json!({ "error": "Internal Server Error" })
            }
            _ => json!({ "error": self.to_string() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::model::leave_type::LeaveType;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(LedgerError::PastDate.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(LedgerError::SelfApprovalForbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(LedgerError::NotFound(3).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            LedgerError::Store(StoreError::Conflict("deadlock".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            LedgerError::InsufficientBalance {
                remaining: 0,
                requested: 1,
                leave_type: LeaveType::Casual
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
