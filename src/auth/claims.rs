use serde::{Deserialize, Serialize};

use crate::auth::auth::AuthUser;
use crate::model::role::Role;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    /// role name as issued upstream ("hr", "Manager", "admin", ...)
    pub role: String,
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

impl Claims {
    /// Turns verified claims into the caller identity handlers see.
    pub fn into_auth_user(self) -> Result<AuthUser, &'static str> {
        if self.token_type != TokenType::Access {
            return Err("Refresh tokens cannot be used for API calls");
        }
        let role = Role::normalize(&self.role).ok_or("Invalid role")?;

        Ok(AuthUser {
            user_id: self.user_id,
            username: self.sub,
            role,
            employee_id: self.employee_id,
        })
    }
}
