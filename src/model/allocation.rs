use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::leave_type::LeaveType;

/// Identity of an allocation pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AllocationKey {
    pub employee_id: u64,
    pub year: i32,
    pub leave_type: LeaveType,
}

impl AllocationKey {
    pub fn new(employee_id: u64, year: i32, leave_type: LeaveType) -> Self {
        Self {
            employee_id,
            year,
            leave_type,
        }
    }
}

/// Days granted vs. days debited for one employee, year and leave type.
///
/// `used` counts both pending and approved requests, so `used <= total`
/// holds after every committed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub key: AllocationKey,
    pub total: u32,
    pub used: u32,
}

impl Allocation {
    pub fn fresh(key: AllocationKey, total: u32) -> Self {
        Self { key, total, used: 0 }
    }

    pub fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.used)
    }
}

/// Default number of days granted per leave type and year.
#[derive(Debug, Clone)]
pub struct AllocationPolicy {
    defaults: HashMap<LeaveType, u32>,
    unknown: u32,
}

impl AllocationPolicy {
    pub fn new(sick: u32, casual: u32, vacation: u32) -> Self {
        let defaults = HashMap::from([
            (LeaveType::Sick, sick),
            (LeaveType::Casual, casual),
            (LeaveType::Vacation, vacation),
        ]);
        Self { defaults, unknown: 0 }
    }

    pub fn with_default(mut self, leave_type: LeaveType, days: u32) -> Self {
        self.defaults.insert(leave_type, days);
        self
    }

    pub fn default_for(&self, leave_type: &LeaveType) -> u32 {
        self.defaults.get(leave_type).copied().unwrap_or(self.unknown)
    }
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self::new(15, 5, 10)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"type": "casual", "total": 5, "used": 2, "remaining": 3}))]
pub struct Balance {
    #[serde(rename = "type")]
    #[schema(value_type = String)]
    pub leave_type: LeaveType,
    pub total: u32,
    pub used: u32,
    pub remaining: u32,
}

impl From<&Allocation> for Balance {
    fn from(allocation: &Allocation) -> Self {
        Self {
            leave_type: allocation.key.leave_type.clone(),
            total: allocation.total,
            used: allocation.used,
            remaining: allocation.remaining(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_company_policy() {
        let policy = AllocationPolicy::default();
        assert_eq!(policy.default_for(&LeaveType::Sick), 15);
        assert_eq!(policy.default_for(&LeaveType::Casual), 5);
        assert_eq!(policy.default_for(&LeaveType::Vacation), 10);
        assert_eq!(policy.default_for(&LeaveType::normalize("sabbatical")), 0);
    }

    #[test]
    fn extra_types_can_be_configured() {
        let policy = AllocationPolicy::default().with_default(LeaveType::normalize("parental"), 60);
        assert_eq!(policy.default_for(&LeaveType::normalize("Parental")), 60);
    }
}
