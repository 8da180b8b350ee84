use serde::{Deserialize, Serialize};

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, strum_macros::EnumString, strum_macros::Display,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[strum(serialize = "employee")]
    Employee,
    #[strum(serialize = "manager")]
    Manager,
    #[strum(serialize = "hr", serialize = "admin", to_string = "hr")]
    Hr,
}

impl Role {
    /// Single entry point for role strings coming from tokens or upstream services.
    pub fn normalize(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }

    /// Roles allowed to approve or reject someone's leave.
    pub fn can_review_leave(&self) -> bool {
        matches!(self, Role::Manager | Role::Hr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_loose_casing_and_aliases() {
        assert_eq!(Role::normalize("HR"), Some(Role::Hr));
        assert_eq!(Role::normalize("hr"), Some(Role::Hr));
        assert_eq!(Role::normalize("admin"), Some(Role::Hr));
        assert_eq!(Role::normalize("Manager"), Some(Role::Manager));
        assert_eq!(Role::normalize(" Employee "), Some(Role::Employee));
        assert_eq!(Role::normalize("contractor"), None);
    }

    #[test]
    fn displays_canonical_name() {
        assert_eq!(Role::Hr.to_string(), "hr");
        assert_eq!(Role::Manager.to_string(), "manager");
    }

    #[test]
    fn only_managers_and_hr_review() {
        assert!(Role::Hr.can_review_leave());
        assert!(Role::Manager.can_review_leave());
        assert!(!Role::Employee.can_review_leave());
    }
}
