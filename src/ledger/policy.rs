use crate::model::role::Role;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

/// Decides whether an actor may approve or reject someone's leave.
///
/// Consulted after the ledger's own role gate and self-approval rule, so
/// implementations only carry organisation-specific scoping.
pub trait AccessPolicy: Send + Sync {
    fn can_act_on_leave(&self, actor_role: Role, actor_id: u64, leave_owner_id: u64) -> Decision;

    /// Employees whose leave a reviewer may list; `None` means everyone.
    fn visible_employees(&self, _actor_role: Role, _actor_id: u64) -> Option<Vec<u64>> {
        None
    }
}

/// Allows every reviewer the ledger itself lets through.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowReviewers;

impl AccessPolicy for AllowReviewers {
    fn can_act_on_leave(&self, _actor_role: Role, _actor_id: u64, _leave_owner_id: u64) -> Decision {
        Decision::Allow
    }
}

/// Restricts managers to an explicit set of reports; HR is unrestricted.
#[derive(Debug, Default, Clone)]
pub struct ReportingLines {
    reports: std::collections::HashMap<u64, std::collections::HashSet<u64>>,
}

impl ReportingLines {
    pub fn with_report(mut self, manager_id: u64, employee_id: u64) -> Self {
        self.reports.entry(manager_id).or_default().insert(employee_id);
        self
    }
}

impl AccessPolicy for ReportingLines {
    fn can_act_on_leave(&self, actor_role: Role, actor_id: u64, leave_owner_id: u64) -> Decision {
        match actor_role {
            Role::Hr => Decision::Allow,
            Role::Manager
                if self
                    .reports
                    .get(&actor_id)
                    .is_some_and(|team| team.contains(&leave_owner_id)) =>
            {
                Decision::Allow
            }
            _ => Decision::Deny("managers can only act on their own team's leave".to_string()),
        }
    }

    fn visible_employees(&self, actor_role: Role, actor_id: u64) -> Option<Vec<u64>> {
        if actor_role == Role::Hr {
            return None;
        }
        let mut team: Vec<u64> = self
            .reports
            .get(&actor_id)
            .map(|team| team.iter().copied().collect())
            .unwrap_or_default();
        team.sort_unstable();
        Some(team)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reporting_lines_scope_managers() {
        let policy = ReportingLines::default().with_report(10, 1);
        assert_eq!(policy.can_act_on_leave(Role::Manager, 10, 1), Decision::Allow);
        assert!(matches!(policy.can_act_on_leave(Role::Manager, 10, 2), Decision::Deny(_)));
        assert_eq!(policy.can_act_on_leave(Role::Hr, 99, 2), Decision::Allow);
    }

    #[test]
    fn reporting_lines_limit_what_managers_list() {
        let policy = ReportingLines::default().with_report(10, 3).with_report(10, 1);
        assert_eq!(policy.visible_employees(Role::Manager, 10), Some(vec![1, 3]));
        assert_eq!(policy.visible_employees(Role::Manager, 11), Some(vec![]));
        assert_eq!(policy.visible_employees(Role::Hr, 99), None);
        assert_eq!(AllowReviewers.visible_employees(Role::Manager, 10), None);
    }
}
