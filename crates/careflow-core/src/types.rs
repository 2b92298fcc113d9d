//! Common types used across Careflow.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a single request record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    /// Being authored; not yet actionable.
    Draft,
    /// Actionable.
    Active,
    /// Temporarily suspended.
    OnHold,
    /// Withdrawn before completion.
    Revoked,
    /// Fulfilled, or superseded by a successor record.
    Completed,
    /// Should never have existed.
    EnteredInError,
    /// Status cannot be determined.
    Unknown,
}

impl RequestStatus {
    /// All statuses, in declaration order.
    pub const ALL: [RequestStatus; 7] = [
        RequestStatus::Draft,
        RequestStatus::Active,
        RequestStatus::OnHold,
        RequestStatus::Revoked,
        RequestStatus::Completed,
        RequestStatus::EnteredInError,
        RequestStatus::Unknown,
    ];

    /// Returns true if no further status change is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Revoked | RequestStatus::Completed | RequestStatus::EnteredInError
        )
    }

    /// Returns true if the record is actionable.
    pub fn is_active(&self) -> bool {
        matches!(self, RequestStatus::Active)
    }

    /// Returns true if the lifecycle allows moving from `self` to `next`.
    pub fn can_change_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;

        matches!(
            (self, next),
            (Draft, Active)
                | (Draft, Revoked)
                | (Draft, EnteredInError)
                | (Active, OnHold)
                | (Active, Revoked)
                | (Active, Completed)
                | (OnHold, Active)
                | (OnHold, Revoked)
        )
    }

    /// The wire code of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Draft => "draft",
            RequestStatus::Active => "active",
            RequestStatus::OnHold => "on-hold",
            RequestStatus::Revoked => "revoked",
            RequestStatus::Completed => "completed",
            RequestStatus::EnteredInError => "entered-in-error",
            RequestStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Urgency of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Normal priority (default).
    #[default]
    Routine,
    /// Issued with higher priority than routine.
    Urgent,
    /// As soon as possible.
    Asap,
    /// Immediately, with highest priority.
    Stat,
}

/// Workflow stage a record occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseName {
    Proposal,
    Plan,
    Order,
    Event,
}

impl PhaseName {
    /// All phases, in workflow order.
    pub const ALL: [PhaseName; 4] = [
        PhaseName::Proposal,
        PhaseName::Plan,
        PhaseName::Order,
        PhaseName::Event,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseName::Proposal => "proposal",
            PhaseName::Plan => "plan",
            PhaseName::Order => "order",
            PhaseName::Event => "event",
        }
    }
}

impl std::fmt::Display for PhaseName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal() {
        assert!(RequestStatus::Completed.is_terminal());
        assert!(RequestStatus::Revoked.is_terminal());
        assert!(RequestStatus::EnteredInError.is_terminal());
        assert!(!RequestStatus::Active.is_terminal());
        assert!(!RequestStatus::Draft.is_terminal());
    }

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        for from in RequestStatus::ALL.iter().filter(|s| s.is_terminal()) {
            for to in RequestStatus::ALL {
                assert!(!from.can_change_to(to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_status_lifecycle() {
        assert!(RequestStatus::Draft.can_change_to(RequestStatus::Active));
        assert!(RequestStatus::Active.can_change_to(RequestStatus::OnHold));
        assert!(RequestStatus::OnHold.can_change_to(RequestStatus::Active));
        assert!(!RequestStatus::Draft.can_change_to(RequestStatus::Completed));
        assert!(!RequestStatus::OnHold.can_change_to(RequestStatus::Completed));
    }

    #[test]
    fn test_status_serde_codes() {
        let json = serde_json::to_string(&RequestStatus::EnteredInError).unwrap();
        assert_eq!(json, "\"entered-in-error\"");
        assert_eq!(RequestStatus::OnHold.to_string(), "on-hold");
    }
}
