//! Error types for Careflow.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::intent::RequestIntent;
use crate::record::Reference;
use crate::types::{PhaseName, RequestStatus};

/// Which repository call of a transition failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStage {
    /// Reading a record the transition depends on.
    Read,
    /// Creating the successor record.
    CreateSuccessor,
    /// Marking the predecessor completed.
    CompletePredecessor,
    /// The combined create+update offered to the store as one transaction.
    Transaction,
    /// An in-phase status change.
    StatusChange,
    /// Re-reading the successor after commit.
    Verify,
}

impl std::fmt::Display for CommitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CommitStage::Read => "read",
            CommitStage::CreateSuccessor => "create successor",
            CommitStage::CompletePredecessor => "complete predecessor",
            CommitStage::Transaction => "transaction",
            CommitStage::StatusChange => "status change",
            CommitStage::Verify => "verify",
        };
        f.write_str(name)
    }
}

/// Failure reported by a record repository.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// A record with the same reference already exists.
    #[error("Record {reference} already exists")]
    Duplicate { reference: Reference },

    /// Update of a record the store does not hold.
    #[error("Record {reference} does not exist")]
    Missing { reference: Reference },

    /// Optimistic concurrency check failed.
    #[error("Version conflict on {reference}: expected {expected}, found {found}")]
    Conflict {
        reference: Reference,
        expected: u64,
        found: u64,
    },

    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the record.
    #[error("Store rejected record: {0}")]
    Rejected(String),
}

impl RepositoryError {
    /// Returns true if retrying the same write may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, RepositoryError::Unavailable(_))
    }
}

/// Reasons a phase transition or status change is refused.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransitionError {
    /// The current phase cannot precede the target phase.
    #[error("Cannot transition from {from} phase to {to} phase")]
    IllegalPhaseTransition { from: PhaseName, to: PhaseName },

    /// The predecessor's intent is not accepted by the target phase.
    #[error("Cannot transition a record with intent {intent} into the {to} phase")]
    IllegalIntentTransition { intent: RequestIntent, to: PhaseName },

    /// The predecessor is not active.
    #[error("Predecessor {reference} must be active, but its status is {status}")]
    PredecessorNotActive {
        reference: Reference,
        status: RequestStatus,
    },

    /// The successor has no `based_on` reference.
    #[error("Successor {successor} has no based_on reference")]
    MissingProvenance { successor: Reference },

    /// `based_on` references something other than the current phase's record.
    #[error("Successor is based on {based_on}, expected {expected}")]
    ProvenanceMismatch {
        expected: Reference,
        based_on: Reference,
    },

    /// The referenced predecessor is absent from the store.
    #[error("Predecessor {reference} not found")]
    PredecessorNotFound { reference: Reference },

    /// The successor's intent does not match the target phase.
    #[error("{to} phase requires intent {expected}, got {actual}")]
    IntentMismatch {
        to: PhaseName,
        expected: RequestIntent,
        actual: RequestIntent,
    },

    /// The successor's status is not a valid starting status for the target phase.
    #[error("{to} phase cannot start with status {status}")]
    InvalidStartStatus { to: PhaseName, status: RequestStatus },

    /// A root record carries a `based_on` reference.
    #[error("Root record {reference} must not be based on {based_on}")]
    UnexpectedProvenance {
        reference: Reference,
        based_on: Reference,
    },

    /// Status change not permitted by the request lifecycle.
    #[error("Cannot change status of {reference} from {from} to {to}")]
    IllegalStatusChange {
        reference: Reference,
        from: RequestStatus,
        to: RequestStatus,
    },

    /// A record expected in the store is absent.
    #[error("Record {reference} not found")]
    RecordNotFound { reference: Reference },

    /// Following `based_on` links revisited a record.
    #[error("Provenance chain revisits {reference}")]
    ProvenanceCycle { reference: Reference },

    /// A record failed structural validation.
    #[error("Invalid record: {message}")]
    InvalidRecord { message: String },

    /// The repository failed while persisting.
    #[error("Persistence failed during {stage}: {source}")]
    Persistence {
        stage: CommitStage,
        #[source]
        source: RepositoryError,
    },
}

impl TransitionError {
    /// Wraps a repository failure with the stage it happened in.
    pub fn persistence(stage: CommitStage, source: RepositoryError) -> Self {
        TransitionError::Persistence { stage, source }
    }

    /// Returns true if this error came from a guard rather than from the store.
    pub fn is_guard_failure(&self) -> bool {
        !matches!(self, TransitionError::Persistence { .. })
    }

    /// Returns true if the successor was created but the predecessor was not completed.
    pub fn is_partial_commit(&self) -> bool {
        matches!(
            self,
            TransitionError::Persistence {
                stage: CommitStage::CompletePredecessor,
                ..
            }
        )
    }

    /// Returns true if re-driving the same call may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            TransitionError::Persistence { source, .. } => {
                source.is_transient() || matches!(source, RepositoryError::Conflict { .. })
            }
            _ => false,
        }
    }

    /// Returns the record reference most relevant to this error, if any.
    pub fn reference(&self) -> Option<&Reference> {
        match self {
            TransitionError::PredecessorNotActive { reference, .. }
            | TransitionError::PredecessorNotFound { reference }
            | TransitionError::UnexpectedProvenance { reference, .. }
            | TransitionError::IllegalStatusChange { reference, .. }
            | TransitionError::RecordNotFound { reference }
            | TransitionError::ProvenanceCycle { reference } => Some(reference),
            TransitionError::MissingProvenance { successor } => Some(successor),
            TransitionError::ProvenanceMismatch { based_on, .. } => Some(based_on),
            TransitionError::Persistence { source, .. } => match source {
                RepositoryError::Duplicate { reference }
                | RepositoryError::Missing { reference }
                | RepositoryError::Conflict { reference, .. } => Some(reference),
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<(CommitStage, RepositoryError)> for TransitionError {
    fn from((stage, source): (CommitStage, RepositoryError)) -> Self {
        TransitionError::persistence(stage, source)
    }
}

/// Convenience Result type for Careflow operations.
pub type Result<T> = std::result::Result<T, TransitionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RecordId, ResourceType};

    fn reference() -> Reference {
        Reference::new(ResourceType::ServiceRequest, RecordId::from("P1"))
    }

    #[test]
    fn test_not_active_message_includes_status() {
        let err = TransitionError::PredecessorNotActive {
            reference: reference(),
            status: RequestStatus::Completed,
        };
        let message = err.to_string();
        assert!(message.contains("completed"));
        assert!(message.contains("ServiceRequest/P1"));
    }

    #[test]
    fn test_partial_commit_detection() {
        let err = TransitionError::from((
            CommitStage::CompletePredecessor,
            RepositoryError::Unavailable("down".to_string()),
        ));
        assert!(err.is_partial_commit());
        assert!(err.is_recoverable());
        assert!(!err.is_guard_failure());

        let err = TransitionError::from((
            CommitStage::CreateSuccessor,
            RepositoryError::Rejected("bad".to_string()),
        ));
        assert!(!err.is_partial_commit());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_reference_lookup() {
        let err = TransitionError::PredecessorNotFound {
            reference: reference(),
        };
        assert_eq!(err.reference(), Some(&reference()));
        assert!(err.is_guard_failure());
    }
}
