//! Derivation chains and recovery of half-finished transitions.

use std::collections::HashSet;

use careflow_core::{
    CommitStage, Reference, Request, RequestIntent, RequestStatus, Result, TransitionError,
};
use careflow_state::Repository;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::transition;

/// One record in a derivation chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceLink {
    pub reference: Reference,
    pub intent: RequestIntent,
    pub status: RequestStatus,
    pub version: u64,
    /// [`Request::content_hash`] of the version read.
    pub content_hash: String,
}

impl From<&Request> for ProvenanceLink {
    fn from(record: &Request) -> Self {
        Self {
            reference: record.as_reference(),
            intent: record.intent(),
            status: record.status(),
            version: record.version,
            content_hash: record.content_hash(),
        }
    }
}

/// Follow `based_on` links from `record` back to the workflow root.
///
/// The first link is `record` itself; the last is the root. Each predecessor is read
/// fresh from the store.
pub async fn provenance_chain(
    repository: &dyn Repository,
    record: &Request,
) -> Result<Vec<ProvenanceLink>> {
    let mut chain = vec![ProvenanceLink::from(record)];
    let mut seen = HashSet::from([record.as_reference()]);
    let mut next = record.based_on().cloned();

    while let Some(reference) = next {
        if !seen.insert(reference.clone()) {
            return Err(TransitionError::ProvenanceCycle { reference });
        }

        let predecessor = repository
            .read(reference.resource_type, &reference.id)
            .await
            .map_err(|e| TransitionError::persistence(CommitStage::Read, e))?
            .ok_or_else(|| TransitionError::PredecessorNotFound {
                reference: reference.clone(),
            })?;

        chain.push(ProvenanceLink::from(&predecessor));
        next = predecessor.based_on().cloned();
    }

    debug!(record = %record.as_reference(), depth = chain.len(), "provenance resolved");
    Ok(chain)
}

/// Finish a transition whose successor was stored but whose predecessor was not
/// completed.
///
/// Returns the completed predecessor, or `None` when there is nothing to do: the
/// predecessor is already completed, or the successor was withdrawn.
pub async fn reconcile(repository: &dyn Repository, successor: &Reference) -> Result<Option<Request>> {
    let successor = transition::read_record(repository, successor).await?;

    let based_on = successor
        .based_on()
        .cloned()
        .ok_or_else(|| TransitionError::MissingProvenance {
            successor: successor.as_reference(),
        })?;

    if matches!(
        successor.status(),
        RequestStatus::Revoked | RequestStatus::EnteredInError
    ) {
        warn!(
            successor = %successor.as_reference(),
            status = %successor.status(),
            "successor withdrawn; predecessor left as is"
        );
        return Ok(None);
    }

    let mut predecessor =
        transition::read_predecessor(repository, successor.resource_type, &based_on).await?;

    match predecessor.status() {
        RequestStatus::Completed => Ok(None),
        RequestStatus::Active => {
            predecessor.set_status(RequestStatus::Completed);
            let stored = repository
                .update(predecessor)
                .await
                .map_err(|e| TransitionError::persistence(CommitStage::CompletePredecessor, e))?;

            info!(
                successor = %successor.as_reference(),
                predecessor = %based_on,
                "predecessor completion re-driven"
            );
            Ok(Some(stored))
        }
        status => Err(TransitionError::PredecessorNotActive {
            reference: based_on,
            status,
        }),
    }
}
