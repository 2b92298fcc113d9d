//! Phase transition engine.
//!
//! `prepare` derives a draft successor without touching the store. `initiate`
//! validates a successor against the current phase and the freshly read predecessor,
//! then creates the successor and completes the predecessor. Guards run in a fixed
//! order and the first failing guard decides the error.
//!
//! The successor is always written before the predecessor is completed. If the
//! second write fails the store holds an orphaned successor next to a still-active
//! predecessor, which [`crate::provenance::reconcile`] can finish later.

use careflow_core::{
    CommitStage, PhaseName, RecordId, Reference, Request, RequestIntent, RequestStatus,
    ResourceType, Result, TransitionError,
};
use careflow_state::Repository;
use tracing::{debug, info, warn};

use crate::config::{CommitMode, EngineConfig};
use crate::phase::Phase;
use crate::topology::{self, PhaseRule};

fn check_phase(rule: &PhaseRule, current: PhaseName) -> Result<()> {
    if !rule.accepts_phase(current) {
        return Err(TransitionError::IllegalPhaseTransition {
            from: current,
            to: rule.phase,
        });
    }
    Ok(())
}

fn check_intent(rule: &PhaseRule, intent: RequestIntent) -> Result<()> {
    if !rule.accepts_intent(intent) {
        return Err(TransitionError::IllegalIntentTransition {
            intent,
            to: rule.phase,
        });
    }
    Ok(())
}

fn check_active(predecessor: &Request) -> Result<()> {
    if !predecessor.status().is_active() {
        return Err(TransitionError::PredecessorNotActive {
            reference: predecessor.as_reference(),
            status: predecessor.status(),
        });
    }
    Ok(())
}

fn check_new_record(rule: &PhaseRule, record: &Request) -> Result<()> {
    if record.intent() != rule.target_intent {
        return Err(TransitionError::IntentMismatch {
            to: rule.phase,
            expected: rule.target_intent,
            actual: record.intent(),
        });
    }
    if !rule.accepts_start_status(record.status()) {
        return Err(TransitionError::InvalidStartStatus {
            to: rule.phase,
            status: record.status(),
        });
    }
    Ok(())
}

fn log_outcome<T>(action: &str, phase: PhaseName, subject: &Reference, result: &Result<T>) {
    match result {
        Ok(_) => info!(%phase, record = %subject, "{} succeeded", action),
        Err(e) if e.is_partial_commit() => warn!(
            %phase,
            record = %subject,
            error = %e,
            "{} left an orphaned successor; predecessor still active",
            action
        ),
        Err(e) if e.is_guard_failure() => debug!(%phase, record = %subject, error = %e, "{} rejected", action),
        Err(e) => warn!(%phase, record = %subject, error = %e, "{} failed", action),
    }
}

/// Derive a draft successor in `target` from the current phase.
///
/// Pure: the repository is never consulted. The draft has a fresh id, status draft,
/// the target phase's intent, and no `based_on`; callers link it with
/// [`Request::link_to`] before calling [`initiate`].
pub fn prepare(target: PhaseName, current: &dyn Phase) -> Result<Request> {
    let rule = topology::rule(target);
    let record = current.record();

    let result = check_phase(rule, current.phase_name())
        .and_then(|_| check_intent(rule, record.intent()))
        .and_then(|_| check_active(record))
        .map(|_| record.copy(RecordId::random(), RequestStatus::Draft, rule.target_intent));

    if let Err(ref e) = result {
        debug!(phase = %target, record = %record.as_reference(), error = %e, "prepare rejected");
    }
    result
}

/// Validate `successor` and persist the transition from `current` into `target`.
///
/// Returns the successor as stored.
pub async fn initiate(
    target: PhaseName,
    repository: &dyn Repository,
    current: &dyn Phase,
    successor: Request,
    config: &EngineConfig,
) -> Result<Request> {
    let subject = successor.as_reference();
    let result = run_initiate(topology::rule(target), repository, current, successor, config).await;
    log_outcome("initiate", target, &subject, &result);
    result
}

async fn run_initiate(
    rule: &PhaseRule,
    repository: &dyn Repository,
    current: &dyn Phase,
    successor: Request,
    config: &EngineConfig,
) -> Result<Request> {
    check_phase(rule, current.phase_name())?;

    let based_on = successor
        .based_on()
        .cloned()
        .ok_or_else(|| TransitionError::MissingProvenance {
            successor: successor.as_reference(),
        })?;

    let expected = current.reference();
    if based_on != expected {
        return Err(TransitionError::ProvenanceMismatch { expected, based_on });
    }

    let mut predecessor = read_predecessor(repository, successor.resource_type, &based_on).await?;
    check_intent(rule, predecessor.intent())?;
    check_active(&predecessor)?;
    check_new_record(rule, &successor)?;

    predecessor.set_status(RequestStatus::Completed);
    let stored = commit(repository, successor, predecessor, config.commit_mode).await?;

    if config.verify_after_commit {
        verify(repository, &stored).await?;
    }

    Ok(stored)
}

/// Read the predecessor as the successor's own resource type.
pub(crate) async fn read_predecessor(
    repository: &dyn Repository,
    resource_type: ResourceType,
    based_on: &Reference,
) -> Result<Request> {
    let not_found = || TransitionError::PredecessorNotFound {
        reference: based_on.clone(),
    };

    if based_on.resource_type != resource_type {
        return Err(not_found());
    }

    repository
        .read(resource_type, &based_on.id)
        .await
        .map_err(|e| TransitionError::persistence(CommitStage::Read, e))?
        .ok_or_else(not_found)
}

async fn commit(
    repository: &dyn Repository,
    successor: Request,
    predecessor: Request,
    mode: CommitMode,
) -> Result<Request> {
    match mode {
        CommitMode::Transactional => Ok(repository
            .commit_transition(successor, predecessor)
            .await?
            .successor),
        CommitMode::Sequential => {
            let stored = repository
                .create(successor)
                .await
                .map_err(|e| TransitionError::persistence(CommitStage::CreateSuccessor, e))?;
            repository
                .update(predecessor)
                .await
                .map_err(|e| TransitionError::persistence(CommitStage::CompletePredecessor, e))?;
            Ok(stored)
        }
    }
}

async fn verify(repository: &dyn Repository, stored: &Request) -> Result<()> {
    let found = repository
        .read(stored.resource_type, &stored.id)
        .await
        .map_err(|e| TransitionError::persistence(CommitStage::Verify, e))?;

    if found.is_none() {
        return Err(TransitionError::persistence(
            CommitStage::Verify,
            careflow_core::RepositoryError::Missing {
                reference: stored.as_reference(),
            },
        ));
    }
    Ok(())
}

/// Persist a new workflow root.
pub async fn start(repository: &dyn Repository, record: Request) -> Result<Request> {
    let rule = topology::rule(PhaseName::Proposal);
    let subject = record.as_reference();
    let result = run_start(rule, repository, record).await;
    log_outcome("start", rule.phase, &subject, &result);
    result
}

async fn run_start(rule: &PhaseRule, repository: &dyn Repository, record: Request) -> Result<Request> {
    if let Some(based_on) = record.based_on() {
        return Err(TransitionError::UnexpectedProvenance {
            reference: record.as_reference(),
            based_on: based_on.clone(),
        });
    }
    check_new_record(rule, &record)?;

    repository
        .create(record)
        .await
        .map_err(|e| TransitionError::persistence(CommitStage::CreateSuccessor, e))
}

/// Check that `record` belongs in `phase`.
///
/// Order and event records share an intent, so a linked record is placed by the
/// intent of its stored predecessor. Unlinked records are accepted everywhere except
/// the event phase.
pub async fn check_membership(
    phase: PhaseName,
    repository: &dyn Repository,
    record: &Request,
) -> Result<()> {
    let rule = topology::rule(phase);

    if record.intent() != rule.target_intent {
        return Err(TransitionError::IntentMismatch {
            to: phase,
            expected: rule.target_intent,
            actual: record.intent(),
        });
    }

    let based_on = match (rule.is_root(), record.based_on()) {
        (true, Some(based_on)) => {
            return Err(TransitionError::UnexpectedProvenance {
                reference: record.as_reference(),
                based_on: based_on.clone(),
            })
        }
        (true, None) => return Ok(()),
        (false, None) if phase == PhaseName::Event => {
            return Err(TransitionError::MissingProvenance {
                successor: record.as_reference(),
            })
        }
        (false, None) => return Ok(()),
        (false, Some(based_on)) => based_on,
    };

    let predecessor = read_predecessor(repository, record.resource_type, based_on).await?;
    check_intent(rule, predecessor.intent())
}

/// Read the latest version of a record, failing if absent.
pub async fn read_record(repository: &dyn Repository, reference: &Reference) -> Result<Request> {
    repository
        .read(reference.resource_type, &reference.id)
        .await
        .map_err(|e| TransitionError::persistence(CommitStage::Read, e))?
        .ok_or_else(|| TransitionError::RecordNotFound {
            reference: reference.clone(),
        })
}

/// Read a record and check it belongs in `phase`.
pub async fn load(
    phase: PhaseName,
    repository: &dyn Repository,
    resource_type: ResourceType,
    id: &RecordId,
) -> Result<Request> {
    let record = read_record(repository, &Reference::new(resource_type, id.clone())).await?;
    check_membership(phase, repository, &record).await?;
    Ok(record)
}

/// Move a stored record to `status` within its phase.
pub async fn change_status(
    repository: &dyn Repository,
    reference: &Reference,
    status: RequestStatus,
) -> Result<Request> {
    let mut record = read_record(repository, reference).await?;
    let from = record.status();

    if !from.can_change_to(status) {
        debug!(record = %reference, %from, to = %status, "status change rejected");
        return Err(TransitionError::IllegalStatusChange {
            reference: reference.clone(),
            from,
            to: status,
        });
    }

    record.set_status(status);
    let stored = repository
        .update(record)
        .await
        .map_err(|e| TransitionError::persistence(CommitStage::StatusChange, e))?;

    info!(record = %reference, %from, to = %status, "status changed");
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::BaseRequestPhase;
    use crate::testing::{
        init_tracing, request, seed, DroppingRepository, FailingRepository, FailingUpdateRepository,
    };
    use careflow_core::RepositoryError;
    use careflow_state::InMemoryRepository;

    fn phase(name: PhaseName, record: Request) -> BaseRequestPhase {
        BaseRequestPhase::new(name, record)
    }

    fn active_plan() -> BaseRequestPhase {
        phase(
            PhaseName::Plan,
            request("P1", RequestIntent::Plan, RequestStatus::Active),
        )
    }

    async fn seeded_plan(store: &InMemoryRepository) -> BaseRequestPhase {
        let record = seed(store, "P1", RequestIntent::Plan, RequestStatus::Active).await;
        phase(PhaseName::Plan, record)
    }

    fn linked_order(current: &BaseRequestPhase) -> Request {
        let mut draft = prepare(PhaseName::Order, current).unwrap();
        draft.link_to(current.reference()).unwrap();
        draft
    }

    #[test]
    fn test_prepare_rejects_non_predecessor_phases() {
        for name in [PhaseName::Order, PhaseName::Event] {
            let current = phase(name, request("X", RequestIntent::Plan, RequestStatus::Active));
            let err = prepare(PhaseName::Order, &current).unwrap_err();
            assert_eq!(
                err,
                TransitionError::IllegalPhaseTransition {
                    from: name,
                    to: PhaseName::Order
                }
            );
        }
    }

    #[test]
    fn test_prepare_rejects_other_intents() {
        for intent in RequestIntent::ALL {
            let current = phase(PhaseName::Plan, request("X", intent, RequestStatus::Active));
            let result = prepare(PhaseName::Order, &current);

            if matches!(intent, RequestIntent::Proposal | RequestIntent::Plan) {
                assert!(result.is_ok(), "{} should be accepted", intent);
            } else {
                assert_eq!(
                    result.unwrap_err(),
                    TransitionError::IllegalIntentTransition {
                        intent,
                        to: PhaseName::Order
                    }
                );
            }
        }
    }

    #[test]
    fn test_prepare_requires_active_predecessor() {
        for status in RequestStatus::ALL.into_iter().filter(|s| !s.is_active()) {
            let current = phase(PhaseName::Plan, request("P1", RequestIntent::Plan, status));
            let err = prepare(PhaseName::Order, &current).unwrap_err();

            assert!(err.to_string().contains(status.as_str()));
            assert!(matches!(err, TransitionError::PredecessorNotActive { status: s, .. } if s == status));
        }
    }

    #[test]
    fn test_prepare_guard_order() {
        // Every guard fails: the phase guard wins.
        let current = phase(
            PhaseName::Event,
            request("X", RequestIntent::Option, RequestStatus::Draft),
        );
        assert!(matches!(
            prepare(PhaseName::Order, &current),
            Err(TransitionError::IllegalPhaseTransition { .. })
        ));

        // Phase passes: the intent guard wins over the status guard.
        let current = phase(
            PhaseName::Plan,
            request("X", RequestIntent::Option, RequestStatus::Draft),
        );
        assert!(matches!(
            prepare(PhaseName::Order, &current),
            Err(TransitionError::IllegalIntentTransition { .. })
        ));
    }

    #[test]
    fn test_prepare_yields_unlinked_draft() {
        let current = active_plan();
        let draft = prepare(PhaseName::Order, &current).unwrap();

        assert_ne!(draft.id, current.record().id);
        assert_eq!(draft.intent, RequestIntent::Order);
        assert_eq!(draft.status, RequestStatus::Draft);
        assert_eq!(draft.version, 0);
        assert!(draft.based_on.is_none());
        assert_eq!(draft.subject, current.record().subject);
        assert_eq!(draft.resource_type, current.record().resource_type);
    }

    #[test]
    fn test_prepare_into_root_phase_is_illegal() {
        for name in PhaseName::ALL {
            let current = phase(name, request("X", RequestIntent::Proposal, RequestStatus::Active));
            assert!(matches!(
                prepare(PhaseName::Proposal, &current),
                Err(TransitionError::IllegalPhaseTransition { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_initiate_rejects_phase_before_any_io() {
        init_tracing();
        let repository = FailingRepository::new();
        let current = phase(
            PhaseName::Event,
            request("E1", RequestIntent::Order, RequestStatus::Active),
        );
        let successor = request("O1", RequestIntent::Order, RequestStatus::Draft)
            .with_based_on(current.reference());

        let err = initiate(
            PhaseName::Order,
            &repository,
            &current,
            successor,
            &EngineConfig::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, TransitionError::IllegalPhaseTransition { .. }));
        assert_eq!(repository.calls(), 0);
    }

    #[tokio::test]
    async fn test_initiate_missing_provenance() {
        let repository = FailingRepository::new();
        let current = active_plan();
        let draft = prepare(PhaseName::Order, &current).unwrap();
        let draft_ref = draft.as_reference();

        let err = initiate(PhaseName::Order, &repository, &current, draft, &EngineConfig::default())
            .await
            .unwrap_err();

        assert_eq!(err, TransitionError::MissingProvenance { successor: draft_ref });
        assert_eq!(repository.calls(), 0);
    }

    #[tokio::test]
    async fn test_initiate_provenance_mismatch_writes_nothing() {
        let store = InMemoryRepository::new();
        let current = seeded_plan(&store).await;
        let other = seed(&store, "P2", RequestIntent::Plan, RequestStatus::Active).await;
        let before = store.sequence().await;

        let mut draft = prepare(PhaseName::Order, &current).unwrap();
        draft.link_to(other.as_reference()).unwrap();

        let err = initiate(PhaseName::Order, &store, &current, draft, &EngineConfig::default())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            TransitionError::ProvenanceMismatch {
                expected: current.reference(),
                based_on: other.as_reference(),
            }
        );
        assert_eq!(store.sequence().await, before);
    }

    #[tokio::test]
    async fn test_initiate_predecessor_not_found() {
        let store = InMemoryRepository::new();
        let current = active_plan();
        let successor = linked_order(&current);

        let err = initiate(PhaseName::Order, &store, &current, successor, &EngineConfig::default())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            TransitionError::PredecessorNotFound {
                reference: current.reference()
            }
        );
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_initiate_reads_predecessor_as_successor_type() {
        let store = InMemoryRepository::new();
        let current = seeded_plan(&store).await;

        let mut successor = linked_order(&current);
        successor.resource_type = ResourceType::MedicationRequest;

        let err = initiate(PhaseName::Order, &store, &current, successor, &EngineConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(err, TransitionError::PredecessorNotFound { .. }));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_initiate_uses_fresh_predecessor() {
        let store = InMemoryRepository::new();
        let current = seeded_plan(&store).await;

        // The store's copy moved on after the caller loaded its phase.
        let mut stored = current.record().clone();
        stored.intent = RequestIntent::Directive;
        store.update(stored).await.unwrap();

        let successor = linked_order(&current);
        let err = initiate(PhaseName::Order, &store, &current, successor, &EngineConfig::default())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            TransitionError::IllegalIntentTransition {
                intent: RequestIntent::Directive,
                to: PhaseName::Order
            }
        );
    }

    #[tokio::test]
    async fn test_initiate_intent_mismatch() {
        let store = InMemoryRepository::new();
        let current = seeded_plan(&store).await;

        let mut successor = linked_order(&current);
        successor.intent = RequestIntent::Plan;

        let err = initiate(PhaseName::Order, &store, &current, successor, &EngineConfig::default())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            TransitionError::IntentMismatch {
                to: PhaseName::Order,
                expected: RequestIntent::Order,
                actual: RequestIntent::Plan,
            }
        );
    }

    #[tokio::test]
    async fn test_initiate_invalid_start_status() {
        let store = InMemoryRepository::new();
        let current = seeded_plan(&store).await;

        let mut successor = linked_order(&current);
        successor.set_status(RequestStatus::Completed);

        let err = initiate(PhaseName::Order, &store, &current, successor, &EngineConfig::default())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            TransitionError::InvalidStartStatus {
                to: PhaseName::Order,
                status: RequestStatus::Completed,
            }
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_initiate_commits_in_both_modes() {
        for config in [EngineConfig::default(), EngineConfig::sequential()] {
            let store = InMemoryRepository::new();
            let current = seeded_plan(&store).await;
            let successor = linked_order(&current);

            let stored = initiate(PhaseName::Order, &store, &current, successor, &config)
                .await
                .unwrap();
            assert_eq!(stored.version, 1);
            assert_eq!(stored.based_on(), Some(&current.reference()));

            let predecessor = read_record(&store, &current.reference()).await.unwrap();
            assert_eq!(predecessor.status, RequestStatus::Completed);
            assert_eq!(predecessor.version, 2);
        }
    }

    #[tokio::test]
    async fn test_second_initiate_is_rejected() {
        let store = InMemoryRepository::new();
        let current = seeded_plan(&store).await;

        initiate(
            PhaseName::Order,
            &store,
            &current,
            linked_order(&current),
            &EngineConfig::default(),
        )
        .await
        .unwrap();

        let err = initiate(
            PhaseName::Order,
            &store,
            &current,
            linked_order(&current),
            &EngineConfig::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            TransitionError::PredecessorNotActive {
                status: RequestStatus::Completed,
                ..
            }
        ));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_initiates_advance_once() {
        let store = InMemoryRepository::new();
        let current = seeded_plan(&store).await;
        let config = EngineConfig::default();

        let (a, b) = tokio::join!(
            initiate(PhaseName::Order, &store, &current, linked_order(&current), &config),
            initiate(PhaseName::Order, &store, &current, linked_order(&current), &config),
        );

        let (ok, err) = match (a, b) {
            (Ok(ok), Err(err)) | (Err(err), Ok(ok)) => (ok, err),
            other => panic!("expected exactly one success, got {:?}", other),
        };
        assert_eq!(ok.based_on(), Some(&current.reference()));
        assert!(matches!(
            err,
            TransitionError::PredecessorNotActive { .. }
                | TransitionError::Persistence {
                    source: RepositoryError::Conflict { .. },
                    ..
                }
        ));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_partial_commit_leaves_orphaned_successor() {
        init_tracing();
        for config in [EngineConfig::default(), EngineConfig::sequential()] {
            let repository = FailingUpdateRepository::new();
            let record = seed(repository.inner(), "P1", RequestIntent::Plan, RequestStatus::Active).await;
            let current = phase(PhaseName::Plan, record);
            let successor = linked_order(&current);
            let successor_ref = successor.as_reference();

            let err = initiate(PhaseName::Order, &repository, &current, successor, &config)
                .await
                .unwrap_err();

            assert!(err.is_partial_commit(), "{:?}", err);
            let orphan = read_record(&repository, &successor_ref).await.unwrap();
            assert_eq!(orphan.based_on(), Some(&current.reference()));
            let predecessor = read_record(&repository, &current.reference()).await.unwrap();
            assert_eq!(predecessor.status, RequestStatus::Active);
        }
    }

    #[tokio::test]
    async fn test_verify_after_commit() {
        let repository = DroppingRepository::new();
        let record = seed(repository.inner(), "P1", RequestIntent::Plan, RequestStatus::Active).await;
        let current = phase(PhaseName::Plan, record);
        let config = EngineConfig::sequential().with_verification(true);

        let err = initiate(PhaseName::Order, &repository, &current, linked_order(&current), &config)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TransitionError::Persistence {
                stage: CommitStage::Verify,
                source: RepositoryError::Missing { .. },
            }
        ));
    }

    #[tokio::test]
    async fn test_read_failure_is_persistence_error() {
        let repository = FailingRepository::new();
        let current = active_plan();

        let err = initiate(
            PhaseName::Order,
            &repository,
            &current,
            linked_order(&current),
            &EngineConfig::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            TransitionError::Persistence {
                stage: CommitStage::Read,
                ..
            }
        ));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_start_guards() {
        let store = InMemoryRepository::new();

        let err = start(&store, request("X", RequestIntent::Plan, RequestStatus::Active))
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::IntentMismatch { .. }));

        let err = start(&store, request("X", RequestIntent::Proposal, RequestStatus::Completed))
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::InvalidStartStatus { .. }));

        let linked = request("X", RequestIntent::Proposal, RequestStatus::Active)
            .with_based_on(Reference::new(ResourceType::ServiceRequest, "Y"));
        let err = start(&store, linked).await.unwrap_err();
        assert!(matches!(err, TransitionError::UnexpectedProvenance { .. }));

        assert!(store.is_empty().await);

        let root = start(&store, request("X", RequestIntent::Proposal, RequestStatus::Active))
            .await
            .unwrap();
        assert_eq!(root.version, 1);
    }

    #[tokio::test]
    async fn test_load_checks_membership() {
        let store = InMemoryRepository::new();
        let plan = seed(&store, "P1", RequestIntent::Plan, RequestStatus::Active).await;

        let loaded = load(PhaseName::Plan, &store, plan.resource_type, &plan.id)
            .await
            .unwrap();
        assert_eq!(loaded, plan);

        let err = load(PhaseName::Order, &store, plan.resource_type, &plan.id)
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::IntentMismatch { .. }));

        let err = load(PhaseName::Plan, &store, plan.resource_type, &RecordId::from("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransitionError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn test_event_membership_requires_provenance() {
        let store = InMemoryRepository::new();
        let order = request("O1", RequestIntent::Order, RequestStatus::Active);
        assert!(check_membership(PhaseName::Order, &store, &order).await.is_ok());
        assert!(matches!(
            check_membership(PhaseName::Event, &store, &order).await,
            Err(TransitionError::MissingProvenance { .. })
        ));

        let stored = store.create(order).await.unwrap();
        let event = request("E1", RequestIntent::Order, RequestStatus::Draft)
            .with_based_on(stored.as_reference());
        assert!(check_membership(PhaseName::Event, &store, &event).await.is_ok());
    }

    #[tokio::test]
    async fn test_membership_follows_predecessor_intent() {
        let store = InMemoryRepository::new();
        let plan = seed(&store, "P1", RequestIntent::Plan, RequestStatus::Completed).await;
        let order = store
            .create(
                request("O1", RequestIntent::Order, RequestStatus::Completed)
                    .with_based_on(plan.as_reference()),
            )
            .await
            .unwrap();
        let event = store
            .create(
                request("E1", RequestIntent::Order, RequestStatus::Draft)
                    .with_based_on(order.as_reference()),
            )
            .await
            .unwrap();

        // An event is not an order, even though both carry the order intent.
        let err = load(PhaseName::Order, &store, event.resource_type, &event.id)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::IllegalIntentTransition {
                intent: RequestIntent::Order,
                to: PhaseName::Order
            }
        );

        // An order derived from a plan is not an event.
        let err = load(PhaseName::Event, &store, order.resource_type, &order.id)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::IllegalIntentTransition {
                intent: RequestIntent::Plan,
                to: PhaseName::Event
            }
        );

        assert!(load(PhaseName::Order, &store, order.resource_type, &order.id).await.is_ok());
        assert!(load(PhaseName::Event, &store, event.resource_type, &event.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_membership_dangling_link() {
        let store = InMemoryRepository::new();
        let event = request("E1", RequestIntent::Order, RequestStatus::Draft)
            .with_based_on(Reference::new(ResourceType::ServiceRequest, "gone"));

        let err = check_membership(PhaseName::Event, &store, &event).await.unwrap_err();
        assert!(matches!(err, TransitionError::PredecessorNotFound { .. }));
    }

    #[tokio::test]
    async fn test_change_status() {
        let store = InMemoryRepository::new();
        let draft = seed(&store, "P1", RequestIntent::Plan, RequestStatus::Draft).await;
        let reference = draft.as_reference();

        let active = change_status(&store, &reference, RequestStatus::Active)
            .await
            .unwrap();
        assert_eq!(active.status, RequestStatus::Active);
        assert_eq!(active.version, 2);

        let err = change_status(&store, &reference, RequestStatus::Draft)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::IllegalStatusChange {
                reference: reference.clone(),
                from: RequestStatus::Active,
                to: RequestStatus::Draft,
            }
        );

        let err = change_status(
            &store,
            &Reference::new(ResourceType::ServiceRequest, "missing"),
            RequestStatus::Active,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TransitionError::RecordNotFound { .. }));
    }
}
