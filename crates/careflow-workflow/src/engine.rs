//! A repository handle bundled with transition settings.

use std::sync::Arc;

use careflow_core::{RecordId, Reference, Request, ResourceType, Result};
use careflow_state::Repository;

use crate::config::EngineConfig;
use crate::phase::{BaseRequestPhase, Phase, RequestPhase};
use crate::phases::ProposalPhase;
use crate::provenance::{self, ProvenanceLink};
use crate::transition;

/// Drives transitions against one shared repository.
///
/// Holds no per-workflow state; every call re-reads what it needs.
#[derive(Clone)]
pub struct TransitionEngine {
    repository: Arc<dyn Repository>,
    config: EngineConfig,
}

impl TransitionEngine {
    /// Create an engine with the default config.
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self::with_config(repository, EngineConfig::default())
    }

    pub fn with_config(repository: Arc<dyn Repository>, config: EngineConfig) -> Self {
        Self { repository, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn repository(&self) -> &dyn Repository {
        self.repository.as_ref()
    }

    /// Persist a new workflow root.
    pub async fn start(&self, record: Request) -> Result<ProposalPhase> {
        ProposalPhase::start(self.repository(), record).await
    }

    /// Load a stored record into phase `P`.
    pub async fn load<P: RequestPhase>(&self, resource_type: ResourceType, id: &RecordId) -> Result<P> {
        let record = transition::load(P::PHASE, self.repository(), resource_type, id).await?;
        Ok(P::from_base(BaseRequestPhase::new(P::PHASE, record)))
    }

    /// Derive a draft successor in phase `P`. Does not touch the repository.
    pub fn prepare<P: RequestPhase>(&self, current: &dyn Phase) -> Result<Request> {
        transition::prepare(P::PHASE, current)
    }

    /// Validate and persist a move from `current` into phase `P`.
    pub async fn initiate<P: RequestPhase>(&self, current: &dyn Phase, successor: Request) -> Result<P> {
        let record =
            transition::initiate(P::PHASE, self.repository(), current, successor, &self.config).await?;
        Ok(P::from_base(BaseRequestPhase::new(P::PHASE, record)))
    }

    /// Prepare, link to `current`, and initiate in one step.
    ///
    /// `edit` may adjust the draft's domain content before it is submitted.
    pub async fn advance<P, F>(&self, current: &dyn Phase, edit: F) -> Result<P>
    where
        P: RequestPhase,
        F: FnOnce(&mut Request),
    {
        let mut draft = self.prepare::<P>(current)?;
        edit(&mut draft);
        draft.link_to(current.reference())?;
        self.initiate::<P>(current, draft).await
    }

    /// Re-drive completion of an orphaned successor's predecessor.
    pub async fn reconcile(&self, successor: &Reference) -> Result<Option<Request>> {
        provenance::reconcile(self.repository(), successor).await
    }

    /// The derivation chain from `record` back to its root.
    pub async fn provenance(&self, record: &Request) -> Result<Vec<ProvenanceLink>> {
        provenance::provenance_chain(self.repository(), record).await
    }
}
