//! The four workflow phases.
//!
//! Each phase is a thin typed wrapper over [`BaseRequestPhase`]. Their transition
//! rules differ only in the constants of [`crate::topology`], so every phase exposes
//! the same surface:
//!
//! - `prepare(current)` derives a draft successor with no side effects.
//! - `initiate(repository, current, successor)` validates and persists the move into
//!   this phase, completing the predecessor.
//! - `load` / `from_record` wrap an existing record.
//! - `activate`, `suspend`, `resume`, `revoke`, `complete` change the wrapped record's
//!   status within the phase.

use careflow_core::{PhaseName, RecordId, Request, RequestStatus, ResourceType, Result};
use careflow_state::Repository;

use crate::config::EngineConfig;
use crate::phase::{BaseRequestPhase, Phase, RequestPhase};
use crate::transition;

macro_rules! request_phase {
    ($(#[$meta:meta])* $name:ident => $phase:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name(BaseRequestPhase);

        impl $name {
            /// Derive a draft successor in this phase from `current`.
            pub fn prepare(current: &dyn Phase) -> Result<Request> {
                transition::prepare(Self::PHASE, current)
            }

            /// Move from `current` into this phase with the default config.
            pub async fn initiate(
                repository: &dyn Repository,
                current: &dyn Phase,
                successor: Request,
            ) -> Result<Self> {
                Self::initiate_with(repository, current, successor, &EngineConfig::default()).await
            }

            /// Move from `current` into this phase.
            pub async fn initiate_with(
                repository: &dyn Repository,
                current: &dyn Phase,
                successor: Request,
                config: &EngineConfig,
            ) -> Result<Self> {
                let record =
                    transition::initiate(Self::PHASE, repository, current, successor, config).await?;
                Ok(Self::wrap(record))
            }

            /// Read a stored record and wrap it in this phase.
            pub async fn load(
                repository: &dyn Repository,
                resource_type: ResourceType,
                id: &RecordId,
            ) -> Result<Self> {
                let record = transition::load(Self::PHASE, repository, resource_type, id).await?;
                Ok(Self::wrap(record))
            }

            /// Wrap a record the caller already holds. Its predecessor, if any, is
            /// read to confirm the record belongs in this phase.
            pub async fn from_record(repository: &dyn Repository, record: Request) -> Result<Self> {
                transition::check_membership(Self::PHASE, repository, &record).await?;
                Ok(Self::wrap(record))
            }

            fn wrap(record: Request) -> Self {
                Self(BaseRequestPhase::new(Self::PHASE, record))
            }

            /// Draft -> active.
            pub async fn activate(&mut self, repository: &dyn Repository) -> Result<()> {
                self.0.change_status(repository, RequestStatus::Active).await
            }

            /// Active -> on hold.
            pub async fn suspend(&mut self, repository: &dyn Repository) -> Result<()> {
                self.0.change_status(repository, RequestStatus::OnHold).await
            }

            /// On hold -> active.
            pub async fn resume(&mut self, repository: &dyn Repository) -> Result<()> {
                self.0.change_status(repository, RequestStatus::Active).await
            }

            /// Withdraw the request.
            pub async fn revoke(&mut self, repository: &dyn Repository) -> Result<()> {
                self.0.change_status(repository, RequestStatus::Revoked).await
            }

            /// Active -> completed, without a successor.
            pub async fn complete(&mut self, repository: &dyn Repository) -> Result<()> {
                self.0.change_status(repository, RequestStatus::Completed).await
            }

            /// Reload the wrapped record from the store.
            pub async fn refresh(&mut self, repository: &dyn Repository) -> Result<()> {
                self.0.refresh(repository).await
            }

            pub fn into_record(self) -> Request {
                self.0.into_record()
            }
        }

        impl Phase for $name {
            fn phase_name(&self) -> PhaseName {
                Self::PHASE
            }

            fn record(&self) -> &Request {
                self.0.record()
            }
        }

        impl RequestPhase for $name {
            const PHASE: PhaseName = $phase;

            fn from_base(base: BaseRequestPhase) -> Self {
                Self(base)
            }
        }
    };
}

request_phase!(
    /// A suggested action with no authorization behind it. Workflows start here.
    ProposalPhase => PhaseName::Proposal
);

request_phase!(
    /// An intention to act, derived from a proposal.
    PlanPhase => PhaseName::Plan
);

request_phase!(
    /// An authorized request, derived from a proposal or a plan.
    OrderPhase => PhaseName::Order
);

request_phase!(
    /// The performance of an order.
    EventPhase => PhaseName::Event
);

impl ProposalPhase {
    /// Persist `record` as the root of a new workflow.
    pub async fn start(repository: &dyn Repository, record: Request) -> Result<Self> {
        let record = transition::start(repository, record).await?;
        Ok(Self::wrap(record))
    }
}
