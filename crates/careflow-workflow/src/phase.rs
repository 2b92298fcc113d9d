//! Phase capability and the shared phase shape.

use careflow_core::{PhaseName, Reference, Request, RequestStatus, Result};
use careflow_state::Repository;

use crate::transition;

/// A workflow stage paired with the record occupying it.
pub trait Phase: Send + Sync {
    /// The stage this phase represents.
    fn phase_name(&self) -> PhaseName;

    /// The wrapped record.
    fn record(&self) -> &Request;

    /// Value reference to the wrapped record.
    fn reference(&self) -> Reference {
        self.record().as_reference()
    }
}

/// A concrete phase type with a fixed [`PhaseName`].
pub trait RequestPhase: Phase + Sized {
    const PHASE: PhaseName;

    fn from_base(base: BaseRequestPhase) -> Self;
}

/// A record plus the name of the stage it occupies.
///
/// Holds no state beyond the record; every mutation re-reads the record from the
/// repository first.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseRequestPhase {
    phase_name: PhaseName,
    record: Request,
}

impl BaseRequestPhase {
    pub fn new(phase_name: PhaseName, record: Request) -> Self {
        Self { phase_name, record }
    }

    pub fn into_record(self) -> Request {
        self.record
    }

    /// Change the wrapped record's status and persist it.
    ///
    /// On success the wrapped record is replaced with the stored version. On failure
    /// it is left untouched.
    pub async fn change_status(
        &mut self,
        repository: &dyn Repository,
        status: RequestStatus,
    ) -> Result<()> {
        let updated = transition::change_status(repository, &self.record.as_reference(), status).await?;
        self.record = updated;
        Ok(())
    }

    /// Replace the wrapped record with the latest stored version.
    pub async fn refresh(&mut self, repository: &dyn Repository) -> Result<()> {
        self.record = transition::read_record(repository, &self.record.as_reference()).await?;
        Ok(())
    }
}

impl Phase for BaseRequestPhase {
    fn phase_name(&self) -> PhaseName {
        self.phase_name
    }

    fn record(&self) -> &Request {
        &self.record
    }
}
