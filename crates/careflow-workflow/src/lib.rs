//! # Careflow Workflow
//!
//! Phase transitions for clinical requests: proposal, plan, order, and the event that
//! records an order's performance.
//!
//! A caller holding a phase derives a draft successor with `prepare`, links it to
//! the current record, optionally edits it, and submits it with `initiate`. A
//! successful `initiate` creates the successor and marks the predecessor completed.
//!
//! ```ignore
//! let mut draft = OrderPhase::prepare(&plan)?;
//! draft.link_to(plan.reference())?;
//! let order = OrderPhase::initiate(&repository, &plan, draft).await?;
//! ```

pub mod config;
pub mod engine;
pub mod phase;
pub mod phases;
pub mod provenance;
pub mod topology;
pub mod transition;

#[cfg(test)]
mod testing;

pub use config::{CommitMode, EngineConfig};
pub use engine::TransitionEngine;
pub use phase::{BaseRequestPhase, Phase, RequestPhase};
pub use phases::{EventPhase, OrderPhase, PlanPhase, ProposalPhase};
pub use provenance::{provenance_chain, reconcile, ProvenanceLink};
pub use topology::PhaseRule;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::{CommitMode, EngineConfig};
    pub use crate::engine::TransitionEngine;
    pub use crate::phase::{Phase, RequestPhase};
    pub use crate::phases::{EventPhase, OrderPhase, PlanPhase, ProposalPhase};
    pub use careflow_core::prelude::*;
    pub use careflow_state::{InMemoryRepository, Repository};
}
