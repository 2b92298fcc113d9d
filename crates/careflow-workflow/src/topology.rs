//! The fixed phase topology.
//!
//! Each phase is described by one [`PhaseRule`]: which phases and intents may precede
//! it, the intent its records carry, and the statuses a new record may start in. The
//! transition guards read everything they need from this table.

use careflow_core::{PhaseName, RequestIntent, RequestStatus};

/// Transition constants for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseRule {
    pub phase: PhaseName,

    /// Phases a record may be advanced from. Empty for the root phase.
    pub predecessors: &'static [PhaseName],

    /// Intents the predecessor record may carry.
    pub predecessor_intents: &'static [RequestIntent],

    /// Intent every record in this phase carries.
    pub target_intent: RequestIntent,

    /// Statuses a new record in this phase may be created with.
    pub start_statuses: &'static [RequestStatus],
}

const START_STATUSES: &[RequestStatus] = &[RequestStatus::Draft, RequestStatus::Active];

static RULES: [PhaseRule; 4] = [
    PhaseRule {
        phase: PhaseName::Proposal,
        predecessors: &[],
        predecessor_intents: &[],
        target_intent: RequestIntent::Proposal,
        start_statuses: START_STATUSES,
    },
    PhaseRule {
        phase: PhaseName::Plan,
        predecessors: &[PhaseName::Proposal],
        predecessor_intents: &[RequestIntent::Proposal],
        target_intent: RequestIntent::Plan,
        start_statuses: START_STATUSES,
    },
    PhaseRule {
        phase: PhaseName::Order,
        predecessors: &[PhaseName::Proposal, PhaseName::Plan],
        predecessor_intents: &[RequestIntent::Proposal, RequestIntent::Plan],
        target_intent: RequestIntent::Order,
        start_statuses: START_STATUSES,
    },
    // An event records the performance of an order and keeps the order's intent.
    PhaseRule {
        phase: PhaseName::Event,
        predecessors: &[PhaseName::Order],
        predecessor_intents: &[RequestIntent::Order],
        target_intent: RequestIntent::Order,
        start_statuses: START_STATUSES,
    },
];

/// Look up the rule for a phase.
pub fn rule(phase: PhaseName) -> &'static PhaseRule {
    match phase {
        PhaseName::Proposal => &RULES[0],
        PhaseName::Plan => &RULES[1],
        PhaseName::Order => &RULES[2],
        PhaseName::Event => &RULES[3],
    }
}

/// All rules, in workflow order.
pub fn rules() -> &'static [PhaseRule] {
    &RULES
}

impl PhaseRule {
    /// Returns true for a phase that starts a workflow rather than continuing one.
    pub fn is_root(&self) -> bool {
        self.predecessors.is_empty()
    }

    pub fn accepts_phase(&self, phase: PhaseName) -> bool {
        self.predecessors.contains(&phase)
    }

    pub fn accepts_intent(&self, intent: RequestIntent) -> bool {
        self.predecessor_intents.contains(&intent)
    }

    pub fn accepts_start_status(&self, status: RequestStatus) -> bool {
        self.start_statuses.contains(&status)
    }

    /// Phases this phase may advance into.
    pub fn successors(&self) -> Vec<PhaseName> {
        RULES
            .iter()
            .filter(|r| r.accepts_phase(self.phase))
            .map(|r| r.phase)
            .collect()
    }
}
