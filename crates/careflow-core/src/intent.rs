//! Request intent: the strength of commitment a record expresses.

use serde::{Deserialize, Serialize};

/// Commitment level of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestIntent {
    /// A suggestion, with no authorization to act.
    Proposal,
    /// An intention to act, not yet authorized.
    Plan,
    /// A directive from a protocol or policy.
    Directive,
    /// An authorized request to act.
    Order,
    /// One of several alternatives; only meaningful inside a group.
    Option,
}

impl RequestIntent {
    /// All intents, in declaration order.
    pub const ALL: [RequestIntent; 5] = [
        RequestIntent::Proposal,
        RequestIntent::Plan,
        RequestIntent::Directive,
        RequestIntent::Order,
        RequestIntent::Option,
    ];

    /// Rank in the commitment hierarchy. `Option` has no rank.
    pub fn commitment(&self) -> Option<u8> {
        match self {
            RequestIntent::Proposal => Some(0),
            RequestIntent::Plan | RequestIntent::Directive => Some(1),
            RequestIntent::Order => Some(2),
            RequestIntent::Option => None,
        }
    }

    /// Returns true if a record with this intent may be based on one with `predecessor`.
    ///
    /// Commitment never decreases along a derivation chain; equal commitment covers an
    /// event recording the performance of an order.
    pub fn may_derive_from(&self, predecessor: RequestIntent) -> bool {
        match (predecessor.commitment(), self.commitment()) {
            (Some(from), Some(to)) => from <= to,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestIntent::Proposal => "proposal",
            RequestIntent::Plan => "plan",
            RequestIntent::Directive => "directive",
            RequestIntent::Order => "order",
            RequestIntent::Option => "option",
        }
    }
}

impl std::fmt::Display for RequestIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
