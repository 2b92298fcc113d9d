//! # Careflow Core
//!
//! Core primitives for clinical request workflows.
//!
//! This crate provides the fundamental building blocks:
//! - [`Request`] - A clinical instruction at some commitment level
//! - [`RequestIntent`] - The commitment hierarchy (proposal, plan, order)
//! - [`RequestStatus`] - The per-record lifecycle
//! - [`TransitionError`] - Why a transition was refused

pub mod error;
pub mod intent;
pub mod record;
pub mod types;

// Re-exports for convenience
pub use error::{CommitStage, RepositoryError, Result, TransitionError};
pub use intent::RequestIntent;
pub use record::{RecordId, Reference, Request, RequestBuilder, ResourceType};
pub use types::*;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{CommitStage, RepositoryError, Result, TransitionError};
    pub use crate::intent::RequestIntent;
    pub use crate::record::{RecordId, Reference, Request, RequestBuilder, ResourceType};
    pub use crate::types::{PhaseName, Priority, RequestStatus};
}
