//! # Careflow State
//!
//! The repository port the phase engine persists through, and a versioned in-memory
//! implementation of it.

pub mod store;
pub mod subscription;
pub mod temporal;

pub use store::{CommittedTransition, InMemoryRepository, RecordEntry, Repository, StoreResult};
pub use subscription::{ChangeFilter, ChangeType, RecordChange, RecordSubscription, SubscriptionManager};
pub use temporal::StoreSnapshot;
