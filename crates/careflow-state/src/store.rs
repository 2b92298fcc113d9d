//! Repository port and the in-memory record store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use careflow_core::{CommitStage, RecordId, Reference, RepositoryError, Request, ResourceType, TransitionError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::subscription::{ChangeFilter, ChangeType, RecordChange, RecordSubscription, SubscriptionManager};
use crate::temporal::StoreSnapshot;

/// Result type for repository operations.
pub type StoreResult<T> = std::result::Result<T, RepositoryError>;

/// Both records as stored after a committed transition.
#[derive(Debug, Clone)]
pub struct CommittedTransition {
    /// The newly created successor.
    pub successor: Request,

    /// The predecessor, now completed.
    pub predecessor: Request,
}

/// External store of request records keyed by (resource type, id).
///
/// Implementations must make a second concurrent transition against the same
/// predecessor fail rather than silently advance it twice: either by applying
/// [`Repository::commit_transition`] atomically, or by rejecting an `update` whose
/// `version` is stale.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Read the latest version of a record. Absence is `Ok(None)`, never an error.
    async fn read(&self, resource_type: ResourceType, id: &RecordId) -> StoreResult<Option<Request>>;

    /// Persist a new record. Returns it as stored, with its assigned version.
    async fn create(&self, record: Request) -> StoreResult<Request>;

    /// Persist a new version of an existing record. Returns it as stored.
    async fn update(&self, record: Request) -> StoreResult<Request>;

    /// Create `successor` and update `predecessor` as one unit.
    ///
    /// The default applies the two writes in order, successor first, so a failure
    /// between them leaves an orphaned successor and a still-active predecessor.
    async fn commit_transition(
        &self,
        successor: Request,
        predecessor: Request,
    ) -> careflow_core::Result<CommittedTransition> {
        let successor = self
            .create(successor)
            .await
            .map_err(|e| TransitionError::persistence(CommitStage::CreateSuccessor, e))?;
        let predecessor = self
            .update(predecessor)
            .await
            .map_err(|e| TransitionError::persistence(CommitStage::CompletePredecessor, e))?;

        Ok(CommittedTransition {
            successor,
            predecessor,
        })
    }
}

/// A stored version of a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordEntry {
    /// The record as of this version.
    pub record: Request,

    /// When this version was written.
    pub stored_at: DateTime<Utc>,

    /// Store-wide write sequence number.
    pub sequence: u64,
}

/// In-memory implementation of [`Repository`].
///
/// Every write appends a version; nothing is overwritten. Updates are checked against
/// the latest stored version.
#[derive(Clone)]
pub struct InMemoryRepository {
    /// Record storage: reference -> list of versions (append-only).
    records: Arc<RwLock<HashMap<Reference, Vec<RecordEntry>>>>,

    /// Store-wide write counter.
    sequence: Arc<RwLock<u64>>,

    /// Change notifications.
    subscriptions: SubscriptionManager,
}

impl InMemoryRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            sequence: Arc::new(RwLock::new(0)),
            subscriptions: SubscriptionManager::new(),
        }
    }

    /// Get the next sequence number.
    async fn next_sequence(&self) -> u64 {
        let mut sequence = self.sequence.write().await;
        *sequence += 1;
        *sequence
    }

    fn check_create(
        records: &HashMap<Reference, Vec<RecordEntry>>,
        record: &Request,
    ) -> StoreResult<()> {
        let reference = record.as_reference();
        if records.contains_key(&reference) {
            return Err(RepositoryError::Duplicate { reference });
        }
        Ok(())
    }

    fn check_update(
        records: &HashMap<Reference, Vec<RecordEntry>>,
        record: &Request,
    ) -> StoreResult<u64> {
        let reference = record.as_reference();
        let latest = records
            .get(&reference)
            .and_then(|versions| versions.last())
            .ok_or_else(|| RepositoryError::Missing {
                reference: reference.clone(),
            })?;

        let found = latest.record.version;
        if found != record.version {
            return Err(RepositoryError::Conflict {
                reference,
                expected: record.version,
                found,
            });
        }
        Ok(found)
    }

    fn append(
        records: &mut HashMap<Reference, Vec<RecordEntry>>,
        mut record: Request,
        version: u64,
        sequence: u64,
    ) -> Request {
        record.version = version;
        let entry = RecordEntry {
            record: record.clone(),
            stored_at: Utc::now(),
            sequence,
        };
        records
            .entry(record.as_reference())
            .or_insert_with(Vec::new)
            .push(entry);
        record
    }

    async fn publish(&self, change_type: ChangeType, record: &Request, previous: Option<&Request>) {
        self.subscriptions
            .publish(RecordChange {
                reference: record.as_reference(),
                change_type,
                record: record.clone(),
                previous_status: previous.map(|r| r.status),
                timestamp: Utc::now(),
            })
            .await;
    }

    /// All stored versions of a record, oldest first.
    pub async fn history(&self, reference: &Reference) -> Vec<RecordEntry> {
        let records = self.records.read().await;
        records.get(reference).cloned().unwrap_or_default()
    }

    /// The version of a record that was current at `timestamp`.
    pub async fn read_at(&self, reference: &Reference, timestamp: DateTime<Utc>) -> Option<Request> {
        let records = self.records.read().await;
        records
            .get(reference)?
            .iter()
            .rev()
            .find(|e| e.stored_at <= timestamp)
            .map(|e| e.record.clone())
    }

    /// Latest version of every record.
    pub async fn snapshot(&self) -> StoreSnapshot {
        let records = self.records.read().await;
        let sequence = *self.sequence.read().await;

        let latest: HashMap<Reference, Request> = records
            .iter()
            .filter_map(|(reference, versions)| {
                versions
                    .last()
                    .map(|e| (reference.clone(), e.record.clone()))
            })
            .collect();

        StoreSnapshot {
            id: Uuid::new_v4(),
            sequence,
            timestamp: Utc::now(),
            records: latest,
        }
    }

    /// Subscribe to record changes matching a filter.
    pub fn subscribe(&self, filter: ChangeFilter) -> RecordSubscription {
        self.subscriptions.subscribe(filter)
    }

    /// Number of distinct records held.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true if no record has been created.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Store-wide write count.
    pub async fn sequence(&self) -> u64 {
        *self.sequence.read().await
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn read(&self, resource_type: ResourceType, id: &RecordId) -> StoreResult<Option<Request>> {
        let records = self.records.read().await;
        let reference = Reference::new(resource_type, id.clone());

        Ok(records
            .get(&reference)
            .and_then(|versions| versions.last())
            .map(|e| e.record.clone()))
    }

    async fn create(&self, record: Request) -> StoreResult<Request> {
        let stored = {
            let mut records = self.records.write().await;
            Self::check_create(&records, &record)?;
            let sequence = self.next_sequence().await;
            Self::append(&mut records, record, 1, sequence)
        };

        tracing::debug!(reference = %stored.as_reference(), "record created");
        self.publish(ChangeType::Created, &stored, None).await;

        Ok(stored)
    }

    async fn update(&self, record: Request) -> StoreResult<Request> {
        let (stored, previous) = {
            let mut records = self.records.write().await;
            let current = Self::check_update(&records, &record)?;
            let previous = records
                .get(&record.as_reference())
                .and_then(|versions| versions.last())
                .map(|e| e.record.clone());
            let sequence = self.next_sequence().await;
            (Self::append(&mut records, record, current + 1, sequence), previous)
        };

        tracing::debug!(
            reference = %stored.as_reference(),
            version = stored.version,
            "record updated"
        );
        self.publish(ChangeType::Updated, &stored, previous.as_ref()).await;

        Ok(stored)
    }

    async fn commit_transition(
        &self,
        successor: Request,
        predecessor: Request,
    ) -> careflow_core::Result<CommittedTransition> {
        let (committed, previous) = {
            let mut records = self.records.write().await;

            // Validate both writes before applying either.
            Self::check_create(&records, &successor)
                .map_err(|e| TransitionError::persistence(CommitStage::Transaction, e))?;
            let current = Self::check_update(&records, &predecessor)
                .map_err(|e| TransitionError::persistence(CommitStage::Transaction, e))?;
            let previous = records
                .get(&predecessor.as_reference())
                .and_then(|versions| versions.last())
                .map(|e| e.record.clone());

            let sequence = self.next_sequence().await;
            let successor = Self::append(&mut records, successor, 1, sequence);
            let sequence = self.next_sequence().await;
            let predecessor = Self::append(&mut records, predecessor, current + 1, sequence);

            (
                CommittedTransition {
                    successor,
                    predecessor,
                },
                previous,
            )
        };

        tracing::debug!(
            successor = %committed.successor.as_reference(),
            predecessor = %committed.predecessor.as_reference(),
            "transition committed"
        );
        self.publish(ChangeType::Created, &committed.successor, None).await;
        self.publish(ChangeType::Updated, &committed.predecessor, previous.as_ref())
            .await;

        Ok(committed)
    }
}
