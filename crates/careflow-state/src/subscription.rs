//! Record change subscriptions.

use careflow_core::{Reference, Request, RequestStatus, ResourceType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// A record change event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordChange {
    /// The record that changed.
    pub reference: Reference,

    /// Type of change.
    pub change_type: ChangeType,

    /// The record as stored by this change.
    pub record: Request,

    /// Status before the change (None for creations).
    pub previous_status: Option<RequestStatus>,

    /// Timestamp of the change.
    pub timestamp: DateTime<Utc>,
}

/// Type of record change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// New record created.
    Created,
    /// Existing record updated.
    Updated,
}

/// Filter for subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeFilter {
    /// Resource type to match.
    pub resource_type: Option<ResourceType>,

    /// Specific records to watch.
    pub references: Option<Vec<Reference>>,

    /// Change types to watch.
    pub change_types: Option<Vec<ChangeType>>,
}

impl ChangeFilter {
    /// Create a filter for one resource type.
    pub fn resource_type(resource_type: ResourceType) -> Self {
        Self {
            resource_type: Some(resource_type),
            ..Default::default()
        }
    }

    /// Create a filter for specific records.
    pub fn references(references: Vec<Reference>) -> Self {
        Self {
            references: Some(references),
            ..Default::default()
        }
    }

    /// Restrict to the given change types.
    pub fn with_change_types(mut self, change_types: Vec<ChangeType>) -> Self {
        self.change_types = Some(change_types);
        self
    }

    /// Check if an event matches this filter.
    pub fn matches(&self, event: &RecordChange) -> bool {
        if let Some(resource_type) = self.resource_type {
            if event.reference.resource_type != resource_type {
                return false;
            }
        }

        if let Some(ref references) = self.references {
            if !references.contains(&event.reference) {
                return false;
            }
        }

        if let Some(ref types) = self.change_types {
            if !types.contains(&event.change_type) {
                return false;
            }
        }

        true
    }
}

/// A subscription to record changes.
pub struct RecordSubscription {
    /// Unique ID for this subscription.
    pub id: Uuid,

    /// Filter for this subscription.
    pub filter: ChangeFilter,

    /// Receiver for events.
    receiver: broadcast::Receiver<RecordChange>,
}

impl RecordSubscription {
    /// Wait for the next change matching the filter.
    ///
    /// Returns `None` once the store is dropped. Events missed because the
    /// subscriber lagged are skipped.
    pub async fn next(&mut self) -> Option<RecordChange> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(subscription = %self.id, skipped, "subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next matching change without waiting.
    pub fn try_next(&mut self) -> Option<RecordChange> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

/// Manager for record subscriptions.
///
/// A subscription lives as long as its [`RecordSubscription`]; dropping it
/// unsubscribes.
#[derive(Clone)]
pub struct SubscriptionManager {
    sender: broadcast::Sender<RecordChange>,
}

impl SubscriptionManager {
    /// Create a new subscription manager.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1000);
        Self { sender }
    }

    /// Subscribe to record changes with a filter.
    pub fn subscribe(&self, filter: ChangeFilter) -> RecordSubscription {
        RecordSubscription {
            id: Uuid::new_v4(),
            filter,
            receiver: self.sender.subscribe(),
        }
    }

    /// Publish a record change.
    pub async fn publish(&self, event: RecordChange) {
        // Subscribers filter locally; no receivers is fine.
        let _ = self.sender.send(event);
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
