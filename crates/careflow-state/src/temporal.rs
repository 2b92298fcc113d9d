//! Point-in-time views of the record store.

use std::collections::HashMap;

use careflow_core::{Reference, Request};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Latest version of every record at one moment.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    /// Unique ID for this snapshot.
    pub id: Uuid,

    /// Store-wide write sequence at snapshot time.
    pub sequence: u64,

    /// Timestamp when the snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// All records at snapshot time.
    pub records: HashMap<Reference, Request>,
}

impl StoreSnapshot {
    /// Get a record from the snapshot.
    pub fn get(&self, reference: &Reference) -> Option<&Request> {
        self.records.get(reference)
    }

    /// All references in the snapshot, sorted.
    pub fn references(&self) -> Vec<&Reference> {
        let mut references: Vec<&Reference> = self.records.keys().collect();
        references.sort();
        references
    }

    /// Records based on the given reference.
    pub fn successors_of(&self, reference: &Reference) -> Vec<&Request> {
        self.records
            .values()
            .filter(|r| r.based_on.as_ref() == Some(reference))
            .collect()
    }

    /// Get the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careflow_core::{RequestIntent, RequestStatus, ResourceType};

    fn record(id: &str, based_on: Option<Reference>) -> Request {
        let mut builder = Request::builder()
            .resource_type(ResourceType::ServiceRequest)
            .id(id)
            .intent(RequestIntent::Order)
            .status(RequestStatus::Active);
        if let Some(reference) = based_on {
            builder = builder.based_on(reference);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_snapshot() {
        let plan = record("P1", None);
        let order = record("O1", Some(plan.as_reference()));

        let mut records = HashMap::new();
        records.insert(plan.as_reference(), plan.clone());
        records.insert(order.as_reference(), order.clone());

        let snapshot = StoreSnapshot {
            id: Uuid::new_v4(),
            sequence: 2,
            timestamp: Utc::now(),
            records,
        };

        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.get(&plan.as_reference()).is_some());
        assert_eq!(snapshot.successors_of(&plan.as_reference()), vec![&order]);
        assert_eq!(snapshot.references()[0].id.as_str(), "O1");
    }
}
