//! Request records and the references that link them.
//!
//! A [`Request`] is a clinical instruction at some commitment level. Its domain content
//! is carried forward from phase to phase by [`Request::copy`]; only identity, intent,
//! status and provenance change along the way.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{Result, TransitionError};
use crate::intent::RequestIntent;
use crate::types::{Priority, RequestStatus};

/// Kind of request resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    ServiceRequest,
    MedicationRequest,
    DeviceRequest,
    NutritionOrder,
    CommunicationRequest,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::ServiceRequest => "ServiceRequest",
            ResourceType::MedicationRequest => "MedicationRequest",
            ResourceType::DeviceRequest => "DeviceRequest",
            ResourceType::NutritionOrder => "NutritionOrder",
            ResourceType::CommunicationRequest => "CommunicationRequest",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ServiceRequest" => Ok(ResourceType::ServiceRequest),
            "MedicationRequest" => Ok(ResourceType::MedicationRequest),
            "DeviceRequest" => Ok(ResourceType::DeviceRequest),
            "NutritionOrder" => Ok(ResourceType::NutritionOrder),
            "CommunicationRequest" => Ok(ResourceType::CommunicationRequest),
            other => Err(TransitionError::InvalidRecord {
                message: format!("Unknown resource type '{}'", other),
            }),
        }
    }
}

/// Logical identifier of a record within its resource type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Generate a fresh random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value reference to a record, compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reference {
    pub resource_type: ResourceType,
    pub id: RecordId,
}

impl Reference {
    pub fn new(resource_type: ResourceType, id: impl Into<RecordId>) -> Self {
        Self {
            resource_type,
            id: id.into(),
        }
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.id)
    }
}

impl FromStr for Reference {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, id) = s.split_once('/').ok_or_else(|| TransitionError::InvalidRecord {
            message: format!("Reference '{}' is not of the form Type/id", s),
        })?;

        if id.is_empty() || id.contains('/') {
            return Err(TransitionError::InvalidRecord {
                message: format!("Reference '{}' has an invalid id", s),
            });
        }

        Ok(Reference::new(kind.parse()?, id))
    }
}

/// A clinical request at some commitment level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Kind of resource.
    pub resource_type: ResourceType,

    /// Identity; immutable once created.
    pub id: RecordId,

    /// Store-assigned version. Zero until the record is first persisted.
    #[serde(default)]
    pub version: u64,

    /// Commitment level.
    pub intent: RequestIntent,

    /// Lifecycle state.
    pub status: RequestStatus,

    /// The predecessor this record was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub based_on: Option<Reference>,

    /// Urgency.
    #[serde(default)]
    pub priority: Priority,

    /// Who the request is for (e.g. "Patient/123").
    pub subject: Option<String>,

    /// What is being requested, as a code (e.g. a procedure or medication code).
    pub code: Option<String>,

    /// Who asked for it.
    pub requester: Option<String>,

    /// When this record was authored.
    pub authored_on: DateTime<Utc>,

    /// Free-text annotations.
    #[serde(default)]
    pub note: Vec<String>,

    /// Resource-specific fields.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Request {
    /// Create a new RequestBuilder.
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    pub fn intent(&self) -> RequestIntent {
        self.intent
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn based_on(&self) -> Option<&Reference> {
        self.based_on.as_ref()
    }

    /// Set the status in place. Only observable once the record is persisted.
    pub fn set_status(&mut self, status: RequestStatus) {
        self.status = status;
    }

    /// Returns true once the store has assigned a version.
    pub fn is_persisted(&self) -> bool {
        self.version > 0
    }

    /// Derive a new record carrying this record's domain content.
    ///
    /// The copy gets the given identity, status and intent, an unset `based_on`, a fresh
    /// `authored_on`, and version zero. The receiver is not modified.
    pub fn copy(&self, id: RecordId, status: RequestStatus, intent: RequestIntent) -> Request {
        Request {
            resource_type: self.resource_type,
            id,
            version: 0,
            intent,
            status,
            based_on: None,
            priority: self.priority,
            subject: self.subject.clone(),
            code: self.code.clone(),
            requester: self.requester.clone(),
            authored_on: Utc::now(),
            note: self.note.clone(),
            payload: self.payload.clone(),
        }
    }

    /// Value reference usable in another record's `based_on`.
    pub fn as_reference(&self) -> Reference {
        Reference::new(self.resource_type, self.id.clone())
    }

    /// Record the predecessor this record is derived from.
    ///
    /// Linking is idempotent. A persisted record's provenance is fixed: relinking it to a
    /// different predecessor fails.
    pub fn link_to(&mut self, predecessor: Reference) -> Result<()> {
        match &self.based_on {
            Some(existing) if *existing == predecessor => Ok(()),
            Some(existing) if self.is_persisted() => Err(TransitionError::InvalidRecord {
                message: format!(
                    "{} is already based on {} and cannot be relinked to {}",
                    self.as_reference(),
                    existing,
                    predecessor
                ),
            }),
            _ => {
                self.based_on = Some(predecessor);
                Ok(())
            }
        }
    }

    /// Builder-style variant of [`Request::link_to`] for unpersisted drafts.
    pub fn with_based_on(mut self, predecessor: Reference) -> Self {
        self.based_on = Some(predecessor);
        self
    }

    /// SHA-256 over the record's identity, state and domain content, hex encoded.
    ///
    /// The store-assigned version is excluded.
    pub fn content_hash(&self) -> String {
        let content = serde_json::json!({
            "resource_type": self.resource_type,
            "id": self.id,
            "intent": self.intent,
            "status": self.status,
            "based_on": self.based_on,
            "priority": self.priority,
            "subject": self.subject,
            "code": self.code,
            "requester": self.requester,
            "authored_on": self.authored_on,
            "note": self.note,
            "payload": self.payload,
        });

        let mut hasher = Sha256::new();
        hasher.update(content.to_string().as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

/// Builder for creating Requests with a fluent API.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    resource_type: Option<ResourceType>,
    id: Option<RecordId>,
    intent: Option<RequestIntent>,
    status: Option<RequestStatus>,
    based_on: Option<Reference>,
    priority: Priority,
    subject: Option<String>,
    code: Option<String>,
    requester: Option<String>,
    note: Vec<String>,
    payload: serde_json::Value,
}

impl RequestBuilder {
    /// Create a new RequestBuilder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the kind of resource.
    pub fn resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = Some(resource_type);
        self
    }

    /// Set an explicit id. A random id is generated otherwise.
    pub fn id(mut self, id: impl Into<RecordId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the intent. Defaults to proposal.
    pub fn intent(mut self, intent: RequestIntent) -> Self {
        self.intent = Some(intent);
        self
    }

    /// Set the status. Defaults to draft.
    pub fn status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn based_on(mut self, reference: Reference) -> Self {
        self.based_on = Some(reference);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn requester(mut self, requester: impl Into<String>) -> Self {
        self.requester = Some(requester.into());
        self
    }

    /// Add a note.
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note.push(note.into());
        self
    }

    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Build the Request.
    pub fn build(self) -> Result<Request> {
        let resource_type = self
            .resource_type
            .ok_or_else(|| TransitionError::InvalidRecord {
                message: "Resource type is required".to_string(),
            })?;

        let id = self.id.unwrap_or_else(RecordId::random);
        if id.as_str().trim().is_empty() {
            return Err(TransitionError::InvalidRecord {
                message: "Record id cannot be empty".to_string(),
            });
        }

        Ok(Request {
            resource_type,
            id,
            version: 0,
            intent: self.intent.unwrap_or(RequestIntent::Proposal),
            status: self.status.unwrap_or(RequestStatus::Draft),
            based_on: self.based_on,
            priority: self.priority,
            subject: self.subject,
            code: self.code,
            requester: self.requester,
            authored_on: Utc::now(),
            note: self.note,
            payload: self.payload,
        })
    }
}
