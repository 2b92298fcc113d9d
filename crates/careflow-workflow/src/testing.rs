//! Fixtures and repository doubles shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use careflow_core::{RecordId, RepositoryError, Request, RequestIntent, RequestStatus, ResourceType};
use careflow_state::{InMemoryRepository, Repository, StoreResult};
use tracing_subscriber::EnvFilter;

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub(crate) fn request(id: &str, intent: RequestIntent, status: RequestStatus) -> Request {
    Request::builder()
        .resource_type(ResourceType::ServiceRequest)
        .id(id)
        .intent(intent)
        .status(status)
        .subject("Patient/42")
        .code("http://snomed.info/sct|73761001")
        .requester("Practitioner/7")
        .build()
        .unwrap()
}

/// Create a record in the store and return it as stored.
pub(crate) async fn seed(
    store: &InMemoryRepository,
    id: &str,
    intent: RequestIntent,
    status: RequestStatus,
) -> Request {
    store.create(request(id, intent, status)).await.unwrap()
}

/// Fails every call and counts them.
pub(crate) struct FailingRepository {
    calls: AtomicUsize,
}

impl FailingRepository {
    pub(crate) fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> StoreResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }
}

#[async_trait]
impl Repository for FailingRepository {
    async fn read(&self, _resource_type: ResourceType, _id: &RecordId) -> StoreResult<Option<Request>> {
        self.fail()
    }

    async fn create(&self, _record: Request) -> StoreResult<Request> {
        self.fail()
    }

    async fn update(&self, _record: Request) -> StoreResult<Request> {
        self.fail()
    }
}

/// Accepts creates and reads but fails every update. Uses the sequential
/// `commit_transition` default.
pub(crate) struct FailingUpdateRepository {
    inner: InMemoryRepository,
}

impl FailingUpdateRepository {
    pub(crate) fn new() -> Self {
        Self {
            inner: InMemoryRepository::new(),
        }
    }

    pub(crate) fn inner(&self) -> &InMemoryRepository {
        &self.inner
    }
}

#[async_trait]
impl Repository for FailingUpdateRepository {
    async fn read(&self, resource_type: ResourceType, id: &RecordId) -> StoreResult<Option<Request>> {
        self.inner.read(resource_type, id).await
    }

    async fn create(&self, record: Request) -> StoreResult<Request> {
        self.inner.create(record).await
    }

    async fn update(&self, _record: Request) -> StoreResult<Request> {
        Err(RepositoryError::Unavailable("write timeout".to_string()))
    }
}

/// Acknowledges creates without storing them.
pub(crate) struct DroppingRepository {
    inner: InMemoryRepository,
}

impl DroppingRepository {
    pub(crate) fn new() -> Self {
        Self {
            inner: InMemoryRepository::new(),
        }
    }

    pub(crate) fn inner(&self) -> &InMemoryRepository {
        &self.inner
    }
}

#[async_trait]
impl Repository for DroppingRepository {
    async fn read(&self, resource_type: ResourceType, id: &RecordId) -> StoreResult<Option<Request>> {
        self.inner.read(resource_type, id).await
    }

    async fn create(&self, mut record: Request) -> StoreResult<Request> {
        record.version = 1;
        Ok(record)
    }

    async fn update(&self, record: Request) -> StoreResult<Request> {
        self.inner.update(record).await
    }
}
