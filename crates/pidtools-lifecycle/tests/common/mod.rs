//! Shared test doubles for lifecycle integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pidtools_client::{DoiDocument, DoiRecord, DoiRepository, RepositoryError, RepositoryOperation};
use pidtools_core::{
    Attributes, CandidateMetadata, ContentItemId, Doi, DoiState, MetadataValue, ResourceTypes,
    StateEvent, Title,
};
use pidtools_lifecycle::{
    AssemblyError, InMemoryStore, LifecycleConfig, LifecycleManager, MetadataAssembler,
    RecordingListener,
};

pub const PREFIX: &str = "10.1234";

// ---------------------------------------------------------------------------
// FixedAssembler
// ---------------------------------------------------------------------------

/// Assembler returning a minimal candidate whose title can be changed
/// between calls.
#[derive(Debug)]
pub struct FixedAssembler {
    title: Mutex<String>,
}

impl FixedAssembler {
    pub fn new(title: &str) -> Self {
        Self {
            title: Mutex::new(title.to_string()),
        }
    }

    pub fn set_title(&self, title: &str) {
        *self.title.lock() = title.to_string();
    }
}

/// The candidate [`FixedAssembler`] builds for `title`.
pub fn candidate(title: &str, doi: Option<&Doi>) -> CandidateMetadata {
    CandidateMetadata {
        titles: vec![Title {
            title: title.to_string(),
            lang: Some("en".into()),
        }],
        descriptions: vec![],
        creators: vec![],
        publisher: "EHRI".into(),
        publication_year: 2024,
        dates: vec![],
        alternate_identifiers: vec![],
        formats: vec!["text/html".into()],
        subjects: vec![],
        types: ResourceTypes::default(),
        language: "en".into(),
        related_identifiers: vec![],
        related_items: vec![],
        version: "1".into(),
        url: doi.map(|d| format!("https://doi.org/{d}")),
    }
}

pub fn target_url(item: ContentItemId) -> String {
    format!("https://blog.example/?p={item}")
}

impl MetadataAssembler for FixedAssembler {
    fn assemble(
        &self,
        _item: ContentItemId,
        doi: Option<&Doi>,
    ) -> Result<CandidateMetadata, AssemblyError> {
        Ok(candidate(&self.title.lock(), doi))
    }

    fn target_url(&self, item: ContentItemId) -> Result<String, AssemblyError> {
        Ok(target_url(item))
    }
}

// ---------------------------------------------------------------------------
// FakeRepository
// ---------------------------------------------------------------------------

/// In-memory registration service enforcing the remote state machine:
/// create yields `draft`, events move one state, delete needs `draft`.
#[derive(Debug, Default)]
pub struct FakeRepository {
    records: Mutex<BTreeMap<String, DoiRecord>>,
    next_id: AtomicUsize,
    calls: Mutex<Vec<&'static str>>,
}

impl FakeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly.
    pub fn insert(&self, doi: &Doi, state: DoiState, attributes: Attributes) {
        let mut attributes = attributes;
        attributes.insert("state".into(), MetadataValue::text(state.as_str()));
        self.records.lock().insert(
            doi.to_string(),
            DoiRecord {
                doi: doi.clone(),
                state,
                attributes,
                tombstone: None,
            },
        );
    }

    pub fn state_of(&self, doi: &Doi) -> Option<DoiState> {
        self.records.lock().get(doi.as_str()).map(|r| r.state)
    }

    /// Remote calls made so far, by operation name.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    fn rejected(operation: RepositoryOperation, doi: &Doi, status: u16, body: &str) -> RepositoryError {
        RepositoryError::UnexpectedStatus {
            operation,
            doi: doi.to_string(),
            status,
            body: body.to_string(),
        }
    }
}

#[async_trait]
impl DoiRepository for FakeRepository {
    async fn get(&self, doi: &Doi) -> Result<DoiRecord, RepositoryError> {
        self.calls.lock().push("get");
        self.records
            .lock()
            .get(doi.as_str())
            .cloned()
            .ok_or_else(|| Self::rejected(RepositoryOperation::Get, doi, 404, "DOI not found"))
    }

    async fn create(&self, payload: &DoiDocument) -> Result<DoiRecord, RepositoryError> {
        self.calls.lock().push("create");
        let mut attributes = payload.data.attributes.clone();
        let prefix = attributes
            .remove("prefix")
            .and_then(|p| p.as_str().map(str::to_string))
            .unwrap_or_default();
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let doi = Doi::new(format!("{prefix}/fake{n}")).map_err(|e| {
            RepositoryError::UnexpectedStatus {
                operation: RepositoryOperation::Create,
                doi: String::new(),
                status: 422,
                body: e.to_string(),
            }
        })?;
        attributes.insert("doi".into(), MetadataValue::text(doi.as_str()));
        self.insert(&doi, DoiState::Draft, attributes);
        Ok(self.records.lock()[doi.as_str()].clone())
    }

    async fn update(&self, doi: &Doi, payload: &DoiDocument) -> Result<DoiRecord, RepositoryError> {
        self.calls.lock().push("update");
        let mut records = self.records.lock();
        let record = records.get_mut(doi.as_str()).ok_or_else(|| {
            Self::rejected(RepositoryOperation::Update, doi, 404, "DOI not found")
        })?;

        match payload.data.attributes.get("event").and_then(|e| e.as_str()) {
            Some(event) => {
                let next = event
                    .parse::<StateEvent>()
                    .ok()
                    .and_then(|event| record.state.expected_after(event))
                    .ok_or_else(|| {
                        Self::rejected(RepositoryOperation::Update, doi, 422, "invalid state transition")
                    })?;
                record.state = next;
            }
            None => {
                let mut attributes = payload.data.attributes.clone();
                attributes.insert("doi".into(), MetadataValue::text(doi.as_str()));
                record.attributes = attributes;
            }
        }
        record
            .attributes
            .insert("state".into(), MetadataValue::text(record.state.as_str()));
        Ok(record.clone())
    }

    async fn delete(&self, doi: &Doi) -> Result<(), RepositoryError> {
        self.calls.lock().push("delete");
        let mut records = self.records.lock();
        match records.get(doi.as_str()).map(|r| r.state) {
            None => Err(Self::rejected(RepositoryOperation::Delete, doi, 404, "DOI not found")),
            Some(DoiState::Draft) => {
                records.remove(doi.as_str());
                Ok(())
            }
            Some(_) => Err(Self::rejected(RepositoryOperation::Delete, doi, 405, "Method not allowed")),
        }
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub manager: LifecycleManager,
    pub store: InMemoryStore,
    pub assembler: Arc<FixedAssembler>,
    pub recorder: Arc<RecordingListener>,
}

pub fn harness(repository: Arc<dyn DoiRepository>) -> Harness {
    let store = InMemoryStore::new();
    let assembler = Arc::new(FixedAssembler::new("Report 2024"));
    let manager = LifecycleManager::new(
        repository,
        assembler.clone(),
        Arc::new(store.clone()),
        LifecycleConfig::new(PREFIX),
    );
    let recorder = Arc::new(RecordingListener::new());
    manager.subscribe(recorder.clone());
    Harness {
        manager,
        store,
        assembler,
        recorder,
    }
}

pub fn doi(value: &str) -> Doi {
    Doi::new(value).unwrap()
}
