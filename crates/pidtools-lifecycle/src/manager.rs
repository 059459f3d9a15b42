//! # DOI Lifecycle Manager
//!
//! Orchestrates the remote DOI state machine for content items:
//!
//! | Operation | Remote calls | Local effect on success |
//! |-----------|--------------|-------------------------|
//! | [`open_for_inspection`](LifecycleManager::open_for_inspection) | get | none |
//! | [`create_doi`](LifecycleManager::create_doi) | create | association set |
//! | [`update_doi`](LifecycleManager::update_doi) | get (best effort), update | association refreshed |
//! | [`change_state`](LifecycleManager::change_state) | update (`event` only) | cached state refreshed |
//! | [`delete_doi`](LifecycleManager::delete_doi) | get (best effort), delete | association cleared |
//!
//! Mutating operations never return a raw error. Every failure is reported
//! through `api_error` plus a failed `after_operation` event and returned
//! as an [`OperationFailure`]. The local association is written only after
//! the remote call has succeeded; a write that fails at that point is
//! reported as [`LifecycleError::Desynchronized`].
//!
//! Transitions are never validated locally. The registration service owns
//! the state machine and rejects what it does not accept.

use std::collections::BTreeSet;
use std::sync::Arc;

use pidtools_client::{DoiDocument, DoiRecord, DoiRepository, Tombstone};
use pidtools_core::{
    changed_fields, Attributes, CandidateMetadata, ContentItemId, DiffPolicy, Doi, DoiAction,
    DoiState, MetadataValue, StateEvent,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::assembler::MetadataAssembler;
use crate::association::{AssociationStore, LocalAssociation};
use crate::error::{AssemblyError, LifecycleError, OperationFailure};
use crate::events::{EventListener, EventRegistry, LifecycleEvent, Operation};

/// Lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Registrant prefix sent on create, e.g. `10.1234`.
    pub prefix: String,
    #[serde(default)]
    pub diff_policy: DiffPolicy,
}

impl LifecycleConfig {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            diff_policy: DiffPolicy::default(),
        }
    }
}

/// Successful outcome of a lifecycle operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationSuccess {
    pub doi: Option<Doi>,
    pub state: Option<DoiState>,
    /// Fields still differing from the candidate after the operation.
    pub changed_fields: BTreeSet<String>,
    /// Fields the operation changed remotely (updates only).
    pub applied_changes: BTreeSet<String>,
    /// Remote attributes after the operation. For deletes, the attributes
    /// of the removed record.
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tombstone: Option<Tombstone>,
    pub message: String,
}

pub type OperationOutcome = Result<OperationSuccess, OperationFailure>;

/// Read-only view of an item's DOI status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Inspection {
    pub item: ContentItemId,
    pub doi: Option<Doi>,
    pub state: Option<DoiState>,
    pub candidate: CandidateMetadata,
    pub remote: Option<Attributes>,
    pub changed_fields: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tombstone: Option<Tombstone>,
    /// Actions worth offering. `Update` is dropped when nothing changed.
    pub available_actions: Vec<DoiAction>,
}

/// Drives DOI lifecycle operations for content items.
pub struct LifecycleManager {
    repository: Arc<dyn DoiRepository>,
    assembler: Arc<dyn MetadataAssembler>,
    associations: Arc<dyn AssociationStore>,
    events: EventRegistry,
    config: LifecycleConfig,
}

impl std::fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("config", &self.config)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl LifecycleManager {
    pub fn new(
        repository: Arc<dyn DoiRepository>,
        assembler: Arc<dyn MetadataAssembler>,
        associations: Arc<dyn AssociationStore>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            repository,
            assembler,
            associations,
            events: EventRegistry::new(),
            config,
        }
    }

    /// Share an existing registry, e.g. with a [`VersionManager`](crate::VersionManager).
    pub fn with_events(mut self, events: EventRegistry) -> Self {
        self.events = events;
        self
    }

    pub fn subscribe(&self, listener: Arc<dyn EventListener>) {
        self.events.subscribe(listener);
    }

    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// The association for `item`, or a 404 failure when there is none.
    pub fn association(&self, item: ContentItemId) -> Result<LocalAssociation, OperationFailure> {
        match self.associations.get(item) {
            Ok(Some(association)) => Ok(association),
            Ok(None) => Err(LifecycleError::NotAssociated(item).into()),
            Err(e) => Err(LifecycleError::from(e).into()),
        }
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// Assemble the candidate and, when the item has a DOI, fetch the remote
    /// record and diff it. Mutates nothing.
    pub async fn open_for_inspection(
        &self,
        item: ContentItemId,
    ) -> Result<Inspection, OperationFailure> {
        let association = self
            .associations
            .get(item)
            .map_err(|e| OperationFailure::from(LifecycleError::from(e)))?;
        let doi = association.map(|a| a.doi);
        let candidate = self
            .assembler
            .assemble(item, doi.as_ref())
            .map_err(|e| OperationFailure::from(LifecycleError::from(e)))?;

        let Some(doi) = doi else {
            return Ok(Inspection {
                item,
                doi: None,
                state: None,
                candidate,
                remote: None,
                changed_fields: BTreeSet::new(),
                tombstone: None,
                available_actions: Vec::new(),
            });
        };

        let record = match self.repository.get(&doi).await {
            Ok(record) => record,
            Err(e) => {
                let error = LifecycleError::from(e);
                self.report_fetch_failure(item, &doi, &error);
                return Err(error.into());
            }
        };

        let candidate_attributes = candidate
            .to_attributes()
            .map_err(|e| OperationFailure::from(LifecycleError::from(AssemblyError::from(e))))?;
        let changed = self.diff(&record.attributes, &candidate_attributes);
        let available_actions = record
            .state
            .available_actions()
            .into_iter()
            .filter(|action| *action != DoiAction::Update || !changed.is_empty())
            .collect();
        Ok(Inspection {
            item,
            doi: Some(doi),
            state: Some(record.state),
            candidate,
            remote: Some(record.attributes),
            changed_fields: changed,
            tombstone: record.tombstone,
            available_actions,
        })
    }

    // -----------------------------------------------------------------------
    // Mutating operations
    // -----------------------------------------------------------------------

    /// Register a new draft DOI for `item`.
    pub async fn create_doi(&self, item: ContentItemId) -> OperationOutcome {
        let result = self.create_inner(item).await;
        self.finish(Operation::Create, None, item, result)
    }

    /// Resend the full candidate metadata for `doi`.
    pub async fn update_doi(&self, item: ContentItemId, doi: &Doi) -> OperationOutcome {
        let result = self.update_inner(item, doi).await;
        self.finish(Operation::Update, Some(doi), item, result)
    }

    /// Submit a state event for `doi`. No metadata is resent.
    pub async fn change_state(
        &self,
        item: ContentItemId,
        doi: &Doi,
        event: StateEvent,
    ) -> OperationOutcome {
        let result = self.change_state_inner(item, doi, event).await;
        self.finish(Operation::StateChange, Some(doi), item, result)
    }

    /// Delete `doi` and clear the item's association.
    pub async fn delete_doi(&self, item: ContentItemId, doi: &Doi) -> OperationOutcome {
        let result = self.delete_inner(item, doi).await;
        self.finish(Operation::Delete, Some(doi), item, result)
    }

    /// Create a DOI when the item has none, otherwise update it.
    pub async fn save_metadata(&self, item: ContentItemId) -> OperationOutcome {
        match self.associations.get(item) {
            Ok(Some(association)) => self.update_doi(item, &association.doi).await,
            Ok(None) => self.create_doi(item).await,
            Err(e) => self.finish(Operation::Update, None, item, Err(e.into())),
        }
    }

    async fn create_inner(&self, item: ContentItemId) -> Result<OperationSuccess, LifecycleError> {
        if let Some(existing) = self.associations.get(item)? {
            return Err(LifecycleError::AlreadyAssociated {
                item,
                doi: existing.doi,
            });
        }
        let candidate = self.candidate_attributes(item, None)?;
        let target = self.assembler.target_url(item)?;

        self.events.emit(&LifecycleEvent::BeforeOperation {
            operation: Operation::Create,
            doi: None,
            item,
            context: json!({ "metadata": MetadataValue::attributes_to_json(&candidate) }),
        });

        let payload = DoiDocument::create(&self.config.prefix, candidate.clone(), Some(target));
        let record = self.repository.create(&payload).await?;
        self.record_association(Operation::Create, item, &record)?;

        self.events.emit(&LifecycleEvent::DoiCreated {
            doi: record.doi.clone(),
            item,
            metadata: record.attributes.clone(),
            state: record.state,
        });
        self.emit_success(Operation::Create, &record.doi, item, attributes_json(&record.attributes));
        tracing::info!(%item, doi = %record.doi, state = %record.state, "DOI created");

        let changed = self.diff(&record.attributes, &candidate);
        Ok(OperationSuccess {
            message: format!("DOI metadata registered successfully: DOI {}", record.doi),
            doi: Some(record.doi),
            state: Some(record.state),
            changed_fields: changed,
            applied_changes: BTreeSet::new(),
            attributes: record.attributes,
            tombstone: record.tombstone,
        })
    }

    async fn update_inner(
        &self,
        item: ContentItemId,
        doi: &Doi,
    ) -> Result<OperationSuccess, LifecycleError> {
        let candidate = self.candidate_attributes(item, Some(doi))?;
        let target = self.assembler.target_url(item)?;

        self.events.emit(&LifecycleEvent::BeforeOperation {
            operation: Operation::Update,
            doi: Some(doi.clone()),
            item,
            context: json!({ "metadata": MetadataValue::attributes_to_json(&candidate) }),
        });

        let old = self.fetch_best_effort(item, doi).await;
        let payload = DoiDocument::update(doi, candidate.clone(), Some(target));
        let record = self.repository.update(doi, &payload).await?;
        self.record_association(Operation::Update, item, &record)?;

        let applied = self.diff(&old, &candidate);
        self.events.emit(&LifecycleEvent::DoiUpdated {
            doi: record.doi.clone(),
            item,
            old_metadata: old,
            new_metadata: record.attributes.clone(),
            changed_fields: applied.clone(),
        });
        self.emit_success(Operation::Update, doi, item, attributes_json(&record.attributes));

        let changed = self.diff(&record.attributes, &candidate);
        if !changed.is_empty() {
            tracing::warn!(
                %item,
                %doi,
                changed = ?changed,
                "metadata still differs after a successful update"
            );
        }
        tracing::info!(%item, %doi, applied = ?applied, "DOI metadata updated");

        Ok(OperationSuccess {
            message: format!("DOI metadata updated successfully for DOI: {}", record.doi),
            doi: Some(record.doi),
            state: Some(record.state),
            changed_fields: changed,
            applied_changes: applied,
            attributes: record.attributes,
            tombstone: record.tombstone,
        })
    }

    async fn change_state_inner(
        &self,
        item: ContentItemId,
        doi: &Doi,
        event: StateEvent,
    ) -> Result<OperationSuccess, LifecycleError> {
        let candidate = self.candidate_attributes(item, Some(doi))?;
        let target = self.assembler.target_url(item)?;
        let old_state = self
            .associations
            .get(item)?
            .and_then(|a| a.state)
            .unwrap_or(DoiState::Draft);

        self.events.emit(&LifecycleEvent::BeforeOperation {
            operation: Operation::StateChange,
            doi: Some(doi.clone()),
            item,
            context: json!({ "event": event, "old_state": old_state }),
        });

        let payload = DoiDocument::event(doi, event, Some(target));
        let record = self.repository.update(doi, &payload).await?;
        self.record_association(Operation::StateChange, item, &record)?;

        if record.state != old_state {
            self.events.emit(&LifecycleEvent::DoiStateChanged {
                doi: record.doi.clone(),
                item,
                old_state,
                new_state: record.state,
                event,
            });
        }
        self.emit_success(
            Operation::StateChange,
            doi,
            item,
            json!({ "new_state": record.state, "event": event }),
        );
        tracing::info!(%item, %doi, %old_state, new_state = %record.state, %event, "DOI state updated");

        Ok(OperationSuccess {
            message: format!("DOI state updated successfully: {}", record.state),
            doi: Some(record.doi),
            state: Some(record.state),
            changed_fields: self.diff(&record.attributes, &candidate),
            applied_changes: BTreeSet::new(),
            attributes: record.attributes,
            tombstone: record.tombstone,
        })
    }

    async fn delete_inner(
        &self,
        item: ContentItemId,
        doi: &Doi,
    ) -> Result<OperationSuccess, LifecycleError> {
        let old = self.fetch_best_effort(item, doi).await;

        self.events.emit(&LifecycleEvent::BeforeOperation {
            operation: Operation::Delete,
            doi: Some(doi.clone()),
            item,
            context: json!({ "metadata": attributes_json(&old) }),
        });

        self.repository.delete(doi).await?;
        self.associations
            .clear(item)
            .map_err(|source| LifecycleError::Desynchronized {
                operation: Operation::Delete,
                doi: doi.clone(),
                source,
            })?;

        self.events.emit(&LifecycleEvent::DoiDeleted {
            doi: doi.clone(),
            item,
            metadata: old.clone(),
        });
        self.emit_success(
            Operation::Delete,
            doi,
            item,
            json!({ "deleted_metadata": attributes_json(&old) }),
        );
        tracing::info!(%item, %doi, "DOI deleted");

        Ok(OperationSuccess {
            message: format!("DOI deleted successfully: DOI {doi}"),
            doi: Some(doi.clone()),
            state: None,
            changed_fields: BTreeSet::new(),
            applied_changes: BTreeSet::new(),
            attributes: old,
            tombstone: None,
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn candidate_attributes(
        &self,
        item: ContentItemId,
        doi: Option<&Doi>,
    ) -> Result<Attributes, AssemblyError> {
        Ok(self.assembler.assemble(item, doi)?.to_attributes()?)
    }

    fn diff(&self, existing: &Attributes, candidate: &Attributes) -> BTreeSet<String> {
        changed_fields(existing, candidate, &self.config.diff_policy)
    }

    /// Fetch current remote attributes. A failure is reported through
    /// `api_error` and yields an empty mapping.
    async fn fetch_best_effort(&self, item: ContentItemId, doi: &Doi) -> Attributes {
        match self.repository.get(doi).await {
            Ok(record) => record.attributes,
            Err(e) => {
                self.report_fetch_failure(item, doi, &LifecycleError::from(e));
                Attributes::new()
            }
        }
    }

    fn report_fetch_failure(&self, item: ContentItemId, doi: &Doi, error: &LifecycleError) {
        tracing::debug!(%item, %doi, error = %error, "unable to fetch DOI record");
        self.events.emit(&LifecycleEvent::ApiError {
            operation: Operation::Get,
            doi: Some(doi.clone()),
            item,
            message: error.to_string(),
            http_code: error.http_code(),
        });
    }

    fn record_association(
        &self,
        operation: Operation,
        item: ContentItemId,
        record: &DoiRecord,
    ) -> Result<(), LifecycleError> {
        self.associations
            .set(LocalAssociation {
                item,
                doi: record.doi.clone(),
                state: Some(record.state),
            })
            .map_err(|source| LifecycleError::Desynchronized {
                operation,
                doi: record.doi.clone(),
                source,
            })
    }

    fn emit_success(
        &self,
        operation: Operation,
        doi: &Doi,
        item: ContentItemId,
        result: serde_json::Value,
    ) {
        self.events.emit(&LifecycleEvent::AfterOperation {
            operation,
            doi: Some(doi.clone()),
            item,
            success: true,
            result,
        });
    }

    /// Convert an operation result into its outcome, emitting the failure
    /// events when it failed.
    fn finish(
        &self,
        operation: Operation,
        doi: Option<&Doi>,
        item: ContentItemId,
        result: Result<OperationSuccess, LifecycleError>,
    ) -> OperationOutcome {
        let error = match result {
            Ok(success) => return Ok(success),
            Err(error) => error,
        };
        let failure = OperationFailure::from(&error);
        tracing::debug!(
            %operation,
            %item,
            doi = doi.map(Doi::as_str).unwrap_or(""),
            http_code = failure.http_code,
            error = %error,
            "DOI operation failed"
        );
        self.events.emit(&LifecycleEvent::ApiError {
            operation,
            doi: doi.cloned(),
            item,
            message: failure.message.clone(),
            http_code: failure.http_code,
        });
        self.events.emit(&LifecycleEvent::AfterOperation {
            operation,
            doi: doi.cloned(),
            item,
            success: false,
            result: json!({ "error": failure.message }),
        });
        Err(failure)
    }
}

fn attributes_json(attributes: &Attributes) -> serde_json::Value {
    MetadataValue::attributes_to_json(attributes)
}
