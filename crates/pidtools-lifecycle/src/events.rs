//! # Lifecycle Events
//!
//! Typed events fired synchronously, in-line with the operation that
//! triggers them. Listeners are registered on an [`EventRegistry`] owned by
//! the lifecycle manager; there is no global event bus.
//!
//! ## Envelope
//!
//! Every mutating operation emits `before_operation`, performs its remote
//! call, then either the operation-specific success event followed by
//! `after_operation(success = true)`, or `api_error` followed by
//! `after_operation(success = false)`.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use pidtools_core::{Attributes, ContentItemId, Doi, DoiState, StateEvent};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// Name of the lifecycle operation an envelope event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Fetch of the remote record (inspection and best-effort sub-fetches).
    Get,
    Create,
    Update,
    StateChange,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Create => "create",
            Self::Update => "update",
            Self::StateChange => "state_change",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LifecycleEvent
// ---------------------------------------------------------------------------

/// A lifecycle event. Serializes with a `type` tag carrying its name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    BeforeOperation {
        operation: Operation,
        doi: Option<Doi>,
        item: ContentItemId,
        context: serde_json::Value,
    },
    AfterOperation {
        operation: Operation,
        doi: Option<Doi>,
        item: ContentItemId,
        success: bool,
        result: serde_json::Value,
    },
    ApiError {
        operation: Operation,
        doi: Option<Doi>,
        item: ContentItemId,
        message: String,
        http_code: u16,
    },
    DoiCreated {
        doi: Doi,
        item: ContentItemId,
        metadata: Attributes,
        state: DoiState,
    },
    DoiUpdated {
        doi: Doi,
        item: ContentItemId,
        old_metadata: Attributes,
        new_metadata: Attributes,
        changed_fields: BTreeSet<String>,
    },
    DoiDeleted {
        doi: Doi,
        item: ContentItemId,
        metadata: Attributes,
    },
    DoiStateChanged {
        doi: Doi,
        item: ContentItemId,
        old_state: DoiState,
        new_state: DoiState,
        event: StateEvent,
    },
    #[serde(rename = "post_version_set")]
    VersionSet {
        item: ContentItemId,
        replaced_by: ContentItemId,
    },
    #[serde(rename = "post_version_removed")]
    VersionRemoved {
        item: ContentItemId,
        previous: Option<ContentItemId>,
    },
}

impl LifecycleEvent {
    /// The event name, as used in the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BeforeOperation { .. } => "before_operation",
            Self::AfterOperation { .. } => "after_operation",
            Self::ApiError { .. } => "api_error",
            Self::DoiCreated { .. } => "doi_created",
            Self::DoiUpdated { .. } => "doi_updated",
            Self::DoiDeleted { .. } => "doi_deleted",
            Self::DoiStateChanged { .. } => "doi_state_changed",
            Self::VersionSet { .. } => "post_version_set",
            Self::VersionRemoved { .. } => "post_version_removed",
        }
    }

    /// The content item the event concerns.
    pub fn item(&self) -> ContentItemId {
        match self {
            Self::BeforeOperation { item, .. }
            | Self::AfterOperation { item, .. }
            | Self::ApiError { item, .. }
            | Self::DoiCreated { item, .. }
            | Self::DoiUpdated { item, .. }
            | Self::DoiDeleted { item, .. }
            | Self::DoiStateChanged { item, .. }
            | Self::VersionSet { item, .. }
            | Self::VersionRemoved { item, .. } => *item,
        }
    }

    /// The DOI the event concerns, if any.
    pub fn doi(&self) -> Option<&Doi> {
        match self {
            Self::BeforeOperation { doi, .. }
            | Self::AfterOperation { doi, .. }
            | Self::ApiError { doi, .. } => doi.as_ref(),
            Self::DoiCreated { doi, .. }
            | Self::DoiUpdated { doi, .. }
            | Self::DoiDeleted { doi, .. }
            | Self::DoiStateChanged { doi, .. } => Some(doi),
            Self::VersionSet { .. } | Self::VersionRemoved { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// Receives lifecycle events.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &LifecycleEvent);
}

impl<F> EventListener for F
where
    F: Fn(&LifecycleEvent) + Send + Sync,
{
    fn on_event(&self, event: &LifecycleEvent) {
        self(event)
    }
}

/// Ordered set of listeners. Cloning shares the same listener list.
#[derive(Clone, Default)]
pub struct EventRegistry {
    listeners: Arc<RwLock<Vec<Arc<dyn EventListener>>>>,
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners run in registration order.
    pub fn subscribe(&self, listener: Arc<dyn EventListener>) {
        self.listeners.write().push(listener);
    }

    /// Deliver `event` to every listener.
    pub fn emit(&self, event: &LifecycleEvent) {
        // Snapshot so a listener may subscribe without deadlocking.
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.on_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}

/// Keeps every event in memory, for tests and embedding applications.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().clone()
    }

    /// Event names in emission order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(LifecycleEvent::name).collect()
    }

    /// Number of recorded events called `name`.
    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.name() == name).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventListener for RecordingListener {
    fn on_event(&self, event: &LifecycleEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Writes every event as a structured `tracing` event: the audit log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl EventListener for TracingListener {
    fn on_event(&self, event: &LifecycleEvent) {
        let item = event.item();
        let doi = event.doi().map(Doi::as_str).unwrap_or("");
        match event {
            LifecycleEvent::ApiError {
                operation,
                message,
                http_code,
                ..
            } => {
                tracing::warn!(
                    event = event.name(),
                    %operation,
                    %item,
                    doi,
                    http_code,
                    message = message.as_str(),
                    "DOI operation failed"
                );
            }
            LifecycleEvent::AfterOperation {
                operation, success, ..
            } => {
                tracing::info!(event = event.name(), %operation, %item, doi, success, "DOI operation finished");
            }
            LifecycleEvent::DoiStateChanged {
                old_state,
                new_state,
                event: state_event,
                ..
            } => {
                tracing::info!(
                    event = event.name(),
                    %item,
                    doi,
                    %old_state,
                    %new_state,
                    transition = %state_event,
                    "DOI state changed"
                );
            }
            LifecycleEvent::DoiUpdated { changed_fields, .. } => {
                tracing::info!(
                    event = event.name(),
                    %item,
                    doi,
                    changed = ?changed_fields,
                    "DOI metadata updated"
                );
            }
            _ => {
                tracing::debug!(event = event.name(), %item, doi, "lifecycle event");
            }
        }
    }
}
