//! Version links between content items.
//!
//! Marking item A as replaced by item B makes the assembler emit
//! `IsPreviousVersionOf` on A and `IsNewVersionOf` on B, once the other side
//! has a DOI. Changing a link does not touch remote records; the operator
//! updates the affected DOIs afterwards.

use std::sync::Arc;

use pidtools_core::ContentItemId;

use crate::association::VersionLinkStore;
use crate::error::{LifecycleError, OperationFailure};
use crate::events::{EventRegistry, LifecycleEvent};

/// Sets and clears "replaced by" links, emitting `post_version_*` events.
pub struct VersionManager {
    links: Arc<dyn VersionLinkStore>,
    events: EventRegistry,
}

impl VersionManager {
    pub fn new(links: Arc<dyn VersionLinkStore>, events: EventRegistry) -> Self {
        Self { links, events }
    }

    pub fn replaced_by(
        &self,
        item: ContentItemId,
    ) -> Result<Option<ContentItemId>, OperationFailure> {
        self.links
            .replaced_by(item)
            .map_err(|e| LifecycleError::from(e).into())
    }

    /// Mark `item` as replaced by `other`.
    pub fn set_replaced_by(
        &self,
        item: ContentItemId,
        other: ContentItemId,
    ) -> Result<(), OperationFailure> {
        if item == other {
            return Err(LifecycleError::SelfReplacement(item).into());
        }
        self.links
            .set_replaced_by(item, other)
            .map_err(LifecycleError::from)?;
        self.events.emit(&LifecycleEvent::VersionSet {
            item,
            replaced_by: other,
        });
        tracing::info!(%item, replaced_by = %other, "version link set");
        Ok(())
    }

    /// Remove the link, returning the item it pointed to.
    pub fn clear_replaced_by(
        &self,
        item: ContentItemId,
    ) -> Result<Option<ContentItemId>, OperationFailure> {
        let previous = self
            .links
            .clear_replaced_by(item)
            .map_err(LifecycleError::from)?;
        self.events.emit(&LifecycleEvent::VersionRemoved { item, previous });
        tracing::info!(%item, previous = ?previous, "version link removed");
        Ok(previous)
    }
}
