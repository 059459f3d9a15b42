//! # Local Association Store
//!
//! Per-item local records: the DOI linked to a content item with a cached
//! copy of its remote state, and the item's "replaced by" version link.
//!
//! Storage is last-writer-wins keyed by content item id. The lifecycle
//! manager writes an association only after the remote call it reflects
//! has succeeded.
//!
//! Two implementations:
//! - [`InMemoryStore`]: `parking_lot::RwLock` over ordered maps.
//! - [`JsonFileStore`]: the same maps persisted to one JSON file, rewritten
//!   atomically on every mutation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use pidtools_core::{ContentItemId, Doi, DoiState};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// The DOI linked to a content item.
///
/// Exists exactly when a create has succeeded for the item and no delete
/// has succeeded since.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAssociation {
    pub item: ContentItemId,
    pub doi: Doi,
    /// Cached remote state, refreshed after every successful operation.
    #[serde(default)]
    pub state: Option<DoiState>,
}

/// Get/set/clear of [`LocalAssociation`]s keyed by content item.
pub trait AssociationStore: Send + Sync {
    fn get(&self, item: ContentItemId) -> Result<Option<LocalAssociation>, StoreError>;

    /// Insert or replace the association for `association.item`.
    fn set(&self, association: LocalAssociation) -> Result<(), StoreError>;

    /// Remove the association, returning what was stored.
    fn clear(&self, item: ContentItemId) -> Result<Option<LocalAssociation>, StoreError>;

    /// All associations, ordered by item id.
    fn list(&self) -> Result<Vec<LocalAssociation>, StoreError>;
}

/// "Item A is replaced by item B" links between content items.
pub trait VersionLinkStore: Send + Sync {
    fn replaced_by(&self, item: ContentItemId) -> Result<Option<ContentItemId>, StoreError>;

    fn set_replaced_by(&self, item: ContentItemId, other: ContentItemId)
        -> Result<(), StoreError>;

    /// Remove the link, returning the previous replacement.
    fn clear_replaced_by(&self, item: ContentItemId) -> Result<Option<ContentItemId>, StoreError>;

    /// Items replaced by `item`, i.e. its previous versions.
    fn replaces(&self, item: ContentItemId) -> Result<Vec<ContentItemId>, StoreError>;
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
struct StoreState {
    associations: BTreeMap<ContentItemId, LocalAssociation>,
    versions: BTreeMap<ContentItemId, ContentItemId>,
}

/// On-disk form. Lists rather than maps so item ids stay plain numbers.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    associations: Vec<LocalAssociation>,
    #[serde(default)]
    versions: Vec<VersionLink>,
}

#[derive(Debug, Serialize, Deserialize)]
struct VersionLink {
    item: ContentItemId,
    replaced_by: ContentItemId,
}

impl From<StoreFile> for StoreState {
    fn from(file: StoreFile) -> Self {
        Self {
            associations: file
                .associations
                .into_iter()
                .map(|a| (a.item, a))
                .collect(),
            versions: file
                .versions
                .into_iter()
                .map(|v| (v.item, v.replaced_by))
                .collect(),
        }
    }
}

impl From<&StoreState> for StoreFile {
    fn from(state: &StoreState) -> Self {
        Self {
            associations: state.associations.values().cloned().collect(),
            versions: state
                .versions
                .iter()
                .map(|(item, replaced_by)| VersionLink {
                    item: *item,
                    replaced_by: *replaced_by,
                })
                .collect(),
        }
    }
}

impl StoreState {
    fn replaces(&self, item: ContentItemId) -> Vec<ContentItemId> {
        self.versions
            .iter()
            .filter(|(_, replaced_by)| **replaced_by == item)
            .map(|(previous, _)| *previous)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// InMemoryStore
// ---------------------------------------------------------------------------

/// Thread-safe in-memory store. Cloning shares the underlying maps.
///
/// All operations are synchronous; the lock is never held across an
/// `.await`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssociationStore for InMemoryStore {
    fn get(&self, item: ContentItemId) -> Result<Option<LocalAssociation>, StoreError> {
        Ok(self.state.read().associations.get(&item).cloned())
    }

    fn set(&self, association: LocalAssociation) -> Result<(), StoreError> {
        self.state
            .write()
            .associations
            .insert(association.item, association);
        Ok(())
    }

    fn clear(&self, item: ContentItemId) -> Result<Option<LocalAssociation>, StoreError> {
        Ok(self.state.write().associations.remove(&item))
    }

    fn list(&self) -> Result<Vec<LocalAssociation>, StoreError> {
        Ok(self.state.read().associations.values().cloned().collect())
    }
}

impl VersionLinkStore for InMemoryStore {
    fn replaced_by(&self, item: ContentItemId) -> Result<Option<ContentItemId>, StoreError> {
        Ok(self.state.read().versions.get(&item).copied())
    }

    fn set_replaced_by(&self, item: ContentItemId, other: ContentItemId) -> Result<(), StoreError> {
        self.state.write().versions.insert(item, other);
        Ok(())
    }

    fn clear_replaced_by(&self, item: ContentItemId) -> Result<Option<ContentItemId>, StoreError> {
        Ok(self.state.write().versions.remove(&item))
    }

    fn replaces(&self, item: ContentItemId) -> Result<Vec<ContentItemId>, StoreError> {
        Ok(self.state.read().replaces(item))
    }
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// Store persisted to a single JSON file.
///
/// The file is read once on open and rewritten (write to a sibling temp
/// file, then rename) after each mutation. A missing file is an empty
/// store. A mutation whose write fails leaves the in-memory copy unchanged.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl JsonFileStore {
    /// Open the store at `path`, creating nothing until the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => StoreState::default(),
            Ok(raw) => {
                let file: StoreFile =
                    serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
                        path: path.clone(),
                        source,
                    })?;
                StoreState::from(file)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `f` to a copy of the state, persist it, then publish it.
    fn mutate<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> Result<R, StoreError> {
        let mut guard = self.state.write();
        let mut next = guard.clone();
        let result = f(&mut next);
        self.persist(&next)?;
        *guard = next;
        Ok(result)
    }

    fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        let io_error = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        let body = serde_json::to_vec_pretty(&StoreFile::from(state)).map_err(|source| {
            StoreError::Parse {
                path: self.path.clone(),
                source,
            }
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body).map_err(io_error)?;
        std::fs::rename(&tmp, &self.path).map_err(io_error)?;
        Ok(())
    }
}

impl AssociationStore for JsonFileStore {
    fn get(&self, item: ContentItemId) -> Result<Option<LocalAssociation>, StoreError> {
        Ok(self.state.read().associations.get(&item).cloned())
    }

    fn set(&self, association: LocalAssociation) -> Result<(), StoreError> {
        self.mutate(|s| {
            s.associations.insert(association.item, association);
        })
    }

    fn clear(&self, item: ContentItemId) -> Result<Option<LocalAssociation>, StoreError> {
        self.mutate(|s| s.associations.remove(&item))
    }

    fn list(&self) -> Result<Vec<LocalAssociation>, StoreError> {
        Ok(self.state.read().associations.values().cloned().collect())
    }
}

impl VersionLinkStore for JsonFileStore {
    fn replaced_by(&self, item: ContentItemId) -> Result<Option<ContentItemId>, StoreError> {
        Ok(self.state.read().versions.get(&item).copied())
    }

    fn set_replaced_by(&self, item: ContentItemId, other: ContentItemId) -> Result<(), StoreError> {
        self.mutate(|s| {
            s.versions.insert(item, other);
        })
    }

    fn clear_replaced_by(&self, item: ContentItemId) -> Result<Option<ContentItemId>, StoreError> {
        self.mutate(|s| s.versions.remove(&item))
    }

    fn replaces(&self, item: ContentItemId) -> Result<Vec<ContentItemId>, StoreError> {
        Ok(self.state.read().replaces(item))
    }
}
