//! In-process name -> collection identifier registry.

use crate::model::collection::Accessibility;
use crate::model::identifier::CollectionId;
use crate::storage::StorageResult;
use log::debug;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Registry metadata of one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Accessibility requested at creation.
    pub accessibility: Accessibility,
    /// Uniqueness requested at creation.
    pub unique: bool,
    /// Name under which the collection is published, if any.
    pub published_name: Option<String>,
}

impl RegistryEntry {
    /// Returns whether other managers can reach the collection by name.
    pub fn is_discoverable(&self) -> bool {
        self.published_name.is_some()
    }
}

/// Result of an atomic resolve-or-create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The name was already published for this collection.
    Existing(CollectionId),
    /// No collection was published under the name; this one was created.
    Created(CollectionId),
}

#[derive(Debug, Default)]
struct RegistryState {
    names: BTreeMap<String, CollectionId>,
    entries: BTreeMap<CollectionId, RegistryEntry>,
}

/// Name registry of one storage domain.
#[derive(Debug, Default)]
pub struct IdentifierRegistry {
    state: Mutex<RegistryState>,
}

impl IdentifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collection published under `name`.
    pub fn resolve(&self, name: &str) -> Option<CollectionId> {
        self.state.lock().names.get(name).copied()
    }

    /// Returns registry metadata of `collection`.
    pub fn entry(&self, collection: CollectionId) -> Option<RegistryEntry> {
        self.state.lock().entries.get(&collection).cloned()
    }

    /// Resolves `name`, creating the collection through `create` when absent.
    ///
    /// Lookup, creation and publication run in one critical section, so two
    /// racing first-time calls never both observe `Created`. The name is
    /// published only for `Accessibility::Shared`.
    ///
    /// # Errors
    /// - Returns the error of `create`; the registry is left untouched.
    pub fn resolve_or_create<F>(
        &self,
        name: &str,
        accessibility: Accessibility,
        unique: bool,
        create: F,
    ) -> StorageResult<Resolution>
    where
        F: FnOnce() -> StorageResult<CollectionId>,
    {
        let mut state = self.state.lock();
        if let Some(existing) = state.names.get(name) {
            return Ok(Resolution::Existing(*existing));
        }

        let id = create()?;
        let published_name = match accessibility {
            Accessibility::Shared => {
                state.names.insert(name.to_string(), id);
                Some(name.to_string())
            }
            Accessibility::Private => None,
        };
        state.entries.insert(
            id,
            RegistryEntry {
                accessibility,
                unique,
                published_name,
            },
        );
        debug!(
            "event=registry_create module=registry status=ok collection_id={} accessibility={}",
            id,
            accessibility.as_str()
        );

        Ok(Resolution::Created(id))
    }

    /// Creates a collection that is never published under any name.
    pub fn create_unnamed<F>(
        &self,
        accessibility: Accessibility,
        unique: bool,
        create: F,
    ) -> StorageResult<CollectionId>
    where
        F: FnOnce() -> StorageResult<CollectionId>,
    {
        let mut state = self.state.lock();
        let id = create()?;
        state.entries.insert(
            id,
            RegistryEntry {
                accessibility,
                unique,
                published_name: None,
            },
        );
        debug!(
            "event=registry_create module=registry status=ok collection_id={} accessibility={} published=false",
            id,
            accessibility.as_str()
        );
        Ok(id)
    }

    /// Returns published names in sorted order.
    pub fn published_names(&self) -> Vec<String> {
        self.state.lock().names.keys().cloned().collect()
    }

    /// Number of collections created through this registry.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
