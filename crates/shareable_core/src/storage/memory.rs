//! In-process storage engine.
//!
//! # Responsibility
//! - Hold collections in memory for the lifetime of the instance.
//! - Let readers proceed without blocking on concurrent appends.
//!
//! # Invariants
//! - Collection identifiers come from one monotonic generator.
//! - Collections are never removed; they drop with the instance.

use super::rows::RowStore;
use super::schema::SchemaTable;
use super::{ColumnBatch, IdGen, RowBatch, StorageBackend, StorageError, StorageResult};
use crate::model::collection::Designator;
use crate::model::identifier::{CollectionId, DataId, DesignatorId};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Default)]
struct CollectionData {
    schema: SchemaTable,
    rows: RowStore,
}

/// Memory-backed `StorageBackend`.
#[derive(Default)]
pub struct MemoryStorage {
    ids: IdGen,
    collections: RwLock<BTreeMap<CollectionId, Arc<CollectionData>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection_count(&self) -> usize {
        self.collections.read().len()
    }

    fn collection(&self, collection: CollectionId) -> StorageResult<Arc<CollectionData>> {
        self.collections
            .read()
            .get(&collection)
            .cloned()
            .ok_or(StorageError::UnknownCollection(collection))
    }
}

impl StorageBackend for MemoryStorage {
    fn independent() -> StorageResult<Self> {
        Ok(Self::new())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn create_collection(&self) -> StorageResult<CollectionId> {
        let id = self.ids.get_next()?;
        self.collections
            .write()
            .insert(id, Arc::new(CollectionData::default()));
        Ok(id)
    }

    fn contains_collection(&self, collection: CollectionId) -> bool {
        self.collections.read().contains_key(&collection)
    }

    fn add_designators(
        &self,
        collection: CollectionId,
        names: &[String],
    ) -> StorageResult<Vec<DesignatorId>> {
        self.collection(collection)?.schema.define(names)
    }

    fn designators(&self, collection: CollectionId) -> StorageResult<Vec<Designator>> {
        let data = self.collection(collection)?;
        Ok(data.rows.designators(data.schema.fields()))
    }

    fn append_rows(
        &self,
        collection: CollectionId,
        batch: &ColumnBatch,
    ) -> StorageResult<Vec<DataId>> {
        let data = self.collection(collection)?;
        data.rows.append(data.schema.fields(), batch)
    }

    fn rows_of(
        &self,
        collection: CollectionId,
        designators: &[DesignatorId],
    ) -> StorageResult<RowBatch> {
        let data = self.collection(collection)?;
        data.rows.rows_of(data.schema.fields(), designators)
    }

    fn rows_by(&self, collection: CollectionId, data: &[DataId]) -> StorageResult<ColumnBatch> {
        let collection_data = self.collection(collection)?;
        collection_data
            .rows
            .rows_by(collection_data.schema.fields(), data)
    }

    fn row_count(&self, collection: CollectionId) -> StorageResult<usize> {
        Ok(self.collection(collection)?.rows.len())
    }
}
