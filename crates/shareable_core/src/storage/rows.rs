//! Append-only row storage of one collection.
//!
//! # Invariants
//! - Appends are serialized; row identifiers are gapless from `0`.
//! - Readers load a published snapshot and never wait on writers.
//! - A row becomes visible only after all of its values are written.

use super::batch::validate_batch;
use super::schema::SchemaField;
use super::{
    identifier_to_position, position_to_identifier, ColumnBatch, RowBatch, StorageError,
    StorageResult,
};
use crate::model::collection::Designator;
use crate::model::identifier::{DataId, DesignatorId};
use crate::model::value::{Value, ValueKind};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;

/// One published row; `values` follow designator registration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: DataId,
    pub values: Vec<Value>,
}

/// Published rows as immutable segments.
///
/// Segment lengths more than double from right to left, so a snapshot holds
/// at most `log2(len) + 1` segments and an append re-shares only the tail.
#[derive(Debug, Clone, Default)]
struct RowSnapshot {
    segments: Vec<Arc<[Arc<Row>]>>,
    len: usize,
    kinds: Vec<Option<ValueKind>>,
}

impl RowSnapshot {
    fn get(&self, mut position: usize) -> Option<&Arc<Row>> {
        for segment in &self.segments {
            if position < segment.len() {
                return segment.get(position);
            }
            position -= segment.len();
        }
        None
    }

    fn iter(&self) -> impl Iterator<Item = &Arc<Row>> {
        self.segments.iter().flat_map(|segment| segment.iter())
    }

    /// Next snapshot with `fresh` appended; tail segments merge into it.
    fn extended(&self, fresh: Vec<Arc<Row>>, kinds: Vec<Option<ValueKind>>) -> Self {
        let len = self.len + fresh.len();
        let mut segments = self.segments.clone();
        let mut keep = segments.len();
        let mut merged_len = fresh.len();
        while keep > 0 && segments[keep - 1].len() <= 2 * merged_len {
            keep -= 1;
            merged_len += segments[keep].len();
        }

        let mut merged = Vec::with_capacity(merged_len);
        for segment in segments.drain(keep..) {
            merged.extend(segment.iter().cloned());
        }
        merged.extend(fresh);
        if !merged.is_empty() {
            segments.push(Arc::from(merged));
        }

        Self {
            segments,
            len,
            kinds,
        }
    }
}

/// Copy-on-write row storage.
pub struct RowStore {
    published: ArcSwap<RowSnapshot>,
    append_lock: Mutex<()>,
}

impl Default for RowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RowStore {
    pub fn new() -> Self {
        Self {
            published: ArcSwap::from_pointee(RowSnapshot::default()),
            append_lock: Mutex::new(()),
        }
    }

    pub fn len(&self) -> usize {
        self.published.load().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Joins schema fields with the kinds inferred so far.
    pub fn designators(&self, fields: &[SchemaField]) -> Vec<Designator> {
        let snapshot = self.published.load();
        fields
            .iter()
            .enumerate()
            .map(|(position, field)| Designator {
                id: field.id,
                name: field.name.clone(),
                kind: snapshot.kinds.get(position).copied().flatten(),
            })
            .collect()
    }

    /// Appends the batch as new rows and publishes them together.
    pub fn append(
        &self,
        fields: &[SchemaField],
        batch: &ColumnBatch,
    ) -> StorageResult<Vec<DataId>> {
        let _guard = self.append_lock.lock();
        let designators = self.designators(fields);
        let validated = validate_batch(&designators, batch)?;

        let current = self.published.load_full();
        let mut fresh = Vec::with_capacity(validated.len);
        let mut ids = Vec::with_capacity(validated.len);
        for position in 0..validated.len {
            let id = position_to_identifier(current.len + position)?;
            fresh.push(Arc::new(Row {
                id,
                values: validated.row(position),
            }));
            ids.push(id);
        }

        let next = current.extended(fresh, validated.kinds);
        self.published.store(Arc::new(next));
        Ok(ids)
    }

    /// Projects every row onto `designators`.
    ///
    /// Fails on the first identifier outside the schema.
    pub fn rows_of(
        &self,
        fields: &[SchemaField],
        designators: &[DesignatorId],
    ) -> StorageResult<RowBatch> {
        let positions = designators
            .iter()
            .map(|id| field_position(fields, *id).ok_or(StorageError::UnknownDesignator(*id)))
            .collect::<StorageResult<Vec<_>>>()?;
        if positions.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = self.published.load();
        Ok(snapshot
            .iter()
            .map(|row| {
                positions
                    .iter()
                    .map(|position| row.values[*position].clone())
                    .collect()
            })
            .collect())
    }

    /// Reads `data` column-major for every designator.
    ///
    /// Fails on the first identifier that names no row.
    pub fn rows_by(&self, fields: &[SchemaField], data: &[DataId]) -> StorageResult<ColumnBatch> {
        if data.is_empty() {
            return Ok(ColumnBatch::new());
        }

        let snapshot = self.published.load();
        let rows = data
            .iter()
            .map(|id| {
                identifier_to_position(*id)
                    .and_then(|position| snapshot.get(position))
                    .ok_or(StorageError::UnknownData(*id))
            })
            .collect::<StorageResult<Vec<_>>>()?;

        Ok(fields
            .iter()
            .enumerate()
            .map(|(position, field)| {
                let column = rows.iter().map(|row| row.values[position].clone()).collect();
                (field.id, column)
            })
            .collect())
    }
}

fn field_position(fields: &[SchemaField], id: DesignatorId) -> Option<usize> {
    fields.iter().position(|field| field.id == id)
}
