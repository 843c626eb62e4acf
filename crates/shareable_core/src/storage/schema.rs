//! Write-once designator table of one collection.
//!
//! # Invariants
//! - The first successful `define` wins; later calls never mutate it.
//! - Designator names are unique; identifiers equal registration positions.

use super::{position_to_identifier, StorageError, StorageResult};
use crate::model::identifier::DesignatorId;
use once_cell::sync::OnceCell;
use std::collections::HashSet;

/// One registered designator of a `SchemaTable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub id: DesignatorId,
    pub name: String,
}

/// Compare-and-set designator storage.
#[derive(Debug, Default)]
pub struct SchemaTable {
    fields: OnceCell<Vec<SchemaField>>,
}

impl SchemaTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `names` once; returns their identifiers in input order.
    pub fn define(&self, names: &[String]) -> StorageResult<Vec<DesignatorId>> {
        if self.is_defined() {
            return Err(StorageError::SchemaAlreadyDefined);
        }
        let fields = build_fields(names)?;
        let ids = fields.iter().map(|field| field.id).collect();
        self.fields
            .set(fields)
            .map_err(|_| StorageError::SchemaAlreadyDefined)?;
        Ok(ids)
    }

    pub fn is_defined(&self) -> bool {
        self.fields.get().is_some()
    }

    /// Registered fields in order; empty before `define`.
    pub fn fields(&self) -> &[SchemaField] {
        self.fields.get().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn id_of(&self, name: &str) -> Option<DesignatorId> {
        self.fields()
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.id)
    }
}

/// Checks a designator batch and assigns positional identifiers.
pub(crate) fn build_fields(names: &[String]) -> StorageResult<Vec<SchemaField>> {
    validate_designator_names(names)?;
    names
        .iter()
        .enumerate()
        .map(|(position, name)| {
            Ok(SchemaField {
                id: position_to_identifier(position)?,
                name: name.clone(),
            })
        })
        .collect()
}

fn validate_designator_names(names: &[String]) -> StorageResult<()> {
    if names.is_empty() {
        return Err(StorageError::EmptyDesignatorBatch);
    }
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if name.trim().is_empty() {
            return Err(StorageError::EmptyDesignatorName);
        }
        if !seen.insert(name.as_str()) {
            return Err(StorageError::DuplicateDesignator(name.clone()));
        }
    }
    Ok(())
}
