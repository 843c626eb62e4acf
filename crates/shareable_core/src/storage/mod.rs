//! Storage backend contract and concrete engines.
//!
//! # Responsibility
//! - Define the capability every physical store must expose.
//! - Provide an in-process engine and a SQLite-backed engine.
//!
//! # Invariants
//! - A collection's schema is written at most once.
//! - Rows are append-only; a failed batch leaves no row behind.
//! - Identifiers handed out are never negative and never reused.
//!
//! # Architecture
//!
//! ```text
//! CollectionManager ──> StorageDomain ──> IdentifierRegistry
//!                              │
//!                              └──> StorageBackend
//!                                    ▲          ▲
//!                               MemoryStorage  SqliteStorage
//! ```

use crate::model::collection::Designator;
use crate::model::identifier::{CollectionId, DataId, DesignatorId};
use crate::model::value::{Value, ValueKind};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod batch;
mod idgen;
pub mod memory;
pub mod rows;
pub mod schema;
pub mod sqlite;

pub use batch::{validate_batch, ValidatedBatch};
pub use idgen::IdGen;
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

/// Column-major batch: one value sequence per designator, all equally long.
pub type ColumnBatch = BTreeMap<DesignatorId, Vec<Value>>;

/// Row-major read result: one value sequence per requested designator.
pub type RowBatch = Vec<Vec<Value>>;

pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by storage backends.
#[derive(Debug)]
pub enum StorageError {
    UnknownCollection(CollectionId),
    SchemaAlreadyDefined,
    EmptyDesignatorBatch,
    EmptyDesignatorName,
    DuplicateDesignator(String),
    SchemaNotDefined,
    UnknownDesignator(DesignatorId),
    UnknownDesignatorName(String),
    MissingDesignator(DesignatorId),
    ColumnLengthMismatch {
        designator: DesignatorId,
        expected: usize,
        actual: usize,
    },
    TypeMismatch {
        designator: DesignatorId,
        expected: ValueKind,
        actual: ValueKind,
    },
    UnknownData(DataId),
    IdentifiersExhausted,
    Sqlite(rusqlite::Error),
    InvalidData(String),
}

impl StorageError {
    /// Stable snake_case code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownCollection(_) => "unknown_collection",
            Self::SchemaAlreadyDefined => "schema_already_defined",
            Self::EmptyDesignatorBatch => "empty_designator_batch",
            Self::EmptyDesignatorName => "empty_designator_name",
            Self::DuplicateDesignator(_) => "duplicate_designator",
            Self::SchemaNotDefined => "schema_not_defined",
            Self::UnknownDesignator(_) => "unknown_designator",
            Self::UnknownDesignatorName(_) => "unknown_designator_name",
            Self::MissingDesignator(_) => "missing_designator",
            Self::ColumnLengthMismatch { .. } => "column_length_mismatch",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::UnknownData(_) => "unknown_data",
            Self::IdentifiersExhausted => "identifiers_exhausted",
            Self::Sqlite(_) => "sqlite",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCollection(id) => write!(f, "collection not found: {id}"),
            Self::SchemaAlreadyDefined => write!(f, "designators are already defined"),
            Self::EmptyDesignatorBatch => write!(f, "designator batch must not be empty"),
            Self::EmptyDesignatorName => write!(f, "designator name must not be empty"),
            Self::DuplicateDesignator(name) => {
                write!(f, "designator name repeated in batch: {name}")
            }
            Self::SchemaNotDefined => write!(f, "collection has no designators yet"),
            Self::UnknownDesignator(id) => write!(f, "designator not found: {id}"),
            Self::UnknownDesignatorName(name) => write!(f, "designator not found: {name}"),
            Self::MissingDesignator(id) => write!(f, "batch lacks values for designator {id}"),
            Self::ColumnLengthMismatch {
                designator,
                expected,
                actual,
            } => write!(
                f,
                "designator {designator} carries {actual} values, expected {expected}"
            ),
            Self::TypeMismatch {
                designator,
                expected,
                actual,
            } => write!(
                f,
                "designator {designator} holds {expected} values, got {actual}"
            ),
            Self::UnknownData(id) => write!(f, "row not found: {id}"),
            Self::IdentifiersExhausted => write!(f, "identifier space exhausted"),
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid stored data: {message}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Capability contract of a physical collection store.
///
/// Implementations must be safe to share across threads: registry,
/// manager and readers all hold the backend behind an `Arc`.
pub trait StorageBackend: Send + Sync {
    /// Constructs an independent instance, used for personal storage.
    fn independent() -> StorageResult<Self>
    where
        Self: Sized;

    /// Short engine name for log events.
    fn backend_name(&self) -> &'static str;

    /// Creates an empty collection and returns its fresh identifier.
    fn create_collection(&self) -> StorageResult<CollectionId>;

    fn contains_collection(&self, collection: CollectionId) -> bool;

    /// Registers the collection's designators. Succeeds at most once.
    ///
    /// Returned identifiers follow the order of `names`.
    fn add_designators(
        &self,
        collection: CollectionId,
        names: &[String],
    ) -> StorageResult<Vec<DesignatorId>>;

    /// Lists designators in registration order; empty before registration.
    fn designators(&self, collection: CollectionId) -> StorageResult<Vec<Designator>>;

    /// Appends one row per batch position, all or nothing.
    ///
    /// Returned identifiers follow batch positions.
    fn append_rows(
        &self,
        collection: CollectionId,
        batch: &ColumnBatch,
    ) -> StorageResult<Vec<DataId>>;

    /// Reads every row projected onto `designators`, positionally aligned.
    fn rows_of(
        &self,
        collection: CollectionId,
        designators: &[DesignatorId],
    ) -> StorageResult<RowBatch>;

    /// Reads the rows `data` column-major, positionally aligned with `data`.
    fn rows_by(&self, collection: CollectionId, data: &[DataId]) -> StorageResult<ColumnBatch>;

    fn row_count(&self, collection: CollectionId) -> StorageResult<usize>;
}

/// Converts a zero-based position into an identifier.
pub(crate) fn position_to_identifier(position: usize) -> StorageResult<i32> {
    i32::try_from(position).map_err(|_| StorageError::IdentifiersExhausted)
}

/// Converts a valid identifier into a zero-based position.
pub(crate) fn identifier_to_position(id: i32) -> Option<usize> {
    usize::try_from(id).ok()
}
