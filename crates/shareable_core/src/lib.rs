//! In-process manager for shared, schema-uniform tabular collections.
//! Independent components register, discover and exchange collections by a
//! stable identifier without each owning a private copy of the data.

pub mod config;
pub mod logging;
pub mod model;
pub mod registry;
pub mod service;
pub mod storage;

pub use config::ShareConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::collection::{Accessibility, CollectionState, Designator};
pub use model::identifier::{
    is_valid_identifier, CollectionId, DataId, DesignatorId, Identifier, INVALID_IDENTIFIER,
};
pub use model::value::{Value, ValueKind};
pub use registry::domain::{shared_memory_domain, StorageDomain};
pub use registry::identifier_registry::{IdentifierRegistry, RegistryEntry, Resolution};
pub use service::collection_manager::{
    CollectionManager, ManagerOptions, ShareError, ShareResult,
};
pub use storage::{
    ColumnBatch, MemoryStorage, RowBatch, SqliteStorage, StorageBackend, StorageError,
    StorageResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
