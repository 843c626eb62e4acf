//! Injectable storage domain: one registry plus one backend.
//!
//! # Invariants
//! - The process-wide default domain is created at first use and lives
//!   until process exit.
//! - Independent domains share nothing with the default one.

use crate::registry::identifier_registry::IdentifierRegistry;
use crate::storage::{MemoryStorage, StorageBackend, StorageResult};
use once_cell::sync::Lazy;
use std::sync::Arc;

static SHARED_MEMORY_DOMAIN: Lazy<Arc<StorageDomain<MemoryStorage>>> =
    Lazy::new(|| Arc::new(StorageDomain::new(MemoryStorage::new())));

/// Registry and backend that managers of one sharing scope hold in common.
pub struct StorageDomain<B: StorageBackend> {
    registry: IdentifierRegistry,
    backend: B,
}

impl<B: StorageBackend> StorageDomain<B> {
    pub fn new(backend: B) -> Self {
        Self {
            registry: IdentifierRegistry::new(),
            backend,
        }
    }

    /// Builds a domain over a freshly constructed independent backend.
    pub fn independent() -> StorageResult<Self> {
        Ok(Self::new(B::independent()?))
    }

    pub fn registry(&self) -> &IdentifierRegistry {
        &self.registry
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

/// Returns the process-wide default domain.
pub fn shared_memory_domain() -> Arc<StorageDomain<MemoryStorage>> {
    Arc::clone(&SHARED_MEMORY_DOMAIN)
}
