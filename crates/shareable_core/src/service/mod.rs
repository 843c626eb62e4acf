//! Client-facing use-case layer.
//!
//! # Responsibility
//! - Bind one client to exactly one collection.
//! - Forward schema and row operations to the bound collection's storage.
//!
//! # Invariants
//! - A manager makes at most one binding attempt; every outcome is terminal.
//! - Service layer stays storage-agnostic through `StorageBackend`.

pub mod collection_manager;
