//! Name resolution and storage wiring shared by managers.
//!
//! # Responsibility
//! - Map human-chosen names to collection identifiers.
//! - Bundle one registry with one backend into an injectable domain.
//!
//! # Invariants
//! - At most one collection is created per published name.
//! - Private collections never appear in the name map.

pub mod domain;
pub mod identifier_registry;
