//! Shared data model for collections, designators and rows.
//!
//! # Responsibility
//! - Define identifiers, values and binding states used across core.
//! - Keep one vocabulary for storage backends and the manager layer.
//!
//! # Invariants
//! - Valid identifiers are never negative; `-1` is the invalid sentinel.
//! - Values are opaque tagged data; only their tag is ever inspected.

pub mod collection;
pub mod identifier;
pub mod value;
