use super::{StorageError, StorageResult};
use crate::model::identifier::Identifier;
use std::sync::atomic::{AtomicI32, Ordering};

/// Thread-safe monotonic identifier generator.
///
/// Starts at `0` and refuses to wrap into the negative range.
#[derive(Debug, Default)]
pub struct IdGen {
    next_id: AtomicI32,
}

impl IdGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next unused identifier.
    pub fn get_next(&self) -> StorageResult<Identifier> {
        self.next_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                current.checked_add(1)
            })
            .map_err(|_| StorageError::IdentifiersExhausted)
    }
}
