//! Identifier vocabulary shared by every layer.
//!
//! # Invariants
//! - `INVALID_IDENTIFIER` (`-1`) is the only sentinel value.
//! - Once handed out, a valid identifier is never reused by its issuer.

/// Opaque signed identifier. Validity is decided by sign alone.
pub type Identifier = i32;

/// Identifies one collection inside one storage backend.
pub type CollectionId = Identifier;
/// Identifies one designator inside one collection.
pub type DesignatorId = Identifier;
/// Identifies one row inside one collection.
pub type DataId = Identifier;

/// Universal "no identifier" sentinel.
pub const INVALID_IDENTIFIER: Identifier = -1;

/// Returns whether `id` may refer to something.
pub fn is_valid_identifier(id: Identifier) -> bool {
    id >= 0
}

#[cfg(test)]
mod tests {
    use super::{is_valid_identifier, INVALID_IDENTIFIER};

    #[test]
    fn only_non_negative_identifiers_are_valid() {
        assert!(!is_valid_identifier(INVALID_IDENTIFIER));
        assert!(!is_valid_identifier(i32::MIN));
        assert!(is_valid_identifier(0));
        assert!(is_valid_identifier(i32::MAX));
    }
}
