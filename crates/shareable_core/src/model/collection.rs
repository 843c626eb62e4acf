//! Collection-level descriptors and binding outcomes.

use crate::model::identifier::DesignatorId;
use crate::model::value::ValueKind;
use serde::{Deserialize, Serialize};

/// Whether a collection's name is published in its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    /// Reachable only through its identifier.
    Private,
    /// Reachable through its name by any manager of the same domain.
    Shared,
}

impl Accessibility {
    pub fn from_private_flag(as_private: bool) -> Self {
        if as_private {
            Self::Private
        } else {
            Self::Shared
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Shared => "shared",
        }
    }
}

/// Terminal outcome of a binding attempt.
///
/// Every variant is terminal for the manager that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionState {
    /// No collection existed under the name; a fresh one was created.
    CreatedNew,
    /// A collection existed and `as_unique` minted a separate one beside it.
    /// Other managers can only reach it through its identifier.
    CreatedIuxta,
    /// Joined an existing collection, sharing its schema and rows.
    Affiliated,
    /// Rebinding, privacy conflict, unknown identifier or storage failure.
    Aborted,
}

impl CollectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreatedNew => "created_new",
            Self::CreatedIuxta => "created_iuxta",
            Self::Affiliated => "affiliated",
            Self::Aborted => "aborted",
        }
    }

    /// Returns whether the manager ended up bound to a collection.
    pub fn is_bound(self) -> bool {
        !matches!(self, Self::Aborted)
    }
}

/// Field specification of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Designator {
    pub id: DesignatorId,
    pub name: String,
    /// Inferred from the first non-null value stored for this designator.
    pub kind: Option<ValueKind>,
}
