//! Collection binding state machine and forwarding handle.
//!
//! # Responsibility
//! - Decide between creating, creating beside, affiliating or aborting.
//! - Expose schema/row operations of the bound collection.
//!
//! # Invariants
//! - Only the first `bind_*` call on an instance is evaluated.
//! - Personal storage is created at binding and dropped with the manager.
//! - Plain operations return an empty container on failure; `try_*`
//!   twins report the cause.

use crate::config::ShareConfig;
use crate::model::collection::{Accessibility, CollectionState, Designator};
use crate::model::identifier::{
    is_valid_identifier, CollectionId, DataId, DesignatorId, INVALID_IDENTIFIER,
};
use crate::model::value::Value;
use crate::registry::domain::{shared_memory_domain, StorageDomain};
use crate::registry::identifier_registry::Resolution;
use crate::storage::{
    ColumnBatch, MemoryStorage, RowBatch, StorageBackend, StorageError, StorageResult,
};
use log::{info, warn};
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub type ShareResult<T> = Result<T, ShareError>;

/// Errors surfaced by manager operations.
#[derive(Debug)]
pub enum ShareError {
    /// The manager is not bound to a collection.
    Unbound,
    Storage(StorageError),
}

impl ShareError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unbound => "unbound",
            Self::Storage(err) => err.code(),
        }
    }
}

impl Display for ShareError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unbound => write!(f, "manager is not bound to a collection"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ShareError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unbound => None,
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<StorageError> for ShareError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

/// Access-mode flags fixed at construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerOptions {
    /// Never publish the collection name; refuse to affiliate with a
    /// discoverable collection.
    pub as_private: bool,
    /// Always end up with a fresh collection, even on a name collision.
    pub as_unique: bool,
    /// Keep data in a storage instance owned by this manager alone.
    pub in_personal_storage: bool,
}

impl ManagerOptions {
    pub fn private() -> Self {
        Self {
            as_private: true,
            ..Self::default()
        }
    }

    pub fn unique() -> Self {
        Self {
            as_unique: true,
            ..Self::default()
        }
    }

    pub fn personal() -> Self {
        Self {
            in_personal_storage: true,
            ..Self::default()
        }
    }

    fn accessibility(self) -> Accessibility {
        Accessibility::from_private_flag(self.as_private)
    }
}

/// Outcome recorded after the single binding attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Binding {
    state: CollectionState,
    collection: CollectionId,
}

enum Decision {
    Bound(CollectionState, CollectionId),
    Refused(&'static str),
}

/// Handle binding one client to one shared tabular collection.
pub struct CollectionManager<B: StorageBackend = MemoryStorage> {
    shared: Arc<StorageDomain<B>>,
    options: ManagerOptions,
    config: ShareConfig,
    attempted: AtomicBool,
    domain: OnceCell<Arc<StorageDomain<B>>>,
    binding: OnceCell<Binding>,
}

impl CollectionManager<MemoryStorage> {
    /// Creates a manager over the process-wide default domain.
    pub fn new(options: ManagerOptions) -> Self {
        Self::with_domain(shared_memory_domain(), options)
    }
}

impl<B: StorageBackend> CollectionManager<B> {
    /// Creates a manager sharing `domain` with every other manager given it.
    pub fn with_domain(domain: Arc<StorageDomain<B>>, options: ManagerOptions) -> Self {
        Self {
            shared: domain,
            options,
            config: ShareConfig::default(),
            attempted: AtomicBool::new(false),
            domain: OnceCell::new(),
            binding: OnceCell::new(),
        }
    }

    /// Replaces the container capacity hints.
    pub fn with_config(mut self, config: ShareConfig) -> Self {
        self.config = config;
        self
    }

    pub fn options(&self) -> ManagerOptions {
        self.options
    }

    pub fn is_private(&self) -> bool {
        self.options.as_private
    }

    pub fn is_unique(&self) -> bool {
        self.options.as_unique
    }

    pub fn is_in_personal_storage(&self) -> bool {
        self.options.in_personal_storage
    }

    pub fn is_valid_identifier(&self, id: CollectionId) -> bool {
        is_valid_identifier(id)
    }

    /// Identifier of the bound collection, `INVALID_IDENTIFIER` otherwise.
    pub fn collection_id(&self) -> CollectionId {
        self.binding
            .get()
            .map_or(INVALID_IDENTIFIER, |binding| binding.collection)
    }

    /// Recorded binding outcome; `None` before the first attempt completes.
    pub fn state(&self) -> Option<CollectionState> {
        self.binding.get().map(|binding| binding.state)
    }

    /// Binds to the collection published under `name`, creating it if absent.
    ///
    /// # Contract
    /// - Already attempted: `Aborted`.
    /// - Name unknown: `CreatedNew`; published unless `as_private`.
    /// - Name known, `as_unique`: `CreatedIuxta` on a fresh identifier.
    /// - Name known, `as_private`: `Aborted`.
    /// - Name known otherwise: `Affiliated`.
    /// - Storage failure: `Aborted`.
    pub fn bind_name(&self, name: &str) -> CollectionState {
        if self.attempted.swap(true, Ordering::AcqRel) {
            return self.refuse_rebind();
        }
        let result = self
            .binding_domain()
            .and_then(|domain| Ok((self.decide_by_name(&domain, name)?, domain)));
        self.finish("name", result)
    }

    /// Binds to an existing collection by identifier.
    ///
    /// # Contract
    /// - Already attempted, invalid or unknown identifier: `Aborted`.
    /// - `as_unique`: `CreatedIuxta` beside the target.
    /// - Target discoverable by name and `as_private`: `Aborted`.
    /// - Otherwise: `Affiliated`.
    pub fn bind_id(&self, collection: CollectionId) -> CollectionState {
        if self.attempted.swap(true, Ordering::AcqRel) {
            return self.refuse_rebind();
        }
        let result = self
            .binding_domain()
            .and_then(|domain| Ok((self.decide_by_id(&domain, collection)?, domain)));
        self.finish("identifier", result)
    }

    fn binding_domain(&self) -> StorageResult<Arc<StorageDomain<B>>> {
        if self.options.in_personal_storage {
            Ok(Arc::new(StorageDomain::independent()?))
        } else {
            Ok(Arc::clone(&self.shared))
        }
    }

    fn decide_by_name(&self, domain: &StorageDomain<B>, name: &str) -> StorageResult<Decision> {
        let accessibility = self.options.accessibility();
        let resolution = domain.registry().resolve_or_create(
            name,
            accessibility,
            self.options.as_unique,
            || domain.backend().create_collection(),
        )?;

        let decision = match resolution {
            Resolution::Created(id) => Decision::Bound(CollectionState::CreatedNew, id),
            Resolution::Existing(_) if self.options.as_unique => {
                Decision::Bound(CollectionState::CreatedIuxta, self.create_beside(domain)?)
            }
            Resolution::Existing(_) if self.options.as_private => {
                Decision::Refused("privacy_conflict")
            }
            Resolution::Existing(id) => Decision::Bound(CollectionState::Affiliated, id),
        };
        Ok(decision)
    }

    fn decide_by_id(
        &self,
        domain: &StorageDomain<B>,
        collection: CollectionId,
    ) -> StorageResult<Decision> {
        if !is_valid_identifier(collection) {
            return Ok(Decision::Refused("invalid_identifier"));
        }
        if !domain.backend().contains_collection(collection) {
            return Ok(Decision::Refused("unknown_collection"));
        }
        if self.options.as_unique {
            return Ok(Decision::Bound(
                CollectionState::CreatedIuxta,
                self.create_beside(domain)?,
            ));
        }

        let discoverable = domain
            .registry()
            .entry(collection)
            .is_some_and(|entry| entry.is_discoverable());
        if discoverable && self.options.as_private {
            return Ok(Decision::Refused("privacy_conflict"));
        }
        Ok(Decision::Bound(CollectionState::Affiliated, collection))
    }

    fn create_beside(&self, domain: &StorageDomain<B>) -> StorageResult<CollectionId> {
        domain
            .registry()
            .create_unnamed(self.options.accessibility(), true, || {
                domain.backend().create_collection()
            })
    }

    fn finish(
        &self,
        via: &str,
        result: StorageResult<(Decision, Arc<StorageDomain<B>>)>,
    ) -> CollectionState {
        let (binding, domain) = match result {
            Ok((Decision::Bound(state, collection), domain)) => {
                (Binding { state, collection }, Some(domain))
            }
            Ok((Decision::Refused(reason), _)) => {
                warn!(
                    "event=collection_bind module=manager status=aborted via={} reason={}",
                    via, reason
                );
                (self.aborted(), None)
            }
            Err(err) => {
                warn!(
                    "event=collection_bind module=manager status=aborted via={} reason=storage_failure error_code={} error={}",
                    via,
                    err.code(),
                    err
                );
                (self.aborted(), None)
            }
        };

        if let Some(domain) = domain {
            info!(
                "event=collection_bind module=manager status=ok via={} state={} collection_id={} backend={} personal={}",
                via,
                binding.state.as_str(),
                binding.collection,
                domain.backend().backend_name(),
                self.options.in_personal_storage
            );
            let _ = self.domain.set(domain);
        }
        let _ = self.binding.set(binding);
        binding.state
    }

    fn aborted(&self) -> Binding {
        Binding {
            state: CollectionState::Aborted,
            collection: INVALID_IDENTIFIER,
        }
    }

    fn refuse_rebind(&self) -> CollectionState {
        warn!(
            "event=collection_bind module=manager status=aborted reason=already_attempted collection_id={}",
            self.collection_id()
        );
        CollectionState::Aborted
    }

    fn bound(&self) -> ShareResult<(&StorageDomain<B>, CollectionId)> {
        match (self.domain.get(), self.binding.get()) {
            (Some(domain), Some(binding)) if binding.state.is_bound() => {
                Ok((domain.as_ref(), binding.collection))
            }
            _ => Err(ShareError::Unbound),
        }
    }

    /// Registers the collection's designators once.
    ///
    /// Returns identifiers in the order of `names`.
    pub fn try_add_designators<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> ShareResult<Vec<DesignatorId>> {
        let (domain, collection) = self.bound()?;
        let mut owned = Vec::with_capacity(names.len().max(self.config.expected_designators));
        owned.extend(names.iter().map(|name| name.as_ref().to_string()));
        Ok(domain.backend().add_designators(collection, &owned)?)
    }

    /// Like `try_add_designators`; empty when nothing was registered.
    pub fn add_designators<S: AsRef<str>>(&self, names: &[S]) -> Vec<DesignatorId> {
        self.or_empty("add_designators", self.try_add_designators(names))
    }

    /// Designators with names and inferred kinds, in registration order.
    pub fn try_designator_details(&self) -> ShareResult<Vec<Designator>> {
        let (domain, collection) = self.bound()?;
        Ok(domain.backend().designators(collection)?)
    }

    pub fn try_designators(&self) -> ShareResult<Vec<DesignatorId>> {
        Ok(self
            .try_designator_details()?
            .into_iter()
            .map(|designator| designator.id)
            .collect())
    }

    /// Designator identifiers in registration order; empty before registration.
    pub fn designators(&self) -> Vec<DesignatorId> {
        self.or_empty("get_designators", self.try_designators())
    }

    pub fn designator_names(&self) -> Vec<String> {
        self.or_empty(
            "get_designators",
            self.try_designator_details().map(|designators| {
                designators
                    .into_iter()
                    .map(|designator| designator.name)
                    .collect()
            }),
        )
    }

    /// Appends one row per batch position, all or nothing.
    ///
    /// Returned identifiers follow batch positions.
    pub fn try_add_data(&self, columns: &ColumnBatch) -> ShareResult<Vec<DataId>> {
        let (domain, collection) = self.bound()?;
        let ids = domain.backend().append_rows(collection, columns)?;
        let mut result = Vec::with_capacity(ids.len().max(self.config.expected_batch));
        result.extend(ids);
        Ok(result)
    }

    pub fn add_data(&self, columns: &ColumnBatch) -> Vec<DataId> {
        self.or_empty("add_data", self.try_add_data(columns))
    }

    /// Like `try_add_data` with columns keyed by designator name.
    pub fn try_add_data_by_name(
        &self,
        columns: &BTreeMap<String, Vec<Value>>,
    ) -> ShareResult<Vec<DataId>> {
        let designators = self.try_designator_details()?;
        let mut batch = ColumnBatch::new();
        for (name, values) in columns {
            let id = designators
                .iter()
                .find(|designator| &designator.name == name)
                .map(|designator| designator.id)
                .ok_or_else(|| StorageError::UnknownDesignatorName(name.clone()))?;
            batch.insert(id, values.clone());
        }
        self.try_add_data(&batch)
    }

    pub fn add_data_by_name(&self, columns: &BTreeMap<String, Vec<Value>>) -> Vec<DataId> {
        self.or_empty("add_data", self.try_add_data_by_name(columns))
    }

    /// Every row projected onto `designators`, positionally aligned.
    ///
    /// Any identifier outside the schema fails the whole call.
    pub fn try_get_data_of(&self, designators: &[DesignatorId]) -> ShareResult<RowBatch> {
        let (domain, collection) = self.bound()?;
        let rows = domain.backend().rows_of(collection, designators)?;
        let mut result = Vec::with_capacity(rows.len().max(self.config.expected_output));
        result.extend(rows);
        Ok(result)
    }

    pub fn get_data_of(&self, designators: &[DesignatorId]) -> RowBatch {
        self.or_empty("get_data_of", self.try_get_data_of(designators))
    }

    /// Values of rows `data` per designator, positionally aligned with `data`.
    ///
    /// Any identifier that names no row fails the whole call.
    pub fn try_get_data_by(&self, data: &[DataId]) -> ShareResult<ColumnBatch> {
        let (domain, collection) = self.bound()?;
        Ok(domain.backend().rows_by(collection, data)?)
    }

    pub fn get_data_by(&self, data: &[DataId]) -> ColumnBatch {
        self.or_empty("get_data_by", self.try_get_data_by(data))
    }

    pub fn try_row_count(&self) -> ShareResult<usize> {
        let (domain, collection) = self.bound()?;
        Ok(domain.backend().row_count(collection)?)
    }

    pub fn row_count(&self) -> usize {
        self.or_empty("row_count", self.try_row_count())
    }

    fn or_empty<T: Default>(&self, operation: &str, result: ShareResult<T>) -> T {
        result.unwrap_or_else(|err| {
            warn!(
                "event={} module=manager status=error collection_id={} error_code={} error={}",
                operation,
                self.collection_id(),
                err.code(),
                err
            );
            T::default()
        })
    }
}
