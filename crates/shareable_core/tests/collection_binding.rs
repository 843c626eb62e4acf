use shareable_core::{
    CollectionManager, CollectionState, ColumnBatch, ManagerOptions, MemoryStorage,
    StorageDomain, Value, INVALID_IDENTIFIER,
};
use std::sync::Arc;

fn fresh_domain() -> Arc<StorageDomain<MemoryStorage>> {
    Arc::new(StorageDomain::new(MemoryStorage::new()))
}

fn manager(
    domain: &Arc<StorageDomain<MemoryStorage>>,
    options: ManagerOptions,
) -> CollectionManager<MemoryStorage> {
    CollectionManager::with_domain(Arc::clone(domain), options)
}

#[test]
fn first_bind_for_unseen_name_creates_new_collection() {
    let domain = fresh_domain();
    for options in [
        ManagerOptions::default(),
        ManagerOptions::private(),
        ManagerOptions::unique(),
    ] {
        let name = format!("orders-{}-{}", options.as_private, options.as_unique);
        let manager = manager(&domain, options);
        assert_eq!(manager.bind_name(&name), CollectionState::CreatedNew);
        assert!(manager.is_valid_identifier(manager.collection_id()));
        assert_eq!(manager.state(), Some(CollectionState::CreatedNew));
    }
    assert_eq!(domain.registry().len(), 3);
}

#[test]
fn second_shared_bind_affiliates_and_shares_data() {
    let domain = fresh_domain();
    let creator = manager(&domain, ManagerOptions::default());
    let joiner = manager(&domain, ManagerOptions::default());

    assert_eq!(creator.bind_name("orders"), CollectionState::CreatedNew);
    assert_eq!(joiner.bind_name("orders"), CollectionState::Affiliated);
    assert_eq!(creator.collection_id(), joiner.collection_id());

    let ids = creator.add_designators(&["sku", "qty"]);
    assert_eq!(joiner.designators(), ids);
    assert_eq!(joiner.designator_names(), vec!["sku", "qty"]);

    let mut rows = ColumnBatch::new();
    rows.insert(ids[0], vec![Value::from("a-1")]);
    rows.insert(ids[1], vec![Value::Integer(3)]);
    let data = joiner.add_data(&rows);
    assert_eq!(data.len(), 1);
    assert_eq!(creator.get_data_of(&ids), joiner.get_data_of(&ids));
    assert_eq!(creator.row_count(), 1);
}

#[test]
fn unique_bind_on_existing_name_creates_beside() {
    let domain = fresh_domain();
    let original = manager(&domain, ManagerOptions::default());
    assert_eq!(original.bind_name("orders"), CollectionState::CreatedNew);

    let unique = manager(&domain, ManagerOptions::unique());
    assert_eq!(unique.bind_name("orders"), CollectionState::CreatedIuxta);
    assert_ne!(unique.collection_id(), original.collection_id());

    let third = manager(&domain, ManagerOptions::default());
    assert_eq!(third.bind_name("orders"), CollectionState::Affiliated);
    assert_eq!(third.collection_id(), original.collection_id());
    assert_eq!(
        domain.registry().resolve("orders"),
        Some(original.collection_id())
    );

    let by_id = manager(&domain, ManagerOptions::default());
    assert_eq!(
        by_id.bind_id(unique.collection_id()),
        CollectionState::Affiliated
    );
}

#[test]
fn unique_private_bind_on_existing_name_creates_beside() {
    let domain = fresh_domain();
    let original = manager(&domain, ManagerOptions::default());
    assert_eq!(original.bind_name("orders"), CollectionState::CreatedNew);

    let options = ManagerOptions {
        as_private: true,
        as_unique: true,
        in_personal_storage: false,
    };
    let beside = manager(&domain, options);
    assert_eq!(beside.bind_name("orders"), CollectionState::CreatedIuxta);
    assert_ne!(beside.collection_id(), original.collection_id());
}

#[test]
fn private_bind_on_shared_name_aborts() {
    let domain = fresh_domain();
    let original = manager(&domain, ManagerOptions::default());
    assert_eq!(original.bind_name("orders"), CollectionState::CreatedNew);

    let private = manager(&domain, ManagerOptions::private());
    assert_eq!(private.bind_name("orders"), CollectionState::Aborted);
    assert_eq!(private.collection_id(), INVALID_IDENTIFIER);

    let private_by_id = manager(&domain, ManagerOptions::private());
    assert_eq!(
        private_by_id.bind_id(original.collection_id()),
        CollectionState::Aborted
    );
}

#[test]
fn private_collection_is_reachable_only_by_identifier() {
    let domain = fresh_domain();
    let owner = manager(&domain, ManagerOptions::private());
    assert_eq!(owner.bind_name("ledger"), CollectionState::CreatedNew);
    assert!(domain.registry().resolve("ledger").is_none());

    let by_name = manager(&domain, ManagerOptions::default());
    assert_eq!(by_name.bind_name("ledger"), CollectionState::CreatedNew);
    assert_ne!(by_name.collection_id(), owner.collection_id());

    let by_id = manager(&domain, ManagerOptions::private());
    assert_eq!(by_id.bind_id(owner.collection_id()), CollectionState::Affiliated);
    assert_eq!(by_id.collection_id(), owner.collection_id());
}

#[test]
fn second_bind_on_same_instance_always_aborts() {
    let domain = fresh_domain();
    let manager = manager(&domain, ManagerOptions::default());
    assert_eq!(manager.bind_name("orders"), CollectionState::CreatedNew);
    let bound_to = manager.collection_id();

    assert_eq!(manager.bind_name("orders"), CollectionState::Aborted);
    assert_eq!(manager.bind_name("other"), CollectionState::Aborted);
    assert_eq!(manager.bind_id(bound_to), CollectionState::Aborted);

    assert_eq!(manager.collection_id(), bound_to);
    assert_eq!(manager.state(), Some(CollectionState::CreatedNew));
    assert!(domain.registry().resolve("other").is_none());
}

#[test]
fn default_constructor_uses_process_wide_domain() {
    let first = CollectionManager::new(ManagerOptions::default());
    let second = CollectionManager::new(ManagerOptions::default());
    let name = "collection_binding::default_constructor_uses_process_wide_domain";

    assert_eq!(first.bind_name(name), CollectionState::CreatedNew);
    assert_eq!(second.bind_name(name), CollectionState::Affiliated);
    assert_eq!(
        shareable_core::shared_memory_domain().registry().resolve(name),
        Some(first.collection_id())
    );
}

#[test]
fn personal_storage_never_affiliates() {
    let domain = fresh_domain();
    let shared = manager(&domain, ManagerOptions::default());
    assert_eq!(shared.bind_name("orders"), CollectionState::CreatedNew);

    let personal = manager(&domain, ManagerOptions::personal());
    assert_eq!(personal.bind_name("orders"), CollectionState::CreatedNew);
    personal.add_designators(&["only_mine"]);

    assert!(shared.designators().is_empty());
    assert_eq!(domain.registry().len(), 1);
}
