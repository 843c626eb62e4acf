use shareable_core::{
    CollectionManager, CollectionState, ColumnBatch, ManagerOptions, MemoryStorage,
    StorageDomain, Value,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 16;

fn race<F>(name: &'static str, options_for: F) -> Vec<(ManagerOptions, CollectionState, i32)>
where
    F: Fn(usize) -> ManagerOptions,
{
    let domain = Arc::new(StorageDomain::new(MemoryStorage::new()));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|index| {
            let domain = Arc::clone(&domain);
            let barrier = Arc::clone(&barrier);
            let options = options_for(index);
            thread::spawn(move || {
                let manager = CollectionManager::with_domain(domain, options);
                barrier.wait();
                let state = manager.bind_name(name);
                (options, state, manager.collection_id())
            })
        })
        .collect();

    handles
        .into_iter()
        .map(|handle| handle.join().expect("binding thread should not panic"))
        .collect()
}

#[test]
fn racing_shared_binds_create_exactly_once() {
    let outcomes = race("contended", |_| ManagerOptions::default());

    let created: Vec<_> = outcomes
        .iter()
        .filter(|(_, state, _)| *state == CollectionState::CreatedNew)
        .collect();
    assert_eq!(created.len(), 1);

    let winner = created[0].2;
    for (_, state, id) in &outcomes {
        assert!(matches!(
            state,
            CollectionState::CreatedNew | CollectionState::Affiliated
        ));
        assert_eq!(*id, winner);
    }
}

#[test]
fn racing_mixed_flags_stay_consistent_with_each_request() {
    let outcomes = race("mixed", |index| match index % 3 {
        0 => ManagerOptions::default(),
        1 => ManagerOptions::unique(),
        _ => ManagerOptions::private(),
    });

    // Private creations are unpublished, so each of them may create its own.
    let published_created = outcomes
        .iter()
        .filter(|(options, state, _)| !options.as_private && *state == CollectionState::CreatedNew)
        .count();
    assert_eq!(published_created, 1);

    for (options, state, _) in &outcomes {
        match state {
            CollectionState::CreatedNew => {}
            CollectionState::CreatedIuxta => assert!(options.as_unique),
            CollectionState::Affiliated => {
                assert!(!options.as_unique);
                assert!(!options.as_private);
            }
            CollectionState::Aborted => {
                assert!(options.as_private);
                assert!(!options.as_unique);
            }
        }
    }
}

#[test]
fn concurrent_first_schema_write_wins() {
    let domain = Arc::new(StorageDomain::new(MemoryStorage::new()));
    let owner = CollectionManager::with_domain(Arc::clone(&domain), ManagerOptions::default());
    assert_eq!(owner.bind_name("schema"), CollectionState::CreatedNew);
    let collection = owner.collection_id();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|index| {
            let domain = Arc::clone(&domain);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let manager = CollectionManager::with_domain(domain, ManagerOptions::default());
                assert_eq!(manager.bind_id(collection), CollectionState::Affiliated);
                barrier.wait();
                let name = format!("field_{index}");
                (name.clone(), manager.add_designators(&[name]))
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("schema thread should not panic"))
        .collect();
    let winners: Vec<_> = results.iter().filter(|(_, ids)| !ids.is_empty()).collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(owner.designator_names(), vec![winners[0].0.clone()]);
}

#[test]
fn concurrent_appends_assign_gapless_identifiers() {
    let domain = Arc::new(StorageDomain::new(MemoryStorage::new()));
    let owner = CollectionManager::with_domain(Arc::clone(&domain), ManagerOptions::default());
    assert_eq!(owner.bind_name("appends"), CollectionState::CreatedNew);
    let designator = owner.add_designators(&["n"])[0];
    let collection = owner.collection_id();

    let handles: Vec<_> = (0..THREADS)
        .map(|index| {
            let domain = Arc::clone(&domain);
            thread::spawn(move || {
                let manager = CollectionManager::with_domain(domain, ManagerOptions::default());
                assert_eq!(manager.bind_id(collection), CollectionState::Affiliated);
                let mut batch = ColumnBatch::new();
                let value = i64::try_from(index).expect("index fits in i64");
                batch.insert(designator, vec![Value::from(value), Value::from(value)]);
                manager.add_data(&batch)
            })
        })
        .collect();

    let mut ids: Vec<i32> = handles
        .into_iter()
        .flat_map(|handle| handle.join().expect("append thread should not panic"))
        .collect();
    ids.sort_unstable();

    let expected: Vec<i32> = (0..).take(THREADS * 2).collect();
    assert_eq!(ids, expected);
    assert_eq!(owner.row_count(), THREADS * 2);
}

#[test]
fn readers_only_observe_complete_rows_during_appends() {
    const WRITERS: usize = 4;
    const READERS: usize = 4;
    const BATCHES: i64 = 50;
    const TOTAL_ROWS: usize = WRITERS * 3 * BATCHES as usize;

    let domain = Arc::new(StorageDomain::new(MemoryStorage::new()));
    let owner = CollectionManager::with_domain(Arc::clone(&domain), ManagerOptions::default());
    assert_eq!(owner.bind_name("published"), CollectionState::CreatedNew);
    let designators = owner.add_designators(&["key", "tens", "label"]);
    assert_eq!(designators.len(), 3);
    let collection = owner.collection_id();
    let writing = Arc::new(AtomicBool::new(true));
    let barrier = Arc::new(Barrier::new(WRITERS + READERS));

    let writers: Vec<_> = (0..WRITERS)
        .map(|index| {
            let domain = Arc::clone(&domain);
            let barrier = Arc::clone(&barrier);
            let designators = designators.clone();
            thread::spawn(move || {
                let manager = CollectionManager::with_domain(domain, ManagerOptions::default());
                assert_eq!(manager.bind_id(collection), CollectionState::Affiliated);
                barrier.wait();
                let base = i64::try_from(index).expect("index fits in i64") * 1_000;
                for round in 0..BATCHES {
                    let keys = [base + round * 3, base + round * 3 + 1, base + round * 3 + 2];
                    let mut batch = ColumnBatch::new();
                    batch.insert(designators[0], keys.iter().copied().map(Value::from).collect());
                    batch.insert(
                        designators[1],
                        keys.iter().map(|key| Value::from(key * 10)).collect(),
                    );
                    batch.insert(
                        designators[2],
                        keys.iter().map(|key| Value::from(format!("row-{key}"))).collect(),
                    );
                    assert_eq!(manager.add_data(&batch).len(), 3);
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let domain = Arc::clone(&domain);
            let barrier = Arc::clone(&barrier);
            let designators = designators.clone();
            let writing = Arc::clone(&writing);
            thread::spawn(move || {
                let manager = CollectionManager::with_domain(domain, ManagerOptions::default());
                assert_eq!(manager.bind_id(collection), CollectionState::Affiliated);
                barrier.wait();
                let mut last_count = 0;
                loop {
                    let done = !writing.load(Ordering::Acquire);
                    let count = manager.row_count();
                    assert!(count >= last_count, "row count went backwards");
                    last_count = count;

                    if count > 0 {
                        let visible: Vec<i32> = (0..).take(count).collect();
                        let columns = manager
                            .try_get_data_by(&visible)
                            .expect("every counted row should be readable");
                        assert_eq!(columns.len(), designators.len());
                        assert!(columns.values().all(|column| column.len() == count));
                    }

                    for row in manager.get_data_of(&designators) {
                        assert_eq!(row.len(), manager.designators().len());
                        assert!(row.iter().all(|value| !value.is_null()));
                        let Value::Integer(key) = row[0] else {
                            panic!("key column should hold integers");
                        };
                        assert_eq!(row[1], Value::from(key * 10));
                        assert_eq!(row[2], Value::from(format!("row-{key}")));
                    }

                    if done {
                        return last_count;
                    }
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().expect("writer thread should not panic");
    }
    writing.store(false, Ordering::Release);
    for reader in readers {
        let seen = reader.join().expect("reader thread should not panic");
        assert_eq!(seen, TOTAL_ROWS);
    }
    assert_eq!(owner.row_count(), TOTAL_ROWS);
}
