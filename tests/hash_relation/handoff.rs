use arrow::datatypes::DataType;
use keeljoin::{Error, HashRelation, KeyType, MemoryHandle, UnsafeRow};
use keeljoin_test_utils::{
    assert_error_contains, assert_locations_eq, build_int32_relation, float64_chunk, int32_chunk,
    int64_chunk, probe, small_config,
};

#[tokio::test(flavor = "current_thread")]
async fn test_import_into_detached_relation() {
    let sender = build_int32_relation(&[vec![Some(4), Some(5)], vec![Some(4)]]).unwrap();
    let handles = sender.export_handles().unwrap();
    assert!(handles.iter().all(|h| !h.is_null()));

    let mut receiver = HashRelation::detached(KeyType::Single(DataType::Int32), vec![]).unwrap();
    assert!(!receiver.has_table());
    // SAFETY: `sender` outlives `receiver` and is not modified.
    unsafe { receiver.import_handles(&handles) }.unwrap();

    assert!(receiver.is_imported());
    assert_locations_eq(&probe(&receiver, &4i32).unwrap(), &[(0, 0), (1, 0)]);
    assert_eq!(receiver.stats().unwrap(), sender.stats().unwrap());

    let err = receiver
        .append_key_column(&int32_chunk([Some(6)]))
        .unwrap_err();
    assert!(matches!(err, Error::ContractViolation(_)));
    assert!(receiver.grow_table().is_err());

    receiver.release();
    assert!(!receiver.has_table());
    assert_locations_eq(&probe(&sender, &5i32).unwrap(), &[(0, 1)]);
}

#[tokio::test(flavor = "current_thread")]
async fn test_import_replaces_owned_table() {
    let sender = build_int32_relation(&[vec![Some(1)]]).unwrap();
    let mut receiver = build_int32_relation(&[vec![Some(2)]]).unwrap();
    assert!(receiver.if_exists(&2i32).unwrap());

    let handles = sender.export_handles().unwrap();
    // SAFETY: `sender` outlives `receiver` and is not modified.
    unsafe { receiver.import_handles(&handles) }.unwrap();

    assert!(receiver.if_exists(&1i32).unwrap());
    assert!(!receiver.if_exists(&2i32).unwrap());
}

#[tokio::test(flavor = "current_thread")]
async fn test_probe_imported_table_from_other_threads() {
    let keys: Vec<Option<i32>> = (0..500).map(|i| Some(i % 50)).collect();
    let sender = build_int32_relation(&[keys]).unwrap();
    let handles = sender.export_handles().unwrap();

    std::thread::scope(|scope| {
        for worker in 0..4 {
            scope.spawn(move || {
                let mut receiver =
                    HashRelation::detached(KeyType::Single(DataType::Int32), vec![]).unwrap();
                // SAFETY: the scope ends before `sender` is dropped.
                unsafe { receiver.import_handles(&handles) }.unwrap();
                let key = worker * 10;
                let found = probe(&receiver, &key).unwrap();
                assert_eq!(found.len(), 10);
                assert!(found.iter().all(|loc| loc.id as i32 % 50 == key));
            });
        }
    });
}

#[tokio::test(flavor = "current_thread")]
async fn test_composite_import_checks_key_size() {
    let fixed = KeyType::Composite(vec![DataType::Int32, DataType::Int64]);
    let mut sender = HashRelation::new(fixed.clone(), vec![], &small_config()).unwrap();
    assert_eq!(sender.config().key_size, Some(17));
    sender
        .append_key_columns(&[
            int32_chunk([Some(1), Some(2)]),
            int64_chunk([Some(10), Some(20)]),
        ])
        .unwrap();
    let handles = sender.export_handles().unwrap();

    let mut variable = HashRelation::detached(
        KeyType::Composite(vec![DataType::Int32, DataType::Utf8]),
        vec![],
    )
    .unwrap();
    // SAFETY: `sender` outlives `variable` and is not modified.
    let err = unsafe { variable.import_handles(&handles) }.unwrap_err();
    assert!(matches!(err, Error::ContractViolation(_)));
    assert!(!variable.has_table());

    let mut receiver = HashRelation::detached(fixed, vec![]).unwrap();
    // SAFETY: `sender` outlives `receiver` and is not modified.
    unsafe { receiver.import_handles(&handles) }.unwrap();
    let mut key = UnsafeRow::new(2);
    key.append(&2i32).unwrap();
    key.append(&20i64).unwrap();
    assert_locations_eq(&probe(&receiver, &key).unwrap(), &[(0, 1)]);
}

#[tokio::test(flavor = "current_thread")]
async fn test_import_checks_key_type() {
    let mut floats =
        HashRelation::new(KeyType::Single(DataType::Float64), vec![], &small_config()).unwrap();
    floats
        .append_key_column(&float64_chunk([Some(1.0), Some(2.5)]))
        .unwrap();
    let handles = floats.export_handles().unwrap();

    for key_type in [
        KeyType::Single(DataType::Int64),
        KeyType::Single(DataType::UInt64),
        KeyType::Single(DataType::Binary),
    ] {
        let mut receiver = HashRelation::detached(key_type, vec![]).unwrap();
        // SAFETY: `floats` outlives `receiver` and is not modified.
        let err = unsafe { receiver.import_handles(&handles) }.unwrap_err();
        assert!(matches!(err, Error::ContractViolation(_)));
        assert!(!receiver.has_table());
    }

    let ints = build_int32_relation(&[vec![Some(1)]]).unwrap();
    let mut receiver = HashRelation::detached(KeyType::Single(DataType::Int64), vec![]).unwrap();
    // SAFETY: `ints` outlives `receiver` and is not modified.
    unsafe { receiver.import_handles(&ints.export_handles().unwrap()) }.unwrap();
    assert_locations_eq(&probe(&receiver, &1i64).unwrap(), &[(0, 0)]);

    let mut dates = HashRelation::detached(KeyType::Single(DataType::Date32), vec![]).unwrap();
    // SAFETY: as above.
    let result = unsafe { dates.import_handles(&ints.export_handles().unwrap()) };
    assert_error_contains(result, &["key tag"]);
}

#[tokio::test(flavor = "current_thread")]
async fn test_export_and_import_failures() {
    let detached = HashRelation::detached(KeyType::Single(DataType::Int32), vec![]).unwrap();
    assert!(matches!(
        detached.export_handles(),
        Err(Error::InvalidState(_))
    ));

    let sender = build_int32_relation(&[vec![Some(1)]]).unwrap();
    let handles = sender.export_handles().unwrap();
    let mut receiver = HashRelation::detached(KeyType::Single(DataType::Int32), vec![]).unwrap();

    // SAFETY: no handle is dereferenced when the count is wrong.
    let result = unsafe { receiver.import_handles(&handles[..2]) };
    assert_error_contains(result, &["expected 3 handles"]);

    let null_handles = [MemoryHandle::new(0, 0); 3];
    // SAFETY: null addresses are rejected before any read.
    let result = unsafe { receiver.import_handles(&null_handles) };
    assert!(matches!(result, Err(Error::InvalidState(_))));
}
