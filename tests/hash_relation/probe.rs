use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{ArrayRef, UInt64Array};
use arrow::datatypes::DataType;
use keeljoin::{Error, HashRelation, KeyType, RowLocation, hash_scalar};
use keeljoin_test_utils::{
    assert_locations_eq, build_int32_relation, float64_chunk, int32_chunk, probe, small_config,
    utf8_chunk,
};
use proptest::prelude::*;

fn utf8_relation(chunks: &[Vec<Option<&str>>]) -> HashRelation {
    let mut relation =
        HashRelation::new(KeyType::Single(DataType::Utf8), vec![], &small_config()).unwrap();
    for chunk in chunks {
        relation
            .append_key_column(&utf8_chunk(chunk.iter().copied()))
            .unwrap();
    }
    relation
}

#[tokio::test(flavor = "current_thread")]
async fn test_probe_string_keys() {
    let relation = utf8_relation(&[
        vec![Some("apple"), Some(""), None],
        vec![Some("apple"), Some("pear")],
    ]);

    assert_locations_eq(&probe(&relation, "apple").unwrap(), &[(0, 0), (1, 0)]);
    assert_locations_eq(&probe(&relation, "").unwrap(), &[(0, 1)]);
    assert_locations_eq(&probe(&relation, &String::from("pear")).unwrap(), &[(1, 1)]);
    assert!(!relation.if_exists("plum").unwrap());
    assert!(relation.if_exists(b"pear".as_slice()).unwrap());
}

#[tokio::test(flavor = "current_thread")]
async fn test_probe_widens_numeric_keys() {
    let relation = build_int32_relation(&[vec![Some(-5), Some(7)]]).unwrap();

    assert_locations_eq(&probe(&relation, &-5i64).unwrap(), &[(0, 0)]);
    assert_locations_eq(&probe(&relation, &7i8).unwrap(), &[(0, 1)]);
    assert!(!relation.if_exists(&8i32).unwrap());
}

#[tokio::test(flavor = "current_thread")]
async fn test_lookup_rejects_other_signedness() {
    let signed = build_int32_relation(&[vec![Some(-1), Some(7)]]).unwrap();
    let err = signed.if_exists(&7u16).unwrap_err();
    assert!(matches!(err, Error::ContractViolation(_)));

    let mut unsigned =
        HashRelation::new(KeyType::Single(DataType::UInt64), vec![], &small_config()).unwrap();
    unsigned
        .append_key_column(&(Arc::new(UInt64Array::from(vec![u64::MAX, 7])) as ArrayRef))
        .unwrap();
    assert_locations_eq(&probe(&unsigned, &u64::MAX).unwrap(), &[(0, 0)]);
    assert_locations_eq(&probe(&unsigned, &7u32).unwrap(), &[(0, 1)]);
    assert!(probe(&unsigned, &-1i32).is_err());
    assert!(unsigned.if_exists(&7i64).unwrap_err().is_fatal());
}

#[tokio::test(flavor = "current_thread")]
async fn test_probe_float_keys_fold_zero_and_nan() {
    let mut relation =
        HashRelation::new(KeyType::Single(DataType::Float64), vec![], &small_config()).unwrap();
    relation
        .append_key_column(&float64_chunk([Some(0.0), Some(f64::NAN), Some(2.5)]))
        .unwrap();

    assert_locations_eq(&probe(&relation, &-0.0f64).unwrap(), &[(0, 0)]);
    assert_locations_eq(&probe(&relation, &(-f64::NAN)).unwrap(), &[(0, 1)]);
    assert_locations_eq(&probe(&relation, &2.5f32).unwrap(), &[(0, 2)]);
}

#[tokio::test(flavor = "current_thread")]
async fn test_probe_null_key_misses() {
    let relation = build_int32_relation(&[vec![None, Some(1)]]).unwrap();

    let mut out = Vec::new();
    assert!(!relation.get(&None::<i32>, &mut out).unwrap());
    assert!(out.is_empty());
    assert!(!relation.if_exists(&None::<i32>).unwrap());
    assert!(relation.get(&Some(1i32), &mut out).unwrap());
    assert!(relation.get_null());
}

#[tokio::test(flavor = "current_thread")]
async fn test_get_appends_to_output() {
    let relation = build_int32_relation(&[vec![Some(1), Some(2), Some(1)]]).unwrap();

    let mut out = vec![RowLocation::new(9, 9)];
    assert!(relation.get(&1i32, &mut out).unwrap());
    assert!(relation.get(&2i32, &mut out).unwrap());
    assert!(!relation.get(&3i32, &mut out).unwrap());
    assert_locations_eq(&out, &[(9, 9), (0, 0), (0, 2), (0, 1)]);
}

#[tokio::test(flavor = "current_thread")]
async fn test_probe_with_precomputed_hashes() {
    let mut relation =
        HashRelation::new(KeyType::Single(DataType::Utf8), vec![], &small_config()).unwrap();
    let hashes = [1u64, 1, 2];
    relation
        .append_key_column_with_hashes(&hashes, &utf8_chunk([Some("a"), Some("b"), Some("a")]))
        .unwrap();

    let mut out = Vec::new();
    assert!(relation.get_with_hash(1, "a", &mut out).unwrap());
    assert_locations_eq(&out, &[(0, 0)]);
    assert!(relation.if_exists_with_hash(2, "a").unwrap());
    assert!(!relation.if_exists_with_hash(2, "b").unwrap());
}

#[tokio::test(flavor = "current_thread")]
async fn test_probe_default_hash_matches_exported_hashers() {
    let mut relation =
        HashRelation::new(KeyType::Single(DataType::Int32), vec![], &small_config()).unwrap();
    let keys = [Some(3), Some(4)];
    let hashes: Vec<u64> = [3u64, 4].iter().map(|&k| hash_scalar(k)).collect();
    relation
        .append_key_column_with_hashes(&hashes, &int32_chunk(keys))
        .unwrap();

    assert_locations_eq(&probe(&relation, &4i32).unwrap(), &[(0, 1)]);
    assert!(relation.if_exists_with_hash(hash_scalar(3), &3i64).unwrap());
}

#[tokio::test(flavor = "current_thread")]
async fn test_probe_errors() {
    let detached = HashRelation::detached(KeyType::Single(DataType::Int32), vec![]).unwrap();
    let err = detached.if_exists(&1i32).unwrap_err();
    assert!(matches!(err, Error::ContractViolation(_)));

    let relation = build_int32_relation(&[vec![Some(1)]]).unwrap();
    let err = relation.if_exists("1").unwrap_err();
    assert!(matches!(err, Error::ContractViolation(_)));

    let strings = utf8_relation(&[vec![Some("1")]]);
    assert!(strings.if_exists(&1i32).is_err());
}

proptest! {
    #[test]
    fn prop_probe_matches_model(
        chunks in prop::collection::vec(
            prop::collection::vec(prop::option::weighted(0.9, -20i32..20), 0..40),
            1..5,
        )
    ) {
        let relation = build_int32_relation(&chunks).unwrap();

        let mut model: HashMap<i32, Vec<RowLocation>> = HashMap::new();
        let mut nulls = 0;
        for (array_id, chunk) in chunks.iter().enumerate() {
            for (id, key) in chunk.iter().enumerate() {
                match key {
                    Some(key) => model
                        .entry(*key)
                        .or_default()
                        .push(RowLocation::new(array_id as u32, id as u32)),
                    None => nulls += 1,
                }
            }
        }

        for key in -20i32..20 {
            let found = probe(&relation, &key).unwrap();
            let expected = model.get(&key).cloned().unwrap_or_default();
            prop_assert_eq!(found, expected);
        }
        prop_assert_eq!(relation.null_row_count(), nulls);
        prop_assert_eq!(relation.get_null(), nulls > 0);
    }
}
