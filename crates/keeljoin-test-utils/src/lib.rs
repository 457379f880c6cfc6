#![allow(dead_code)]

use std::sync::Arc;

use keeljoin::{HashRelation, HashRelationConfig, JoinKey, KeyType, Result, RowLocation};
pub use keeljoin_arrow::assert_array_values_eq;
use keeljoin_arrow::array::{ArrayRef, Float64Array, Int32Array, Int64Array, StringArray};
use keeljoin_arrow::datatypes::DataType;

/// A config small enough that tests exercise growth and the byte budget.
pub fn small_config() -> HashRelationConfig {
    HashRelationConfig::default()
        .with_initial_capacity(16)
        .with_initial_bytes(1024)
        .with_max_bytes(1 << 20)
}

pub fn int32_chunk(values: impl IntoIterator<Item = Option<i32>>) -> ArrayRef {
    Arc::new(Int32Array::from_iter(values))
}

pub fn int64_chunk(values: impl IntoIterator<Item = Option<i64>>) -> ArrayRef {
    Arc::new(Int64Array::from_iter(values))
}

pub fn float64_chunk(values: impl IntoIterator<Item = Option<f64>>) -> ArrayRef {
    Arc::new(Float64Array::from_iter(values))
}

pub fn utf8_chunk<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> ArrayRef {
    Arc::new(StringArray::from_iter(values))
}

/// An Int32-keyed relation without payload columns, built from `chunks` in order.
pub fn build_int32_relation(chunks: &[Vec<Option<i32>>]) -> Result<HashRelation> {
    let mut relation =
        HashRelation::new(KeyType::Single(DataType::Int32), vec![], &small_config())?;
    for chunk in chunks {
        relation.append_key_column(&int32_chunk(chunk.iter().copied()))?;
    }
    Ok(relation)
}

/// Probes `relation` with a fresh output vector.
pub fn probe<K: JoinKey + ?Sized>(relation: &HashRelation, key: &K) -> Result<Vec<RowLocation>> {
    let mut out = Vec::new();
    relation.get(key, &mut out)?;
    Ok(out)
}

pub fn locations(pairs: &[(u32, u32)]) -> Vec<RowLocation> {
    pairs
        .iter()
        .map(|&(array_id, id)| RowLocation::new(array_id, id))
        .collect()
}

pub fn assert_locations_eq(actual: &[RowLocation], expected: &[(u32, u32)]) {
    let expected = locations(expected);
    assert_eq!(
        actual,
        expected.as_slice(),
        "Row locations differ.\n  actual:   {:?}\n  expected: {:?}",
        actual,
        expected
    );
}

pub fn assert_error_contains<T>(result: Result<T>, keywords: &[&str]) {
    match result {
        Ok(_) => panic!("Expected error but got Ok result"),
        Err(e) => {
            let error_msg = e.to_string().to_lowercase();
            let found = keywords
                .iter()
                .any(|keyword| error_msg.contains(&keyword.to_lowercase()));
            assert!(
                found,
                "Error message '{}' does not contain any of the expected keywords: {:?}",
                e, keywords
            );
        }
    }
}
