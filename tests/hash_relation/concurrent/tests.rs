use std::sync::Arc;

use arrow::datatypes::DataType;
use keeljoin::{HashRelation, KeyType, RowLocation};
use keeljoin_test_utils::{build_int32_relation, int64_chunk, small_config};

use super::harness::{ConcurrentProbeHarness, TaskResult};

fn assert_send_sync<T: Send + Sync>() {}

fn modulo_relation(rows: i32, modulus: i32) -> HashRelation {
    let keys: Vec<Option<i32>> = (0..rows).map(|i| Some(i % modulus)).collect();
    build_int32_relation(&[keys]).unwrap()
}

fn expected_locations(rows: i32, modulus: i32, key: i64) -> Vec<RowLocation> {
    (0..rows)
        .filter(|i| (i % modulus) as i64 == key)
        .map(|i| RowLocation::new(0, i as u32))
        .collect()
}

#[test]
fn test_relation_is_send_and_sync() {
    assert_send_sync::<HashRelation>();
    assert_send_sync::<Arc<HashRelation>>();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_probes_same_key() {
    let harness = ConcurrentProbeHarness::new(modulo_relation(1_000, 100), 8);
    assert!(harness.relation().if_exists(&42i64).unwrap());

    let keys: Vec<Vec<i64>> = (0..16).map(|_| vec![42]).collect();
    let results = harness.run_probes(keys, 20).await;
    harness.assert_all_succeeded(&results);

    let expected = expected_locations(1_000, 100, 42);
    for result in &results {
        assert_eq!(result, &TaskResult::Success(expected.clone()));
    }

    let metrics = harness.metrics(&results);
    assert_eq!(metrics.total_tasks, 16);
    assert_eq!(metrics.successful_tasks, 16);
    assert_eq!(metrics.failed_tasks, 0);
    assert!(metrics.max_concurrent_observed <= harness.concurrency() as u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_probes_distinct_keys() {
    let harness = ConcurrentProbeHarness::new(modulo_relation(2_000, 50), 4);

    let keys: Vec<Vec<i64>> = (0..50).map(|k| vec![k]).collect();
    let results = harness.run_probes(keys, 5).await;
    harness.assert_all_succeeded(&results);

    for (key, result) in results.iter().enumerate() {
        let expected = expected_locations(2_000, 50, key as i64);
        assert_eq!(expected.len(), 40);
        assert_eq!(result, &TaskResult::Success(expected));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_probes_with_misses() {
    let harness = ConcurrentProbeHarness::new(modulo_relation(100, 10), 2);

    let keys = vec![vec![-1, 1_000], vec![3, -1], vec![]];
    let results = harness.run_probes(keys, 3).await;
    harness.assert_all_succeeded(&results);

    assert_eq!(results[0], TaskResult::Success(vec![]));
    assert_eq!(
        results[1],
        TaskResult::Success(expected_locations(100, 10, 3))
    );
    assert_eq!(results[2], TaskResult::Success(vec![]));

    harness.reset_metrics();
    assert_eq!(harness.metrics(&[]).max_concurrent_observed, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_probe_failures_are_reported_per_task() {
    let detached = HashRelation::detached(KeyType::Single(DataType::Int64), vec![]).unwrap();
    let harness = ConcurrentProbeHarness::new(detached, 2);

    let results = harness.run_probes(vec![vec![1], vec![2]], 1).await;
    let metrics = harness.metrics(&results);
    assert_eq!(metrics.failed_tasks, 2);
    assert!(matches!(&results[0], TaskResult::Error(msg) if msg.contains("hash table")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_probe_while_sharing_across_spawned_tasks() {
    let mut relation =
        HashRelation::new(KeyType::Single(DataType::Int64), vec![], &small_config()).unwrap();
    for chunk in 0..4i64 {
        let keys: Vec<Option<i64>> = (0..250).map(|i| Some(chunk * 1_000 + i)).collect();
        relation.append_key_column(&int64_chunk(keys)).unwrap();
    }
    let relation = Arc::new(relation);

    let mut handles = Vec::new();
    for chunk in 0..4i64 {
        let relation = Arc::clone(&relation);
        handles.push(tokio::spawn(async move {
            let mut out = Vec::new();
            for i in 0..250 {
                relation.get(&(chunk * 1_000 + i), &mut out).unwrap();
            }
            out
        }));
    }

    for (chunk, handle) in handles.into_iter().enumerate() {
        let found = handle.await.unwrap();
        assert_eq!(found.len(), 250);
        assert!(found.iter().all(|loc| loc.array_id == chunk as u32));
        assert!(found.windows(2).all(|w| w[0].id < w[1].id));
    }
}
