use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use keeljoin::{HashRelation, RowLocation};
use tokio::sync::Semaphore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    Success(Vec<RowLocation>),
    Error(String),
}

#[derive(Debug)]
pub struct ConcurrencyMetrics {
    pub total_tasks: u64,
    pub successful_tasks: u64,
    pub failed_tasks: u64,
    pub max_concurrent_observed: u64,
}

/// Probes one shared relation from many tokio tasks at once. Each task owns
/// its output vector; the relation itself is only read.
pub struct ConcurrentProbeHarness {
    relation: Arc<HashRelation>,
    semaphore: Arc<Semaphore>,
    concurrency: usize,
    current_concurrent: Arc<AtomicU64>,
    max_concurrent_observed: Arc<AtomicU64>,
}

impl ConcurrentProbeHarness {
    pub fn new(relation: HashRelation, concurrency: usize) -> Self {
        Self {
            relation: Arc::new(relation),
            semaphore: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            current_concurrent: Arc::new(AtomicU64::new(0)),
            max_concurrent_observed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn relation(&self) -> Arc<HashRelation> {
        Arc::clone(&self.relation)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs one probe task per entry of `keys`; each task probes every key of
    /// its entry `rounds` times and reports the locations of the last round.
    pub async fn run_probes(&self, keys: Vec<Vec<i64>>, rounds: usize) -> Vec<TaskResult> {
        let mut handles = Vec::with_capacity(keys.len());

        for task_keys in keys {
            let relation = Arc::clone(&self.relation);
            let semaphore = Arc::clone(&self.semaphore);
            let current_concurrent = Arc::clone(&self.current_concurrent);
            let max_concurrent_observed = Arc::clone(&self.max_concurrent_observed);

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire().await.unwrap();

                let concurrent = current_concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                max_concurrent_observed.fetch_max(concurrent, Ordering::SeqCst);

                let mut out = Vec::new();
                let mut result = Ok(());
                for _ in 0..rounds.max(1) {
                    out.clear();
                    for key in &task_keys {
                        if let Err(e) = relation.get(key, &mut out) {
                            result = Err(e);
                            break;
                        }
                    }
                    tokio::task::yield_now().await;
                }

                current_concurrent.fetch_sub(1, Ordering::SeqCst);

                match result {
                    Ok(()) => TaskResult::Success(out),
                    Err(e) => TaskResult::Error(e.to_string()),
                }
            });

            handles.push(handle);
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => results.push(TaskResult::Error(format!("Join error: {}", e))),
            }
        }

        results
    }

    pub fn metrics(&self, results: &[TaskResult]) -> ConcurrencyMetrics {
        let total_tasks = results.len() as u64;
        let successful_tasks = results
            .iter()
            .filter(|r| matches!(r, TaskResult::Success(_)))
            .count() as u64;

        ConcurrencyMetrics {
            total_tasks,
            successful_tasks,
            failed_tasks: total_tasks - successful_tasks,
            max_concurrent_observed: self.max_concurrent_observed.load(Ordering::SeqCst),
        }
    }

    pub fn assert_all_succeeded(&self, results: &[TaskResult]) {
        for (i, result) in results.iter().enumerate() {
            if let TaskResult::Error(e) = result {
                panic!("Task {} failed with error: {}", i, e);
            }
        }
    }

    pub fn reset_metrics(&self) {
        self.current_concurrent.store(0, Ordering::SeqCst);
        self.max_concurrent_observed.store(0, Ordering::SeqCst);
    }
}
