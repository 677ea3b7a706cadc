//! Per-model performance tracking

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Success/error counters and average latency for one model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub success: u64,
    pub errors: u64,
    /// Mean latency of successful calls, in seconds; stays 0 until the first
    /// success regardless of error count
    pub avg_seconds: f64,
}

impl ModelMetrics {
    pub fn attempts(&self) -> u64 {
        self.success + self.errors
    }
}

/// Shared store of per-model metrics
///
/// Mutation is lock-guarded so concurrent dispatches against the same model
/// cannot lose increments. Counters only grow; the store lives as long as the
/// orchestrator that owns it.
#[derive(Debug, Default)]
pub struct MetricsStore {
    records: RwLock<HashMap<String, ModelMetrics>>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with a zeroed record per model id
    pub fn for_models<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        let records = ids
            .into_iter()
            .map(|id| (id.to_string(), ModelMetrics::default()))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    /// Record a successful invocation and fold its latency into the running
    /// average: `new_avg = (old_avg * (n - 1) + latest) / n` with `n` counting
    /// every attempt made so far
    pub fn record_success(&self, model_id: &str, elapsed: Duration) {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let record = records.entry(model_id.to_string()).or_default();
        record.success += 1;
        let n = record.attempts() as f64;
        record.avg_seconds = (record.avg_seconds * (n - 1.0) + elapsed.as_secs_f64()) / n;
    }

    /// Record a failed invocation; the latency average is left untouched
    pub fn record_error(&self, model_id: &str) {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        records.entry(model_id.to_string()).or_default().errors += 1;
    }

    pub fn get(&self, model_id: &str) -> Option<ModelMetrics> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(model_id)
            .cloned()
    }

    /// Clone out every record, for dashboards and logs
    pub fn snapshot(&self) -> HashMap<String, ModelMetrics> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_records_start_zeroed() {
        let store = MetricsStore::for_models(["a", "b"]);
        let record = store.get("a").unwrap();
        assert_eq!(record, ModelMetrics::default());
        assert!(store.get("c").is_none());
    }

    #[test]
    fn test_attempts_add_up() {
        let store = MetricsStore::new();
        store.record_success("m", Duration::from_millis(100));
        store.record_error("m");
        store.record_error("m");
        store.record_success("m", Duration::from_millis(100));

        let record = store.get("m").unwrap();
        assert_eq!(record.success, 2);
        assert_eq!(record.errors, 2);
        assert_eq!(record.attempts(), 4);
    }

    #[test]
    fn test_moving_average_counts_all_attempts() {
        let store = MetricsStore::for_models(["m"]);
        store.record_success("m", Duration::from_secs(2));
        // first success, n = 1
        assert_eq!(store.get("m").unwrap().avg_seconds, 2.0);

        store.record_error("m");
        store.record_success("m", Duration::from_secs(5));
        // n = 3 at update time: (2.0 * 2 + 5.0) / 3
        let record = store.get("m").unwrap();
        assert!((record.avg_seconds - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_errors_never_touch_average() {
        let store = MetricsStore::for_models(["m"]);
        store.record_error("m");
        store.record_error("m");

        let record = store.get("m").unwrap();
        assert_eq!(record.errors, 2);
        assert_eq!(record.avg_seconds, 0.0);
    }

    #[test]
    fn test_concurrent_updates_keep_every_increment() {
        use std::sync::Arc;

        let store = Arc::new(MetricsStore::for_models(["m"]));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    store.record_success("m", Duration::from_millis(10));
                    store.record_error("m");
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let record = store.get("m").unwrap();
        assert_eq!(record.success, 800);
        assert_eq!(record.errors, 800);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let store = MetricsStore::for_models(["m"]);
        let before = store.snapshot();
        store.record_error("m");
        assert_eq!(before.get("m").unwrap().errors, 0);
        assert_eq!(store.snapshot().get("m").unwrap().errors, 1);
    }
}
