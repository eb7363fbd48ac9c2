use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Named timings of async operations, in milliseconds.
///
/// Measuring the same name twice keeps the latest timing.
#[derive(Debug, Default)]
pub struct PerformanceLog {
    entries: Mutex<BTreeMap<String, f64>>,
}

impl PerformanceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Await `operation`, recording how long it took under `name`.
    pub async fn measure<F: Future>(&self, name: impl Into<String>, operation: F) -> F::Output {
        let name = name.into();
        let started = Instant::now();
        let output = operation.await;
        let millis = (started.elapsed().as_secs_f64() * 100_000.0).round() / 100.0;
        tracing::debug!(operation = %name, millis, "Measured operation");
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).insert(name, millis);
        output
    }

    pub fn entries(&self) -> Vec<(String, f64)> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().map(|(name, millis)| (name.clone(), *millis)).collect()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).get(name).copied()
    }

    pub fn reset(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
