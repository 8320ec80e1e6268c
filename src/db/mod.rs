//! Storage layer for VitalGuard
//!
//! Keyed, bounded in-memory stores. Engines receive them as trait objects so a
//! persistent backend can be swapped in without touching the pipelines.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::models::alert::{Alert, AlertId};

pub mod directory;

pub use directory::{PatientDirectory, StaticDirectory};

/// Per-key FIFO series with a caller-supplied capacity.
pub trait SeriesStore<T>: Send + Sync {
    /// Append `item` under `key`, evicting the oldest entries beyond `capacity`.
    fn append(&self, key: &str, item: T, capacity: usize);

    /// Snapshot of the series, oldest first.
    fn snapshot(&self, key: &str) -> Vec<T>;

    fn len(&self, key: &str) -> usize;

    fn clear(&self, key: &str);

    fn clear_all(&self);
}

/// `DashMap`-backed series; the entry guard serializes writers per key.
pub struct MemorySeries<T> {
    inner: DashMap<String, VecDeque<T>>,
}

impl<T> MemorySeries<T> {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl<T> Default for MemorySeries<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync> SeriesStore<T> for MemorySeries<T> {
    fn append(&self, key: &str, item: T, capacity: usize) {
        let mut series = self.inner.entry(key.to_string()).or_default();
        series.push_back(item);
        while series.len() > capacity {
            series.pop_front();
        }
    }

    fn snapshot(&self, key: &str) -> Vec<T> {
        self.inner
            .get(key)
            .map(|series| series.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn len(&self, key: &str) -> usize {
        self.inner.get(key).map(|series| series.len()).unwrap_or(0)
    }

    fn clear(&self, key: &str) {
        self.inner.remove(key);
    }

    fn clear_all(&self) {
        self.inner.clear();
    }
}

/// Append-only alert log. Only the suppression fields of a stored alert change.
pub trait AlertLog: Send + Sync {
    fn append(&self, alert: Alert);

    /// Mark an alert suppressed. `None` when the id is unknown.
    fn suppress(&self, id: &AlertId, reason: &str, at: DateTime<Utc>) -> Option<Alert>;

    /// All alerts in insertion order.
    fn all(&self) -> Vec<Alert>;
}

#[derive(Default)]
pub struct MemoryAlertLog {
    alerts: RwLock<Vec<Alert>>,
}

impl MemoryAlertLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AlertLog for MemoryAlertLog {
    fn append(&self, alert: Alert) {
        match self.alerts.write() {
            Ok(mut alerts) => alerts.push(alert),
            Err(poisoned) => poisoned.into_inner().push(alert),
        }
    }

    fn suppress(&self, id: &AlertId, reason: &str, at: DateTime<Utc>) -> Option<Alert> {
        let mut alerts = match self.alerts.write() {
            Ok(alerts) => alerts,
            Err(poisoned) => poisoned.into_inner(),
        };
        let alert = alerts.iter_mut().find(|a| &a.id == id)?;
        alert.suppressed = true;
        alert.suppression_reason = Some(reason.to_string());
        alert.suppressed_at = Some(at);
        Some(alert.clone())
    }

    fn all(&self) -> Vec<Alert> {
        match self.alerts.read() {
            Ok(alerts) => alerts.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
