//! Observer trait and built-in observers

use super::ObservedValue;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use tracing::info;

/// Receives snapshots emitted by the objects it is subscribed to.
///
/// Delivery is synchronous on the emitting thread, so implementations should
/// return quickly and use interior mutability for their state.
pub trait ParameterObserver: Send + Sync {
    /// Whether records named `name` should be delivered
    fn observes(&self, _name: &str) -> bool {
        true
    }

    /// One record
    fn on_next(&self, value: &ObservedValue);

    /// The emitting object went away
    fn on_complete(&self) {}
}

/// Keeps every delivered record in memory
#[derive(Debug, Default)]
pub struct ParameterObserverHistory {
    filter: Option<BTreeSet<String>>,
    records: Mutex<Vec<ObservedValue>>,
    completed: Mutex<bool>,
}

impl ParameterObserverHistory {
    /// Record everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Record only the named quantities
    pub fn with_filter<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ParameterObserverHistory {
            filter: Some(names.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Copy of the records so far
    pub fn records(&self) -> Vec<ObservedValue> {
        self.records.lock().clone()
    }

    /// Records named `name`
    pub fn records_named(&self, name: &str) -> Vec<ObservedValue> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.name() == name)
            .cloned()
            .collect()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// No records yet
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Drop all records
    pub fn clear(&self) {
        self.records.lock().clear();
    }

    /// Whether `on_complete` was received
    pub fn completed(&self) -> bool {
        *self.completed.lock()
    }
}

impl ParameterObserver for ParameterObserverHistory {
    fn observes(&self, name: &str) -> bool {
        self.filter.as_ref().map_or(true, |f| f.contains(name))
    }

    fn on_next(&self, value: &ObservedValue) {
        self.records.lock().push(value.clone());
    }

    fn on_complete(&self) {
        *self.completed.lock() = true;
    }
}

/// Emits every record as a `tracing` event
#[derive(Debug, Default)]
pub struct ParameterObserverLogger;

impl ParameterObserver for ParameterObserverLogger {
    fn on_next(&self, value: &ObservedValue) {
        info!(
            step = value.step(),
            quantity = value.name(),
            value = ?value.value(),
            "observed"
        );
    }
}
