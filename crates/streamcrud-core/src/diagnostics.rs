//! Diagnostic sinks for failed sync operations.
//!
//! Sync operations are fire-and-forget: when one fails for good, the engine
//! builds a [`SyncFailure`] and hands it to the sink it was constructed with.
//! The default sink logs through `tracing`.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tracing::error;

use crate::error::SyncError;
use crate::item::ItemId;
use crate::transport::Method;

/// Fixed summary attached to every failure record.
pub const FAILURE_MESSAGE: &str = "Something went wrong!";

/// Structured record of a failed sync operation.
#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    /// Always [`FAILURE_MESSAGE`].
    pub message: &'static str,
    /// Verb of the failed call.
    #[serde(rename = "httpMethod")]
    pub http_method: Method,
    /// Underlying cause.
    #[serde(serialize_with = "serialize_display")]
    pub error: SyncError,
    /// Collection endpoint the call targeted.
    pub endpoint: String,
    /// Item the call concerned, when there was one.
    pub item_id: Option<ItemId>,
    /// When the failure was recorded.
    pub occurred_at: DateTime<Utc>,
}

impl SyncFailure {
    /// Build a failure record stamped with the current time.
    pub fn new(
        http_method: Method,
        error: SyncError,
        endpoint: impl Into<String>,
        item_id: Option<ItemId>,
    ) -> Self {
        Self {
            message: FAILURE_MESSAGE,
            http_method,
            error,
            endpoint: endpoint.into(),
            item_id,
            occurred_at: Utc::now(),
        }
    }
}

fn serialize_display<S: Serializer>(error: &SyncError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// Receives failure records from a sync engine.
pub trait DiagnosticSink: Send + Sync + 'static {
    /// Record one failure.
    fn report(&self, failure: &SyncFailure);
}

/// Logs failures at `error` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, failure: &SyncFailure) {
        error!(
            http_method = %failure.http_method,
            endpoint = failure.endpoint,
            item_id = ?failure.item_id,
            error = %failure.error,
            "{}",
            failure.message
        );
    }
}

/// Discards failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn report(&self, _failure: &SyncFailure) {}
}

/// Keeps the most recent failures in memory.
#[derive(Debug)]
pub struct MemorySink {
    capacity: usize,
    failures: Mutex<VecDeque<SyncFailure>>,
}

impl MemorySink {
    /// Create a sink retaining at most `capacity` records.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            failures: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Retained failures, oldest first.
    pub fn recent(&self) -> Vec<SyncFailure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Number of retained failures.
    pub fn len(&self) -> usize {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no failure has been retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, failure: &SyncFailure) {
        if self.capacity == 0 {
            return;
        }
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        while failures.len() >= self.capacity {
            failures.pop_front();
        }
        failures.push_back(failure.clone());
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for std::sync::Arc<S> {
    fn report(&self, failure: &SyncFailure) {
        (**self).report(failure);
    }
}

/// Reports to both sinks, first then second.
impl<A: DiagnosticSink, B: DiagnosticSink> DiagnosticSink for (A, B) {
    fn report(&self, failure: &SyncFailure) {
        self.0.report(failure);
        self.1.report(failure);
    }
}
