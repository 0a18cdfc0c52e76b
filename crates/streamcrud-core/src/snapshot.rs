//! Snapshot store: the current state of a mirrored collection.
//!
//! The store owns a [`tokio::sync::watch`] channel whose value is the latest
//! [`Snapshot`]. Snapshots are immutable and shared behind an [`Arc`]; every
//! mutation builds a fresh one (copy-on-write), so two snapshots are "the
//! same" exactly when they point at the same allocation.
//!
//! Subscribers get a [`SnapshotStream`] that replays the latest value on
//! first poll and afterwards yields only reference-distinct snapshots.
//!
//! Mutations run inside [`watch::Sender::send_if_modified`], so a batch is
//! fully merged before the single resulting notification goes out. Observers
//! are woken asynchronously and cannot re-enter a mutation in progress.

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::Stream;
use serde::{Serialize, Serializer};
use tokio::sync::watch;
use tracing::debug;

use crate::item::{Item, ItemId};

/// An immutable, ordered view of the collection at one instant.
#[derive(Debug)]
pub struct Snapshot<T>(Arc<[T]>);

impl<T> Snapshot<T> {
    /// Whether two snapshots are the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// The items in collection order.
    pub fn as_slice(&self) -> &[T] {
        &self.0
    }
}

impl<T: Item> Snapshot<T> {
    /// Find the item with the given id.
    pub fn find(&self, id: &ItemId) -> Option<&T> {
        self.0.iter().find(|item| item.id() == id)
    }

    /// Whether an item with the given id is present.
    pub fn contains(&self, id: &ItemId) -> bool {
        self.find(id).is_some()
    }

    /// The ids in collection order.
    pub fn ids(&self) -> Vec<ItemId> {
        self.0.iter().map(|item| item.id().clone()).collect()
    }
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self(Arc::from(Vec::new()))
    }
}

impl<T> From<Vec<T>> for Snapshot<T> {
    fn from(items: Vec<T>) -> Self {
        Self(Arc::from(items))
    }
}

impl<T> Deref for Snapshot<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T: Serialize> Serialize for Snapshot<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_slice().serialize(serializer)
    }
}

/// Holds the latest snapshot and publishes every change.
pub struct SnapshotStore<T> {
    tx: watch::Sender<Snapshot<T>>,
    revision: AtomicU64,
}

impl<T: Item> SnapshotStore<T> {
    /// Create an empty store.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Snapshot::default());
        Self {
            tx,
            revision: AtomicU64::new(0),
        }
    }

    /// The latest snapshot.
    pub fn current(&self) -> Snapshot<T> {
        self.tx.borrow().clone()
    }

    /// Subscribe to snapshot changes, starting with the current one.
    pub fn subscribe(&self) -> SnapshotStream<T> {
        SnapshotStream {
            rx: self.tx.subscribe(),
            last: None,
        }
    }

    /// Number of emissions so far.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// The latest snapshot together with the revision that produced it.
    ///
    /// Both are read under the channel's lock, and writers bump the
    /// revision under the same lock, so the pair is always consistent.
    pub fn versioned(&self) -> (Snapshot<T>, u64) {
        let current = self.tx.borrow();
        (current.clone(), self.revision.load(Ordering::Acquire))
    }

    /// Upsert a batch: replace same-id items in place, append the rest.
    ///
    /// One emission covers the whole batch. An empty batch changes nothing.
    pub(crate) fn merge(&self, items: Vec<T>) {
        if items.is_empty() {
            return;
        }
        let count = items.len();
        let emitted = self.tx.send_if_modified(move |current| {
            let mut next = current.as_slice().to_vec();
            for item in items {
                match next.iter_mut().find(|existing| existing.id() == item.id()) {
                    Some(slot) => *slot = item,
                    None => next.push(item),
                }
            }
            *current = Snapshot::from(next);
            self.bump();
            true
        });
        self.record(emitted, "merge", count);
    }

    /// Remove the item sharing `item`'s id. Absent ids leave the snapshot
    /// untouched and emit nothing.
    pub(crate) fn remove(&self, item: &T) -> bool {
        let id = item.id();
        let emitted = self.tx.send_if_modified(|current| {
            if !current.contains(id) {
                return false;
            }
            let next: Vec<T> = current
                .iter()
                .filter(|existing| existing.id() != id)
                .cloned()
                .collect();
            *current = Snapshot::from(next);
            self.bump();
            true
        });
        self.record(emitted, "remove", 1);
        emitted
    }

    /// Swap in an entirely new collection.
    pub(crate) fn replace(&self, items: Vec<T>) {
        let count = items.len();
        self.publish(Snapshot::from(items));
        debug!(items = count, "snapshot replaced");
    }

    /// Publish a snapshot. Republishing the current reference is a no-op.
    pub(crate) fn publish(&self, snapshot: Snapshot<T>) -> bool {
        let emitted = self.tx.send_if_modified(|current| {
            if current.ptr_eq(&snapshot) {
                return false;
            }
            *current = snapshot;
            self.bump();
            true
        });
        self.record(emitted, "publish", 0);
        emitted
    }

    /// Advance the revision. Called inside `send_if_modified`, before
    /// receivers are notified.
    fn bump(&self) {
        self.revision.fetch_add(1, Ordering::AcqRel);
    }

    fn record(&self, emitted: bool, mutation: &'static str, items: usize) {
        if emitted {
            debug!(mutation, items, revision = self.revision(), "snapshot emitted");
        }
    }
}

impl<T: Item> Default for SnapshotStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A replay-latest, identity-deduplicated view of a store's snapshots.
pub struct SnapshotStream<T> {
    rx: watch::Receiver<Snapshot<T>>,
    last: Option<Snapshot<T>>,
}

impl<T: Item> SnapshotStream<T> {
    /// Wait for the next distinct snapshot.
    ///
    /// The first call returns the current snapshot immediately. Returns
    /// `None` once the store is gone and every published value was seen.
    pub async fn next(&mut self) -> Option<Snapshot<T>> {
        loop {
            if self.last.is_some() {
                self.rx.changed().await.ok()?;
            }
            let snapshot = self.rx.borrow_and_update().clone();
            if self
                .last
                .as_ref()
                .is_some_and(|last| last.ptr_eq(&snapshot))
            {
                continue;
            }
            self.last = Some(snapshot.clone());
            return Some(snapshot);
        }
    }

    /// Whether a snapshot newer than the last one returned is waiting.
    pub fn has_pending(&self) -> bool {
        self.last.is_none() || self.rx.has_changed().unwrap_or(false)
    }

    /// Adapt into a [`futures::Stream`].
    pub fn into_stream(self) -> impl Stream<Item = Snapshot<T>> {
        futures::stream::unfold(self, |mut stream| async move {
            stream.next().await.map(|snapshot| (snapshot, stream))
        })
    }
}
